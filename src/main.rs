// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum_server::tls_rustls::RustlsConfig;
use tracing::{error, info};

use request_authorizer::api::router;
use request_authorizer::authorizer::Authorizer;
use request_authorizer::cache::TokenCache;
use request_authorizer::config::{AuthorizerConfig, LogFormat};
use request_authorizer::logging;
use request_authorizer::state::AppState;
use request_authorizer::token::TokenGenerator;

#[tokio::main]
async fn main() {
    let config = match AuthorizerConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            logging::init(LogFormat::default());
            error!(error = %e, "Invalid configuration");
            std::process::exit(1);
        }
    };
    logging::init(config.log_format);

    if let Err(e) = run(config).await {
        error!(error = %e, "Request authorizer failed");
        std::process::exit(1);
    }
}

async fn run(config: AuthorizerConfig) -> Result<(), Box<dyn std::error::Error>> {
    let cache = TokenCache::from_config(&config.cache)?;
    info!(
        backend = cache.backend(),
        ttl_secs = config.cache.ttl.as_secs(),
        write_timeout_ms = config.cache.write_timeout.as_millis() as u64,
        "Token cache ready"
    );

    let state = AppState::new(Authorizer::new(TokenGenerator::new(), cache));
    let app = router(state);
    let addr = config.server.bind_addr()?;

    match &config.server.tls {
        Some(tls) => {
            // Install the ring crypto provider for rustls (must be done before any TLS operations)
            if rustls::crypto::ring::default_provider().install_default().is_err() {
                return Err("failed to install rustls crypto provider".into());
            }
            let tls_config = RustlsConfig::from_pem_file(&tls.cert_path, &tls.key_path).await?;

            info!(%addr, "Request authorizer listening on https (docs at /docs)");
            axum_server::bind_rustls(addr, tls_config)
                .serve(app.into_make_service())
                .await?;
        }
        None => {
            info!(%addr, "Request authorizer listening on http (docs at /docs)");
            axum_server::bind(addr).serve(app.into_make_service()).await?;
        }
    }

    Ok(())
}
