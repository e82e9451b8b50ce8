// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::time::Duration;

use axum_server::{tls_rustls::RustlsConfig, Handle};
use sincut_server::{
    api::router, config::AppConfig, logging::init_tracing, state::AppState, storage::UserDatabase,
};

/// In-flight requests get this long to finish after a shutdown signal.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::from_env()?;
    init_tracing(config.log_format);

    std::fs::create_dir_all(&config.data_dir)?;
    let users = UserDatabase::open(&config.database_path())?;
    tracing::info!(path = %config.database_path().display(), "user database opened");

    let addr = config.bind_addr()?;
    let tls = config.tls.clone();
    let app = router(AppState::new(users, config));

    let handle = Handle::new();
    let shutdown_handle = handle.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        tracing::info!("shutdown signal received, draining connections");
        shutdown_handle.graceful_shutdown(Some(SHUTDOWN_GRACE));
    });

    match tls {
        Some(paths) => {
            // Must happen before any TLS configuration is built.
            if rustls::crypto::ring::default_provider().install_default().is_err() {
                tracing::warn!("rustls crypto provider was already installed");
            }
            let tls_config = RustlsConfig::from_pem_file(&paths.cert_path, &paths.key_path).await?;
            tracing::info!(%addr, "Sincut server listening on https://{addr} (docs at /docs)");
            axum_server::bind_rustls(addr, tls_config)
                .handle(handle)
                .serve(app.into_make_service())
                .await?;
        }
        None => {
            tracing::info!(%addr, "Sincut server listening on http://{addr} (docs at /docs)");
            axum_server::bind(addr)
                .handle(handle)
                .serve(app.into_make_service())
                .await?;
        }
    }

    tracing::info!("server stopped");
    Ok(())
}

/// Resolves on Ctrl-C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
