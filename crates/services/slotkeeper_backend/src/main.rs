// File: services/slotkeeper_backend/src/main.rs
use slotkeeper_backend::AppState;
use slotkeeper_common::logging;
use slotkeeper_config::load_config;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

#[tokio::main]
async fn main() {
    logging::init();

    let config = match load_config() {
        Ok(config) => Arc::new(config),
        Err(e) => {
            error!(error = %e, "Failed to load config");
            std::process::exit(1);
        }
    };

    let state = match AppState::new(config.clone()).await {
        Ok(state) => state,
        Err(e) => {
            error!(error = %e, "Failed to initialize services");
            std::process::exit(1);
        }
    };

    let shutdown = CancellationToken::new();
    let reminders = {
        let scheduler = state.booking.reminders.clone();
        let token = shutdown.child_token();
        tokio::spawn(async move { scheduler.run(token).await })
    };

    let app = state.router();

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = match TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!(%addr, error = %e, "Failed to bind");
            shutdown.cancel();
            std::process::exit(1);
        }
    };
    info!("Starting server at http://{}", addr);
    info!("API endpoints available at http://{}/api", addr);

    let signal_token = shutdown.clone();
    let served = axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => info!("Shutdown signal received"),
                Err(e) => error!(error = %e, "Failed to listen for shutdown signal"),
            }
            signal_token.cancel();
        })
        .await;
    if let Err(e) = served {
        error!(error = %e, "Server error");
    }

    shutdown.cancel();
    if let Err(e) = reminders.await {
        error!(error = %e, "Reminder scheduler task failed");
    }
    info!("Slotkeeper stopped");
}
