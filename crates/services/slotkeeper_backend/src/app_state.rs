// --- File: crates/services/slotkeeper_backend/src/app_state.rs ---
use axum::{routing::get, Router};
use slotkeeper_booking::{build_state, routes as booking_routes, BookingState};
use slotkeeper_common::{SlotkeeperError, SystemClock};
use slotkeeper_config::AppConfig;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::service_factory::SlotkeeperServiceFactory;

/// Application state that is shared across all routes.
#[derive(Clone)]
pub struct AppState {
    /// The configuration that was loaded at startup.
    pub config: Arc<AppConfig>,
    pub booking: Arc<BookingState>,
}

impl AppState {
    /// Wire the configured collaborators into the booking core.
    pub async fn new(config: Arc<AppConfig>) -> Result<Self, SlotkeeperError> {
        let factory = SlotkeeperServiceFactory::new(&config).await?;
        let booking = build_state(
            &config,
            factory.gateway,
            factory.store,
            factory.sink,
            Arc::new(SystemClock),
        )?;
        Ok(Self { config, booking })
    }

    /// All HTTP routes, nested under `/api`.
    pub fn router(&self) -> Router {
        let api_router = Router::new()
            .route("/", get(|| async { "Welcome to Slotkeeper API!" }))
            .merge(booking_routes(self.booking.clone()));

        Router::new()
            .nest("/api", api_router)
            .layer(TraceLayer::new_for_http())
    }
}
