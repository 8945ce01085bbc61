// --- File: crates/slotkeeper_gcal/src/lib.rs ---
// Declare modules within this crate
pub mod auth;
pub mod gateway;

pub use auth::{ServiceAccountTokens, StaticToken, TokenProvider};
pub use gateway::{GoogleCalendarGateway, DEFAULT_BASE_URL};

use reqwest::Client;
use slotkeeper_common::{GatewayError, HttpTransport};
use slotkeeper_config::GcalConfig;
use std::sync::Arc;

/// Build a gateway from configuration using service-account credentials.
pub async fn connect(
    config: &GcalConfig,
    transport: Arc<dyn HttpTransport>,
    client: Client,
) -> Result<GoogleCalendarGateway, GatewayError> {
    let calendar_id = config
        .calendar_id
        .clone()
        .ok_or_else(|| GatewayError::Auth("Missing calendar_id in GcalConfig".to_string()))?;
    let tokens = ServiceAccountTokens::from_config(config).await?;
    let gateway = GoogleCalendarGateway::new(transport, client, Arc::new(tokens), calendar_id)?;
    match config.base_url.as_deref() {
        Some(base_url) => gateway.with_base_url(base_url),
        None => Ok(gateway),
    }
}
