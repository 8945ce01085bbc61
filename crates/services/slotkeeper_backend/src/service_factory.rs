// --- File: crates/services/slotkeeper_backend/src/service_factory.rs ---
//! Collaborator wiring.
//!
//! Picks the calendar, metadata store and notification sink from the
//! configuration and the enabled features. Anything disabled or not
//! configured falls back to the in-memory implementation (calendar, store) or
//! to the log sink (notifications), so a bare checkout starts without secrets.

use reqwest::Client;
use slotkeeper_common::memory::{InMemoryCalendar, InMemoryMetadataStore};
#[allow(unused_imports)] // even so it is used only by certain features
use slotkeeper_common::{
    config_error, create_client, CalendarGateway, HttpTransport, MetadataStore, NotificationSink,
    RetryPolicy, RetryTransport, SlotkeeperError,
};
use slotkeeper_config::AppConfig;
use slotkeeper_notify::LogNotifier;
use std::sync::Arc;
use tracing::{info, warn};

/// True when a feature is switched on and its section is present.
pub fn is_feature_enabled<T>(flag: bool, section: Option<&T>) -> bool {
    flag && section.is_some()
}

/// The three collaborators the booking core needs.
pub struct SlotkeeperServiceFactory {
    pub gateway: Arc<dyn CalendarGateway>,
    pub store: Arc<dyn MetadataStore>,
    pub sink: Arc<dyn NotificationSink>,
}

impl SlotkeeperServiceFactory {
    pub async fn new(config: &AppConfig) -> Result<Self, SlotkeeperError> {
        let client = create_client(config.transport.request_timeout_secs, false)?;
        let transport: Arc<dyn HttpTransport> = Arc::new(RetryTransport::new(
            client.clone(),
            RetryPolicy::from_config(&config.transport),
        ));

        let gateway = Self::gateway(config, transport.clone(), client.clone()).await?;
        let store = Self::store(config).await?;
        let sink = Self::sink(config, transport, client)?;
        Ok(Self {
            gateway,
            store,
            sink,
        })
    }

    #[allow(unused_variables)]
    async fn gateway(
        config: &AppConfig,
        transport: Arc<dyn HttpTransport>,
        client: Client,
    ) -> Result<Arc<dyn CalendarGateway>, SlotkeeperError> {
        #[cfg(feature = "gcal")]
        if is_feature_enabled(config.use_gcal, config.gcal.as_ref()) {
            if let Some(gcal) = config.gcal.as_ref() {
                info!("Initializing Google Calendar gateway...");
                let gateway = slotkeeper_gcal::connect(gcal, transport, client)
                    .await
                    .map_err(|e| config_error(format!("Google Calendar setup failed: {}", e)))?;
                info!(calendar_id = %gateway.calendar_id(), "Google Calendar gateway ready");
                return Ok(Arc::new(gateway));
            }
        }
        warn!("Google Calendar disabled, appointments are kept in memory");
        Ok(Arc::new(InMemoryCalendar::new()))
    }

    #[allow(unused_variables)]
    async fn store(config: &AppConfig) -> Result<Arc<dyn MetadataStore>, SlotkeeperError> {
        #[cfg(feature = "database")]
        if let Some(db) = config.database.as_ref() {
            info!("Initializing metadata database...");
            let client = slotkeeper_db::DbClient::from_config(db)
                .await
                .map_err(|e| config_error(format!("Database setup failed: {}", e)))?;
            let store = slotkeeper_db::SqlMetadataStore::new(client);
            store
                .init_schema()
                .await
                .map_err(|e| config_error(format!("Database schema setup failed: {}", e)))?;
            return Ok(Arc::new(store));
        }
        warn!("No database configured, reminder bookkeeping is lost on restart");
        Ok(Arc::new(InMemoryMetadataStore::new()))
    }

    #[allow(unused_variables)]
    fn sink(
        config: &AppConfig,
        transport: Arc<dyn HttpTransport>,
        client: Client,
    ) -> Result<Arc<dyn NotificationSink>, SlotkeeperError> {
        #[cfg(feature = "telegram")]
        if is_feature_enabled(config.use_telegram, config.telegram.as_ref()) {
            if let Some(telegram) = config.telegram.as_ref() {
                info!("Initializing Telegram notifier...");
                let notifier = slotkeeper_notify::TelegramNotifier::new(transport, client, telegram)
                    .map_err(|e| config_error(format!("Telegram setup failed: {}", e)))?;
                return Ok(Arc::new(notifier));
            }
        }
        warn!("Telegram disabled, reminders are only logged");
        Ok(Arc::new(LogNotifier))
    }
}
