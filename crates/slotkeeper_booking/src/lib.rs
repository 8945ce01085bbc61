// --- File: crates/slotkeeper_booking/src/lib.rs ---
// Declare modules within this crate
pub mod availability;
#[cfg(test)]
mod availability_proptest;
pub mod booking;
#[cfg(test)]
mod booking_test;
pub mod cache;
pub mod error;
pub mod handlers;
pub mod hours;
pub mod reminders;
#[cfg(test)]
mod reminders_test;
pub mod routes;
#[cfg(test)]
mod test_support;

pub use availability::AvailabilityEngine;
pub use booking::BookingService;
pub use cache::FreeBusyCache;
pub use error::BookingError;
pub use handlers::BookingState;
pub use hours::BusinessHours;
pub use reminders::{ReminderScheduler, ReminderThreshold, ScanReport};
pub use routes::routes;

use slotkeeper_common::models::ServiceCatalog;
use slotkeeper_common::{CalendarGateway, Clock, MetadataStore, NotificationSink, SlotkeeperError};
use slotkeeper_config::AppConfig;
use std::sync::Arc;

/// Wire the core components around the given collaborators.
pub fn build_state(
    config: &AppConfig,
    gateway: Arc<dyn CalendarGateway>,
    store: Arc<dyn MetadataStore>,
    sink: Arc<dyn NotificationSink>,
    clock: Arc<dyn Clock>,
) -> Result<Arc<BookingState>, SlotkeeperError> {
    let hours = BusinessHours::from_config(&config.business)?;
    let catalog = Arc::new(ServiceCatalog::from_config(&config.services)?);
    let cache = Arc::new(
        FreeBusyCache::new(gateway.clone(), clock.clone(), config.cache.ttl_secs)
            .with_max_entries(config.cache.max_entries),
    );

    let availability = AvailabilityEngine::new(
        cache.clone(),
        hours.clone(),
        catalog.clone(),
        clock.clone(),
    );
    let booking = BookingService::new(
        gateway.clone(),
        cache,
        hours.clone(),
        catalog.clone(),
        clock.clone(),
    );
    let reminders = ReminderScheduler::new(gateway, store, sink, clock)
        .with_config(&config.reminders)
        .with_timezone(hours.timezone());

    Ok(Arc::new(BookingState {
        catalog,
        availability: Arc::new(availability),
        booking: Arc::new(booking),
        reminders: Arc::new(reminders),
    }))
}
