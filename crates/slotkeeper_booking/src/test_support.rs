// Shared fixtures for the unit test modules.

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use chrono_tz::Tz;
use slotkeeper_common::memory::InMemoryCalendar;
use slotkeeper_common::models::{Appointment, Customer, Service, ServiceCatalog};
use slotkeeper_common::ManualClock;
use std::sync::Arc;

use crate::availability::AvailabilityEngine;
use crate::booking::BookingService;
use crate::cache::FreeBusyCache;
use crate::hours::BusinessHours;

/// Monday.
pub fn day() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 6, 2).unwrap()
}

pub fn at(hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 2, hour, minute, 0).unwrap()
}

pub fn service(id: &str, minutes: i64) -> Service {
    Service {
        id: id.to_string(),
        name: format!("Service {}", id),
        duration_minutes: minutes,
        price: 5000,
        currency: Some("CHF".to_string()),
    }
}

pub fn customer() -> Customer {
    Customer {
        id: "4711".to_string(),
        display_name: "Ada".to_string(),
    }
}

pub fn appointment(service_minutes: i64, start: DateTime<Utc>) -> Appointment {
    Appointment::new(service("cut", service_minutes), start, customer(), "").unwrap()
}

pub fn catalog() -> Arc<ServiceCatalog> {
    Arc::new(ServiceCatalog::new(vec![
        service("cut", 60),
        service("massage", 90),
    ]))
}

/// 09:00-18:00 UTC, hourly candidates, every day.
pub fn hours() -> BusinessHours {
    BusinessHours::new(Tz::UTC, 9, 18, 60).unwrap()
}

pub struct Harness {
    pub calendar: Arc<InMemoryCalendar>,
    pub clock: Arc<ManualClock>,
    pub cache: Arc<FreeBusyCache>,
    pub availability: AvailabilityEngine,
    pub booking: BookingService,
}

/// Core components over in-memory collaborators; the clock starts the day before [`day`].
pub fn harness_with(hours: BusinessHours) -> Harness {
    let calendar = Arc::new(InMemoryCalendar::new());
    let clock = Arc::new(ManualClock::new(
        Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap(),
    ));
    let cache = Arc::new(FreeBusyCache::new(calendar.clone(), clock.clone(), 0));
    let availability =
        AvailabilityEngine::new(cache.clone(), hours.clone(), catalog(), clock.clone());
    let booking = BookingService::new(
        calendar.clone(),
        cache.clone(),
        hours,
        catalog(),
        clock.clone(),
    );
    Harness {
        calendar,
        clock,
        cache,
        availability,
        booking,
    }
}

pub fn harness() -> Harness {
    harness_with(hours())
}
