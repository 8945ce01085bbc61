// --- File: crates/slotkeeper_booking/src/availability.rs ---
//! Bookable slot computation for a single business day.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use slotkeeper_common::models::{BusyInterval, ServiceCatalog, TimeSlot};
use slotkeeper_common::{Clock, GatewayError};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::cache::FreeBusyCache;
use crate::error::BookingError;
use crate::hours::BusinessHours;

/// Candidate starts from `window.start` every `step` while the slot still
/// ends by `window.end`, keeping only those strictly after `now`.
pub fn candidate_slots(
    window: TimeSlot,
    duration: Duration,
    step: Duration,
    now: DateTime<Utc>,
) -> Vec<TimeSlot> {
    let mut candidates = Vec::new();
    if duration <= Duration::zero() || step <= Duration::zero() {
        return candidates;
    }
    let mut start = window.start;
    while let Some(end) = start.checked_add_signed(duration) {
        if end > window.end {
            break;
        }
        if start > now {
            candidates.push(TimeSlot::new(start, end));
        }
        match start.checked_add_signed(step) {
            Some(next) => start = next,
            None => break,
        }
    }
    candidates
}

/// Drop candidates that touch a busy interval, then drop any candidate that
/// starts before the previously emitted slot ends. Input must be ascending.
pub fn free_slots(candidates: Vec<TimeSlot>, busy: &[BusyInterval]) -> Vec<TimeSlot> {
    let mut slots: Vec<TimeSlot> = Vec::with_capacity(candidates.len());
    for candidate in candidates {
        if busy.iter().any(|b| candidate.overlaps_busy(b)) {
            continue;
        }
        if let Some(last) = slots.last() {
            if candidate.start < last.end {
                continue;
            }
        }
        slots.push(candidate);
    }
    slots
}

pub struct AvailabilityEngine {
    cache: Arc<FreeBusyCache>,
    hours: BusinessHours,
    catalog: Arc<ServiceCatalog>,
    clock: Arc<dyn Clock>,
}

impl AvailabilityEngine {
    pub fn new(
        cache: Arc<FreeBusyCache>,
        hours: BusinessHours,
        catalog: Arc<ServiceCatalog>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            cache,
            hours,
            catalog,
            clock,
        }
    }

    /// Free slots of `duration_minutes` on `date` (business-local), ascending.
    ///
    /// A failing busy lookup is logged and the day is treated as free.
    pub async fn available_slots(
        &self,
        date: NaiveDate,
        duration_minutes: i64,
        cancel: &CancellationToken,
    ) -> Result<Vec<TimeSlot>, BookingError> {
        if duration_minutes <= 0 {
            return Err(BookingError::InvalidDuration(duration_minutes));
        }
        // Positive but beyond what a Duration can hold: longer than any day.
        let Some(duration) = Duration::try_minutes(duration_minutes) else {
            debug!(duration_minutes, "duration exceeds any business day");
            return Ok(Vec::new());
        };
        let Some(window) = self.hours.day_window(date) else {
            debug!(%date, "closed day, no slots");
            return Ok(Vec::new());
        };

        let candidates = candidate_slots(
            window,
            duration,
            self.hours.scan_interval(),
            self.clock.now(),
        );
        if candidates.is_empty() {
            return Ok(candidates);
        }

        let busy = match self.cache.get(window, cancel).await {
            Ok(busy) => busy,
            Err(GatewayError::Cancelled) => return Err(BookingError::Cancelled),
            Err(e) => {
                warn!(%date, error = %e, "busy lookup failed, treating day as free");
                Vec::new()
            }
        };

        let slots = free_slots(candidates, &busy);
        debug!(%date, duration_minutes, count = slots.len(), "available slots computed");
        Ok(slots)
    }

    pub async fn available_slots_for_service(
        &self,
        date: NaiveDate,
        service_id: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<TimeSlot>, BookingError> {
        let service = self.catalog.get(service_id).ok_or_else(|| {
            BookingError::InvalidAppointment(format!("unknown service {:?}", service_id))
        })?;
        self.available_slots(date, service.duration_minutes, cancel)
            .await
    }
}
