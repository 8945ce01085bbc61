// --- File: crates/slotkeeper_booking/src/booking.rs ---
//! Booking validation, creation and cancellation.
//!
//! Validation fails fast in a fixed order: required fields, start in the
//! future, within business hours, free in the calendar. Only then is the
//! calendar asked to create the event.
//!
//! The free-slot check and the create call are not atomic. Two concurrent
//! requests for the same slot can both pass validation and both be created;
//! the external calendar is the only arbiter and it does not reject overlaps.

use chrono::{DateTime, Utc};
use slotkeeper_common::models::{Appointment, Customer, ServiceCatalog};
use slotkeeper_common::{CalendarGateway, Clock};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::cache::FreeBusyCache;
use crate::error::BookingError;
use crate::hours::BusinessHours;

pub struct BookingService {
    gateway: Arc<dyn CalendarGateway>,
    cache: Arc<FreeBusyCache>,
    hours: BusinessHours,
    catalog: Arc<ServiceCatalog>,
    clock: Arc<dyn Clock>,
}

impl BookingService {
    pub fn new(
        gateway: Arc<dyn CalendarGateway>,
        cache: Arc<FreeBusyCache>,
        hours: BusinessHours,
        catalog: Arc<ServiceCatalog>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            gateway,
            cache,
            hours,
            catalog,
            clock,
        }
    }

    /// Build a not-yet-created appointment for a catalog service.
    pub fn draft(
        &self,
        service_id: &str,
        start: DateTime<Utc>,
        customer: Customer,
        notes: impl Into<String>,
    ) -> Result<Appointment, BookingError> {
        let service = self.catalog.get(service_id).ok_or_else(|| {
            BookingError::InvalidAppointment(format!("unknown service {:?}", service_id))
        })?;
        Appointment::new(service.clone(), start, customer, notes).ok_or_else(|| {
            BookingError::InvalidAppointment(format!(
                "service {:?} cannot start at {}",
                service_id, start
            ))
        })
    }

    fn check_fields(candidate: &Appointment) -> Result<(), BookingError> {
        if candidate.service.id.trim().is_empty() {
            return Err(BookingError::InvalidAppointment(
                "service is required".to_string(),
            ));
        }
        if candidate.service.duration_minutes <= 0 {
            return Err(BookingError::InvalidAppointment(format!(
                "service duration must be positive, got {} minutes",
                candidate.service.duration_minutes
            )));
        }
        if candidate.service.end_from(candidate.start) != Some(candidate.end) {
            return Err(BookingError::InvalidAppointment(
                "end must equal start plus the service duration".to_string(),
            ));
        }
        Ok(())
    }

    /// Validate and create. On success the busy cache is invalidated for the
    /// appointment's window.
    pub async fn book(
        &self,
        candidate: &Appointment,
        cancel: &CancellationToken,
    ) -> Result<Appointment, BookingError> {
        Self::check_fields(candidate)?;

        if candidate.start <= self.clock.now() {
            return Err(BookingError::AppointmentInPast {
                start: candidate.start,
            });
        }

        let outside = BookingError::OutsideWorkingHours {
            start: candidate.start,
            end: candidate.end,
        };
        if !self.hours.contains(candidate.start, candidate.end) {
            return Err(outside);
        }
        let window = self
            .hours
            .day_window(self.hours.local_date(candidate.start))
            .ok_or(outside)?;

        let busy = self
            .cache
            .get(window, cancel)
            .await
            .map_err(BookingError::upstream)?;
        let slot = candidate.slot();
        if busy.iter().any(|b| slot.overlaps_busy(b)) {
            return Err(BookingError::SlotUnavailable {
                start: candidate.start,
                end: candidate.end,
            });
        }

        let created = self
            .gateway
            .create(candidate, cancel)
            .await
            .map_err(|e| {
                error!(start = %candidate.start, error = %e, "appointment creation failed");
                BookingError::creation(e)
            })?;

        self.cache.invalidate(created.slot());
        info!(
            id = ?created.id,
            service = %created.service.id,
            start = %created.start,
            customer = %created.customer.id,
            "appointment booked"
        );
        Ok(created)
    }

    /// Delete the appointment from the calendar. An unknown id is reported as
    /// [`BookingError::NotFound`].
    pub async fn cancel(
        &self,
        appointment_id: &str,
        cancel: &CancellationToken,
    ) -> Result<(), BookingError> {
        if appointment_id.trim().is_empty() {
            return Err(BookingError::InvalidAppointment(
                "appointment id is required".to_string(),
            ));
        }

        self.gateway
            .delete(appointment_id, cancel)
            .await
            .map_err(BookingError::upstream)?;

        // Only the id is known here, so the whole cache goes.
        self.cache.invalidate_all();
        info!(id = %appointment_id, "appointment cancelled");
        Ok(())
    }
}
