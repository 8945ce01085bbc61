// --- File: crates/slotkeeper_booking/src/error.rs ---
use chrono::{DateTime, Utc};
use slotkeeper_common::{GatewayError, SlotkeeperError, StoreError};
use thiserror::Error;

/// Errors produced by the availability engine and the booking service.
///
/// The first five variants are validation outcomes meant for the end user.
/// They are never retried.
#[derive(Error, Debug)]
pub enum BookingError {
    #[error("Invalid duration: {0} minutes")]
    InvalidDuration(i64),
    #[error("Invalid appointment: {0}")]
    InvalidAppointment(String),
    #[error("Appointment at {start} is in the past")]
    AppointmentInPast { start: DateTime<Utc> },
    #[error("Appointment {start} - {end} is outside working hours")]
    OutsideWorkingHours {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
    #[error("Slot {start} - {end} is no longer available")]
    SlotUnavailable {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
    #[error("Appointment not found: {0}")]
    NotFound(String),
    #[error("Failed to create appointment: {0}")]
    Creation(#[source] GatewayError),
    #[error("Calendar error: {0}")]
    Upstream(#[source] GatewayError),
    #[error("Operation cancelled")]
    Cancelled,
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl BookingError {
    /// Wrap a gateway failure that happened outside `create`.
    pub(crate) fn upstream(err: GatewayError) -> Self {
        match err {
            GatewayError::NotFound(id) => BookingError::NotFound(id),
            GatewayError::Cancelled => BookingError::Cancelled,
            other => BookingError::Upstream(other),
        }
    }

    /// Wrap a failure of the gateway's `create`.
    pub(crate) fn creation(err: GatewayError) -> Self {
        match err {
            GatewayError::Cancelled => BookingError::Cancelled,
            other => BookingError::Creation(other),
        }
    }

    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            BookingError::InvalidDuration(_)
                | BookingError::InvalidAppointment(_)
                | BookingError::AppointmentInPast { .. }
                | BookingError::OutsideWorkingHours { .. }
                | BookingError::SlotUnavailable { .. }
        )
    }
}

impl From<BookingError> for SlotkeeperError {
    fn from(err: BookingError) -> Self {
        match err {
            BookingError::SlotUnavailable { .. } => SlotkeeperError::ConflictError(err.to_string()),
            BookingError::NotFound(id) => SlotkeeperError::NotFoundError(id),
            BookingError::Creation(_) | BookingError::Upstream(_) => {
                SlotkeeperError::ExternalServiceError {
                    service_name: "calendar".to_string(),
                    message: err.to_string(),
                }
            }
            BookingError::Cancelled => SlotkeeperError::CancelledError(err.to_string()),
            BookingError::Store(e) => e.into(),
            _ => SlotkeeperError::ValidationError(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use slotkeeper_common::HttpStatusCode;

    #[test]
    fn test_status_mapping() {
        let t = Utc.with_ymd_and_hms(2025, 6, 2, 9, 0, 0).unwrap();
        let cases: Vec<(BookingError, u16)> = vec![
            (BookingError::InvalidDuration(0), 400),
            (BookingError::AppointmentInPast { start: t }, 400),
            (BookingError::OutsideWorkingHours { start: t, end: t }, 400),
            (BookingError::SlotUnavailable { start: t, end: t }, 409),
            (BookingError::NotFound("evt".to_string()), 404),
            (
                BookingError::Creation(GatewayError::Status {
                    status: 400,
                    message: "bad".to_string(),
                }),
                502,
            ),
            (BookingError::Cancelled, 504),
        ];
        for (err, status) in cases {
            let label = err.to_string();
            assert_eq!(SlotkeeperError::from(err).status_code(), status, "{}", label);
        }
    }

    #[test]
    fn test_gateway_not_found_is_kept_distinct() {
        let err = BookingError::upstream(GatewayError::NotFound("evt-1".to_string()));
        assert!(matches!(err, BookingError::NotFound(id) if id == "evt-1"));
        assert!(!BookingError::Cancelled.is_validation());
    }
}
