//! Service abstractions for external collaborators.
//!
//! The booking core only talks to the outside world through these traits: the
//! authoritative calendar, the reminder bookkeeping store and the channel used
//! to reach customers. Implementations live in their own crates (Google
//! Calendar, SQL, Telegram) or in [`crate::memory`].
//!
//! Every calendar call takes a [`CancellationToken`]; cancelling it aborts
//! pending network I/O and retry backoff.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;

use crate::error::{GatewayError, NotifyError, StoreError};
use crate::models::{Appointment, AppointmentMetadata, BusyInterval, ReminderAction};

/// The single external calendar that owns all appointments.
#[async_trait]
pub trait CalendarGateway: Send + Sync {
    /// Create the appointment; the returned copy carries the calendar-assigned id.
    async fn create(
        &self,
        appointment: &Appointment,
        cancel: &CancellationToken,
    ) -> Result<Appointment, GatewayError>;

    /// Physically remove the appointment. Unknown ids yield `GatewayError::NotFound`.
    async fn delete(&self, appointment_id: &str, cancel: &CancellationToken)
        -> Result<(), GatewayError>;

    /// Busy intervals overlapping `[time_min, time_max)`, sorted by start.
    async fn list_busy(
        &self,
        time_min: DateTime<Utc>,
        time_max: DateTime<Utc>,
        cancel: &CancellationToken,
    ) -> Result<Vec<BusyInterval>, GatewayError>;

    /// The appointment with this id, or `None` when the calendar has no such entry.
    async fn find(
        &self,
        appointment_id: &str,
        cancel: &CancellationToken,
    ) -> Result<Option<Appointment>, GatewayError>;

    /// Appointments overlapping `[time_min, time_max)`, sorted by start.
    async fn list_upcoming(
        &self,
        time_min: DateTime<Utc>,
        time_max: DateTime<Utc>,
        cancel: &CancellationToken,
    ) -> Result<Vec<Appointment>, GatewayError>;
}

/// Key-value store for reminder bookkeeping, keyed by appointment id.
#[async_trait]
pub trait MetadataStore: Send + Sync {
    /// Returns the stored metadata, or an empty record when none exists yet.
    async fn get_metadata(&self, appointment_id: &str) -> Result<AppointmentMetadata, StoreError>;

    async fn save_metadata(
        &self,
        appointment_id: &str,
        metadata: &AppointmentMetadata,
    ) -> Result<(), StoreError>;
}

/// Outbound channel to customers.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn notify(
        &self,
        customer_id: &str,
        message: &str,
        actions: &[ReminderAction],
    ) -> Result<(), NotifyError>;
}
