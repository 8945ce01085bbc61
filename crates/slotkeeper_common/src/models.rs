// --- File: crates/slotkeeper_common/src/models.rs ---

// Domain types shared by the gateway implementations, the metadata stores and
// the booking core.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use slotkeeper_config::ServiceConfig;
use std::collections::BTreeSet;

use crate::error::{config_error, SlotkeeperError};

/// Half-open overlap test on `[start1, end1)` and `[start2, end2)`.
pub fn overlaps(
    start1: DateTime<Utc>,
    end1: DateTime<Utc>,
    start2: DateTime<Utc>,
    end2: DateTime<Utc>,
) -> bool {
    start1 < end2 && end1 > start2
}

/// An offered treatment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Service {
    pub id: String,
    pub name: String,
    pub duration_minutes: i64,
    /// Price in the smallest currency unit (e.g., cents).
    pub price: i64,
    pub currency: Option<String>,
}

impl Service {
    /// `None` when the minute count does not fit a [`Duration`].
    pub fn duration(&self) -> Option<Duration> {
        Duration::try_minutes(self.duration_minutes)
    }

    /// End of an appointment starting at `start`, if representable.
    pub fn end_from(&self, start: DateTime<Utc>) -> Option<DateTime<Utc>> {
        start.checked_add_signed(self.duration()?)
    }
}

impl From<&ServiceConfig> for Service {
    fn from(config: &ServiceConfig) -> Self {
        Self {
            id: config.id.clone(),
            name: config.name.clone(),
            duration_minutes: config.duration_minutes,
            price: config.price,
            currency: config.currency.clone(),
        }
    }
}

/// The services the business offers, as configured at startup.
#[derive(Debug, Clone, Default)]
pub struct ServiceCatalog {
    services: Vec<Service>,
}

impl ServiceCatalog {
    pub fn new(services: Vec<Service>) -> Self {
        Self { services }
    }

    /// Rejects entries whose duration is not positive or not representable.
    pub fn from_config(services: &[ServiceConfig]) -> Result<Self, SlotkeeperError> {
        let mut catalog = Vec::with_capacity(services.len());
        for config in services {
            let service = Service::from(config);
            match service.duration() {
                Some(d) if d > Duration::zero() => catalog.push(service),
                _ => {
                    return Err(config_error(format!(
                        "service {:?} has invalid duration of {} minutes",
                        service.id, service.duration_minutes
                    )))
                }
            }
        }
        Ok(Self::new(catalog))
    }

    pub fn get(&self, id: &str) -> Option<&Service> {
        self.services.iter().find(|s| s.id == id)
    }

    pub fn all(&self) -> &[Service] {
        &self.services
    }
}

/// A candidate or busy interval, half-open `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimeSlot {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeSlot {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    pub fn overlaps(&self, other: &TimeSlot) -> bool {
        overlaps(self.start, self.end, other.start, other.end)
    }

    pub fn overlaps_busy(&self, busy: &BusyInterval) -> bool {
        overlaps(self.start, self.end, busy.start, busy.end)
    }
}

/// Time already occupied in the external calendar. Has no identity of its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusyInterval {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl BusyInterval {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppointmentStatus {
    Confirmed,
    Cancelled,
}

/// Opaque external identity of the person who booked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    pub id: String,
    pub display_name: String,
}

/// A booked occupancy of time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Appointment {
    /// Assigned by the external calendar; `None` until created.
    pub id: Option<String>,
    pub service: Service,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub customer: Customer,
    pub notes: String,
    pub status: AppointmentStatus,
}

impl Appointment {
    /// A not yet created appointment; `end` follows from the service duration.
    /// `None` when that end is not representable.
    pub fn new(
        service: Service,
        start: DateTime<Utc>,
        customer: Customer,
        notes: impl Into<String>,
    ) -> Option<Self> {
        let end = service.end_from(start)?;
        Some(Self {
            id: None,
            service,
            start,
            end,
            customer,
            notes: notes.into(),
            status: AppointmentStatus::Confirmed,
        })
    }

    pub fn slot(&self) -> TimeSlot {
        TimeSlot::new(self.start, self.end)
    }

    pub fn is_live(&self) -> bool {
        self.status == AppointmentStatus::Confirmed
    }
}

/// Reminder bookkeeping for one appointment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppointmentMetadata {
    pub confirmed_at: Option<DateTime<Utc>>,
    /// Threshold labels already delivered, e.g. `{"72h"}`.
    pub reminders_sent: BTreeSet<String>,
}

impl AppointmentMetadata {
    pub fn has_sent(&self, label: &str) -> bool {
        self.reminders_sent.contains(label)
    }

    pub fn mark_sent(&mut self, label: &str) {
        self.reminders_sent.insert(label.to_string());
    }

    pub fn is_confirmed(&self) -> bool {
        self.confirmed_at.is_some()
    }
}

/// Affordance attached to a reminder message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "lowercase")]
pub enum ReminderAction {
    Confirm { appointment_id: String },
    Cancel { appointment_id: String },
}

impl ReminderAction {
    pub fn label(&self) -> &'static str {
        match self {
            ReminderAction::Confirm { .. } => "Confirm",
            ReminderAction::Cancel { .. } => "Cancel",
        }
    }

    /// Compact routing key, e.g. `confirm:abc123`.
    pub fn callback_data(&self) -> String {
        match self {
            ReminderAction::Confirm { appointment_id } => format!("confirm:{}", appointment_id),
            ReminderAction::Cancel { appointment_id } => format!("cancel:{}", appointment_id),
        }
    }

    /// Inverse of [`ReminderAction::callback_data`].
    pub fn parse_callback(data: &str) -> Option<Self> {
        let (kind, id) = data.split_once(':')?;
        if id.is_empty() {
            return None;
        }
        let appointment_id = id.to_string();
        match kind {
            "confirm" => Some(ReminderAction::Confirm { appointment_id }),
            "cancel" => Some(ReminderAction::Cancel { appointment_id }),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 5, 5, hour, minute, 0).unwrap()
    }

    #[test]
    fn test_touching_intervals_do_not_overlap() {
        let a = TimeSlot::new(at(9, 0), at(10, 0));
        let b = TimeSlot::new(at(10, 0), at(11, 0));
        assert!(!a.overlaps(&b));
        assert!(!b.overlaps(&a));
    }

    #[test]
    fn test_partial_and_contained_overlap() {
        let a = TimeSlot::new(at(9, 0), at(10, 0));
        assert!(a.overlaps(&TimeSlot::new(at(9, 30), at(10, 30))));
        assert!(a.overlaps(&TimeSlot::new(at(9, 15), at(9, 45))));
        assert!(a.overlaps_busy(&BusyInterval::new(at(8, 0), at(12, 0))));
    }

    #[test]
    fn test_new_appointment_end_follows_duration() {
        let service = Service {
            id: "massage-45".to_string(),
            name: "Massage".to_string(),
            duration_minutes: 45,
            price: 6500,
            currency: Some("CHF".to_string()),
        };
        let customer = Customer {
            id: "42".to_string(),
            display_name: "Ada".to_string(),
        };

        let appointment = Appointment::new(service, at(9, 0), customer, "").unwrap();

        assert_eq!(appointment.end, at(9, 45));
        assert!(appointment.id.is_none());
        assert!(appointment.is_live());
    }

    #[test]
    fn test_callback_data_parses_back() {
        let confirm = ReminderAction::Confirm {
            appointment_id: "evt1".to_string(),
        };
        assert_eq!(confirm.callback_data(), "confirm:evt1");
        assert_eq!(ReminderAction::parse_callback("confirm:evt1"), Some(confirm));
        assert_eq!(ReminderAction::parse_callback("cancel:"), None);
        assert_eq!(ReminderAction::parse_callback("reschedule:evt1"), None);
    }

    fn service_config(id: &str, duration_minutes: i64) -> ServiceConfig {
        ServiceConfig {
            id: id.to_string(),
            name: id.to_string(),
            duration_minutes,
            price: 0,
            currency: None,
        }
    }

    #[test]
    fn test_catalog_rejects_unusable_durations() {
        for minutes in [0, -15, 10_000_000_000_000, i64::MAX] {
            let result = ServiceCatalog::from_config(&[service_config("cut", 30), service_config("odd", minutes)]);
            assert!(
                matches!(result, Err(SlotkeeperError::ConfigError(ref m)) if m.contains("\"odd\"")),
                "{} minutes: {:?}",
                minutes,
                result
            );
        }
    }

    #[test]
    fn test_catalog_keeps_valid_services_in_order() {
        let catalog =
            ServiceCatalog::from_config(&[service_config("cut", 30), service_config("dye", 120)]).unwrap();
        let ids: Vec<&str> = catalog.all().iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, ["cut", "dye"]);
        assert_eq!(catalog.get("dye").and_then(Service::duration), Some(Duration::hours(2)));
    }
}
