// --- File: crates/slotkeeper_booking/src/reminders.rs ---
//! Periodic reminder delivery.
//!
//! Every tick the scheduler lists appointments starting within the horizon
//! and sends each due threshold at most once. A threshold counts as delivered
//! only after the sink accepted the message and the metadata store recorded
//! it, so a failure on either side leaves the reminder eligible for the next
//! tick (at-least-once, never zero).

use chrono::{DateTime, Duration, Utc};
use chrono_tz::Tz;
use slotkeeper_common::models::{Appointment, AppointmentMetadata, ReminderAction};
use slotkeeper_common::{CalendarGateway, Clock, GatewayError, MetadataStore, NotificationSink};
use slotkeeper_config::ReminderConfig;
use std::sync::Arc;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::error::BookingError;

/// One reminder point before an appointment's start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReminderThreshold {
    /// Recorded in `reminders_sent` once delivered, e.g. `"72h"`.
    pub label: String,
    pub lead: Duration,
    /// Width of the due window `(lead - tolerance, lead]`.
    pub tolerance: Duration,
    pub skip_if_confirmed: bool,
}

impl ReminderThreshold {
    pub fn new(label: &str, lead: Duration, tolerance: Duration, skip_if_confirmed: bool) -> Self {
        Self {
            label: label.to_string(),
            lead,
            tolerance,
            skip_if_confirmed,
        }
    }

    pub fn is_due(&self, time_to_start: Duration) -> bool {
        time_to_start > self.lead - self.tolerance && time_to_start <= self.lead
    }
}

/// "72h" always, "24h" unless the customer already confirmed.
pub fn default_thresholds() -> Vec<ReminderThreshold> {
    vec![
        ReminderThreshold::new("72h", Duration::hours(72), Duration::hours(1), false),
        ReminderThreshold::new("24h", Duration::hours(24), Duration::hours(1), true),
    ]
}

/// Outcome counts of one scan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanReport {
    pub sent: usize,
    /// Due but suppressed because the appointment is confirmed.
    pub skipped: usize,
    /// Send or bookkeeping failures; retried next tick.
    pub failed: usize,
}

impl ScanReport {
    pub fn is_quiet(&self) -> bool {
        self.sent == 0 && self.skipped == 0 && self.failed == 0
    }
}

pub struct ReminderScheduler {
    gateway: Arc<dyn CalendarGateway>,
    store: Arc<dyn MetadataStore>,
    sink: Arc<dyn NotificationSink>,
    clock: Arc<dyn Clock>,
    thresholds: Vec<ReminderThreshold>,
    horizon: Duration,
    tick_interval: std::time::Duration,
    timezone: Tz,
}

impl ReminderScheduler {
    pub fn new(
        gateway: Arc<dyn CalendarGateway>,
        store: Arc<dyn MetadataStore>,
        sink: Arc<dyn NotificationSink>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let defaults = ReminderConfig::default();
        Self {
            gateway,
            store,
            sink,
            clock,
            thresholds: default_thresholds(),
            horizon: Duration::hours(defaults.horizon_hours),
            tick_interval: std::time::Duration::from_secs(defaults.tick_interval_secs),
            timezone: Tz::UTC,
        }
    }

    pub fn with_config(mut self, config: &ReminderConfig) -> Self {
        self.horizon = Duration::hours(config.horizon_hours);
        self.tick_interval = std::time::Duration::from_secs(config.tick_interval_secs.max(1));
        self
    }

    pub fn with_thresholds(mut self, thresholds: Vec<ReminderThreshold>) -> Self {
        self.thresholds = thresholds;
        self
    }

    /// Zone used to render appointment times in messages.
    pub fn with_timezone(mut self, timezone: Tz) -> Self {
        self.timezone = timezone;
        self
    }

    pub fn tick_interval(&self) -> std::time::Duration {
        self.tick_interval
    }

    /// Tick until `cancel` fires. The first scan runs immediately; a scan in
    /// progress when cancellation arrives is allowed to end.
    pub async fn run(&self, cancel: CancellationToken) {
        info!(
            interval_secs = self.tick_interval.as_secs(),
            "reminder scheduler started"
        );
        let mut ticker = tokio::time::interval(self.tick_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }
            match self.scan_once(&cancel).await {
                Ok(report) if report.is_quiet() => debug!("reminder scan: nothing due"),
                Ok(report) => info!(
                    sent = report.sent,
                    skipped = report.skipped,
                    failed = report.failed,
                    "reminder scan finished"
                ),
                Err(e) => warn!(error = %e, "reminder scan failed, retrying next tick"),
            }
        }
        info!("reminder scheduler stopped");
    }

    /// One pass over the upcoming appointments.
    pub async fn scan_once(&self, cancel: &CancellationToken) -> Result<ScanReport, GatewayError> {
        let now = self.clock.now();
        let upcoming = self
            .gateway
            .list_upcoming(now, now + self.horizon, cancel)
            .await?;

        let mut report = ScanReport::default();
        for appointment in upcoming
            .iter()
            .filter(|a| a.is_live() && !a.customer.id.trim().is_empty())
        {
            let Some(id) = appointment.id.as_deref() else {
                continue;
            };
            self.process(id, appointment, now, &mut report).await;
        }
        Ok(report)
    }

    async fn process(
        &self,
        id: &str,
        appointment: &Appointment,
        now: DateTime<Utc>,
        report: &mut ScanReport,
    ) {
        let time_to_start = appointment.start - now;
        let due: Vec<&ReminderThreshold> = self
            .thresholds
            .iter()
            .filter(|t| t.is_due(time_to_start))
            .collect();
        if due.is_empty() {
            return;
        }

        let mut metadata = match self.store.get_metadata(id).await {
            Ok(metadata) => metadata,
            Err(e) => {
                warn!(appointment_id = %id, error = %e, "metadata unavailable, skipping appointment");
                report.failed += 1;
                return;
            }
        };

        for threshold in due {
            if metadata.has_sent(&threshold.label) {
                debug!(appointment_id = %id, label = %threshold.label, "reminder already sent");
                continue;
            }
            if threshold.skip_if_confirmed && metadata.is_confirmed() {
                debug!(appointment_id = %id, label = %threshold.label, "confirmed, reminder suppressed");
                report.skipped += 1;
                continue;
            }

            let message = self.message(appointment, threshold);
            let actions = [
                ReminderAction::Confirm {
                    appointment_id: id.to_string(),
                },
                ReminderAction::Cancel {
                    appointment_id: id.to_string(),
                },
            ];
            if let Err(e) = self
                .sink
                .notify(&appointment.customer.id, &message, &actions)
                .await
            {
                error!(appointment_id = %id, label = %threshold.label, error = %e, "reminder send failed");
                report.failed += 1;
                continue;
            }

            metadata.mark_sent(&threshold.label);
            match self.store.save_metadata(id, &metadata).await {
                Ok(()) => {
                    info!(appointment_id = %id, label = %threshold.label, "reminder sent");
                    report.sent += 1;
                }
                Err(e) => {
                    error!(appointment_id = %id, label = %threshold.label, error = %e, "reminder sent but not recorded");
                    report.failed += 1;
                }
            }
        }
    }

    fn message(&self, appointment: &Appointment, threshold: &ReminderThreshold) -> String {
        let local = appointment.start.with_timezone(&self.timezone);
        let when = if threshold.lead >= Duration::hours(48) {
            format!("in {} days", threshold.lead.num_days())
        } else {
            "tomorrow".to_string()
        };
        format!(
            "Hello {}, a reminder of your {} appointment {}: {}. Please confirm or cancel.",
            appointment.customer.display_name,
            appointment.service.name,
            when,
            local.format("%A %d.%m.%Y %H:%M")
        )
    }

    /// Mark the appointment as confirmed by the customer. An existing
    /// confirmation time is kept. Ids the calendar does not hold as a live
    /// appointment are refused before anything is written.
    pub async fn record_confirmation(
        &self,
        appointment_id: &str,
        cancel: &CancellationToken,
    ) -> Result<AppointmentMetadata, BookingError> {
        let live = self
            .gateway
            .find(appointment_id, cancel)
            .await
            .map_err(BookingError::upstream)?
            .is_some_and(|appointment| appointment.is_live());
        if !live {
            warn!(appointment_id, "confirmation for unknown appointment refused");
            return Err(BookingError::NotFound(appointment_id.to_string()));
        }

        let mut metadata = self.store.get_metadata(appointment_id).await?;
        if metadata.is_confirmed() {
            return Ok(metadata);
        }
        metadata.confirmed_at = Some(self.clock.now());
        self.store.save_metadata(appointment_id, &metadata).await?;
        info!(appointment_id, "appointment confirmed");
        Ok(metadata)
    }
}
