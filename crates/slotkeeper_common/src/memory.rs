//! In-process implementations of the collaborator traits.
//!
//! Used by the backend when no external calendar or database is configured and
//! by tests across the workspace. Both are safe to share between tasks.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};
use tokio_util::sync::CancellationToken;
use tracing::debug;
use uuid::Uuid;

use crate::error::{GatewayError, StoreError};
use crate::models::{overlaps, Appointment, AppointmentMetadata, BusyInterval};
use crate::services::{CalendarGateway, MetadataStore};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

#[derive(Debug, Default)]
struct CalendarState {
    appointments: Vec<Appointment>,
    /// Busy time that is not an appointment (private events, holidays).
    blocks: Vec<BusyInterval>,
}

/// A calendar held in memory.
#[derive(Debug, Default)]
pub struct InMemoryCalendar {
    state: Mutex<CalendarState>,
    busy_queries: AtomicUsize,
    fail_busy: AtomicBool,
    fail_create: AtomicBool,
}

impl InMemoryCalendar {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark `[start, end)` busy without creating an appointment.
    pub fn block(&self, start: DateTime<Utc>, end: DateTime<Utc>) {
        lock(&self.state).blocks.push(BusyInterval::new(start, end));
    }

    /// Insert an appointment as if another client had created it.
    pub fn insert(&self, mut appointment: Appointment) -> String {
        let id = appointment
            .id
            .clone()
            .unwrap_or_else(|| format!("mem-{}", Uuid::new_v4()));
        appointment.id = Some(id.clone());
        lock(&self.state).appointments.push(appointment);
        id
    }

    /// Number of `list_busy` calls served so far.
    pub fn busy_queries(&self) -> usize {
        self.busy_queries.load(Ordering::SeqCst)
    }

    pub fn appointments(&self) -> Vec<Appointment> {
        lock(&self.state).appointments.clone()
    }

    /// Make subsequent `list_busy` calls fail with a 503.
    pub fn set_busy_failure(&self, failing: bool) {
        self.fail_busy.store(failing, Ordering::SeqCst);
    }

    /// Make subsequent `create` calls fail with a 503.
    pub fn set_create_failure(&self, failing: bool) {
        self.fail_create.store(failing, Ordering::SeqCst);
    }

    fn unavailable() -> GatewayError {
        GatewayError::Status {
            status: 503,
            message: "calendar unavailable".to_string(),
        }
    }
}

#[async_trait]
impl CalendarGateway for InMemoryCalendar {
    async fn create(
        &self,
        appointment: &Appointment,
        cancel: &CancellationToken,
    ) -> Result<Appointment, GatewayError> {
        if cancel.is_cancelled() {
            return Err(GatewayError::Cancelled);
        }
        if self.fail_create.load(Ordering::SeqCst) {
            return Err(Self::unavailable());
        }
        let mut created = appointment.clone();
        created.id = Some(format!("mem-{}", Uuid::new_v4()));
        lock(&self.state).appointments.push(created.clone());
        debug!(id = ?created.id, start = %created.start, "in-memory appointment created");
        Ok(created)
    }

    async fn delete(
        &self,
        appointment_id: &str,
        cancel: &CancellationToken,
    ) -> Result<(), GatewayError> {
        if cancel.is_cancelled() {
            return Err(GatewayError::Cancelled);
        }
        let mut state = lock(&self.state);
        let before = state.appointments.len();
        state
            .appointments
            .retain(|a| a.id.as_deref() != Some(appointment_id));
        if state.appointments.len() == before {
            return Err(GatewayError::NotFound(appointment_id.to_string()));
        }
        Ok(())
    }

    async fn list_busy(
        &self,
        time_min: DateTime<Utc>,
        time_max: DateTime<Utc>,
        cancel: &CancellationToken,
    ) -> Result<Vec<BusyInterval>, GatewayError> {
        if cancel.is_cancelled() {
            return Err(GatewayError::Cancelled);
        }
        self.busy_queries.fetch_add(1, Ordering::SeqCst);
        if self.fail_busy.load(Ordering::SeqCst) {
            return Err(Self::unavailable());
        }
        let state = lock(&self.state);
        let mut busy: Vec<BusyInterval> = state
            .appointments
            .iter()
            .filter(|a| a.is_live())
            .map(|a| BusyInterval::new(a.start, a.end))
            .chain(state.blocks.iter().copied())
            .filter(|b| overlaps(b.start, b.end, time_min, time_max))
            .collect();
        busy.sort_by_key(|b| b.start);
        Ok(busy)
    }

    async fn find(
        &self,
        appointment_id: &str,
        cancel: &CancellationToken,
    ) -> Result<Option<Appointment>, GatewayError> {
        if cancel.is_cancelled() {
            return Err(GatewayError::Cancelled);
        }
        Ok(lock(&self.state)
            .appointments
            .iter()
            .find(|a| a.id.as_deref() == Some(appointment_id))
            .cloned())
    }

    async fn list_upcoming(
        &self,
        time_min: DateTime<Utc>,
        time_max: DateTime<Utc>,
        cancel: &CancellationToken,
    ) -> Result<Vec<Appointment>, GatewayError> {
        if cancel.is_cancelled() {
            return Err(GatewayError::Cancelled);
        }
        let mut upcoming: Vec<Appointment> = lock(&self.state)
            .appointments
            .iter()
            .filter(|a| overlaps(a.start, a.end, time_min, time_max))
            .cloned()
            .collect();
        upcoming.sort_by_key(|a| a.start);
        Ok(upcoming)
    }
}

/// Metadata kept in a map; lost on restart.
#[derive(Debug, Default)]
pub struct InMemoryMetadataStore {
    records: Mutex<HashMap<String, AppointmentMetadata>>,
    saves: AtomicUsize,
    fail_saves: AtomicBool,
}

impl InMemoryMetadataStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of successful `save_metadata` calls.
    pub fn saves(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    pub fn set_save_failure(&self, failing: bool) {
        self.fail_saves.store(failing, Ordering::SeqCst);
    }
}

#[async_trait]
impl MetadataStore for InMemoryMetadataStore {
    async fn get_metadata(&self, appointment_id: &str) -> Result<AppointmentMetadata, StoreError> {
        Ok(lock(&self.records)
            .get(appointment_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn save_metadata(
        &self,
        appointment_id: &str,
        metadata: &AppointmentMetadata,
    ) -> Result<(), StoreError> {
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("writes disabled".to_string()));
        }
        lock(&self.records).insert(appointment_id.to_string(), metadata.clone());
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
