// --- File: crates/slotkeeper_booking/src/cache.rs ---
//! Busy-set cache in front of the calendar gateway.
//!
//! Entries are keyed by the exact query window (normally one business day).
//! Invalidation evicts every entry whose window overlaps the given range.
//! The lock is never held across a gateway call; instead a generation counter
//! keeps a fetch that raced with an invalidation from storing its result.
//!
//! Every store first drops entries whose window has ended or whose TTL has
//! run out, then evicts the oldest fetches until the entry count is below
//! `max_entries`.

use chrono::{DateTime, Duration, Utc};
use slotkeeper_common::models::{BusyInterval, TimeSlot};
use slotkeeper_common::{CalendarGateway, Clock, GatewayError};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio_util::sync::CancellationToken;
use tracing::debug;

pub const DEFAULT_MAX_ENTRIES: usize = 256;

#[derive(Debug)]
struct Entry {
    busy: Vec<BusyInterval>,
    fetched_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct CacheState {
    entries: HashMap<TimeSlot, Entry>,
    /// Bumped by every invalidation.
    generation: u64,
}

pub struct FreeBusyCache {
    gateway: Arc<dyn CalendarGateway>,
    clock: Arc<dyn Clock>,
    ttl: Option<Duration>,
    max_entries: usize,
    state: Mutex<CacheState>,
}

impl FreeBusyCache {
    /// `ttl_secs == 0` keeps entries until they are invalidated.
    pub fn new(gateway: Arc<dyn CalendarGateway>, clock: Arc<dyn Clock>, ttl_secs: u64) -> Self {
        let ttl = i64::try_from(ttl_secs)
            .ok()
            .filter(|secs| *secs > 0)
            .and_then(Duration::try_seconds);
        Self {
            gateway,
            clock,
            ttl,
            max_entries: DEFAULT_MAX_ENTRIES,
            state: Mutex::new(CacheState::default()),
        }
    }

    /// Cap on stored windows; 0 disables storing altogether.
    pub fn with_max_entries(mut self, max_entries: usize) -> Self {
        self.max_entries = max_entries;
        self
    }

    fn lock(&self) -> MutexGuard<'_, CacheState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn is_fresh(&self, entry: &Entry, now: DateTime<Utc>) -> bool {
        match self.ttl {
            Some(ttl) => now - entry.fetched_at < ttl,
            None => true,
        }
    }

    /// Make room for one more entry at `now`.
    fn prune(&self, state: &mut CacheState, now: DateTime<Utc>) {
        let before = state.entries.len();
        state
            .entries
            .retain(|window, entry| window.end > now && self.is_fresh(entry, now));
        while !state.entries.is_empty() && state.entries.len() >= self.max_entries {
            let oldest = state
                .entries
                .iter()
                .min_by_key(|(window, entry)| (entry.fetched_at, window.start))
                .map(|(window, _)| *window);
            match oldest {
                Some(window) => {
                    state.entries.remove(&window);
                }
                None => break,
            }
        }
        let pruned = before - state.entries.len();
        if pruned > 0 {
            debug!(pruned, remaining = state.entries.len(), "busy cache pruned");
        }
    }

    /// Busy intervals for `window`, from cache or from the gateway.
    ///
    /// Gateway failures are returned and nothing is stored.
    pub async fn get(
        &self,
        window: TimeSlot,
        cancel: &CancellationToken,
    ) -> Result<Vec<BusyInterval>, GatewayError> {
        let generation = {
            let state = self.lock();
            if let Some(entry) = state.entries.get(&window) {
                if self.is_fresh(entry, self.clock.now()) {
                    debug!(start = %window.start, end = %window.end, "busy cache hit");
                    return Ok(entry.busy.clone());
                }
            }
            state.generation
        };

        debug!(start = %window.start, end = %window.end, "busy cache miss");
        let busy = self
            .gateway
            .list_busy(window.start, window.end, cancel)
            .await?;

        let now = self.clock.now();
        let mut state = self.lock();
        if state.generation != generation {
            debug!(start = %window.start, "cache invalidated during fetch, result not stored");
        } else if window.end <= now || self.max_entries == 0 {
            debug!(start = %window.start, "window not kept in busy cache");
        } else {
            state.entries.remove(&window);
            self.prune(&mut state, now);
            state.entries.insert(
                window,
                Entry {
                    busy: busy.clone(),
                    fetched_at: now,
                },
            );
        }
        Ok(busy)
    }

    /// Evict every entry whose window overlaps `range`.
    pub fn invalidate(&self, range: TimeSlot) {
        let mut state = self.lock();
        state.generation += 1;
        let before = state.entries.len();
        state.entries.retain(|window, _| !window.overlaps(&range));
        debug!(
            evicted = before - state.entries.len(),
            start = %range.start,
            end = %range.end,
            "busy cache invalidated"
        );
    }

    pub fn invalidate_all(&self) {
        let mut state = self.lock();
        state.generation += 1;
        state.entries.clear();
        debug!("busy cache cleared");
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
