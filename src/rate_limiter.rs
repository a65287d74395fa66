//! # Rate Limiter Module
//!
//! Fixed-window request limiting keyed by client and route. Counters live
//! behind the [`CounterStore`] trait so the limiter can be shared by several
//! processes through an external store; [`InMemoryCounterStore`] covers the
//! single-process case.

use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::errors::RateLimitError;

pub const DEFAULT_MAX_REQUESTS: u32 = 100;
pub const DEFAULT_WINDOW_SECS: i64 = 15 * 60;

/// Counter state of one key after an increment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowState {
    /// Requests counted in the current window, including this one
    pub count: u32,
    /// When the current window closes
    pub reset_at: DateTime<Utc>,
}

/// Storage for per-key request counters with expiry
pub trait CounterStore: Send + Sync {
    /// Count one request for `key`, opening a new window of length `window`
    /// when none is active at `now`
    fn increment(
        &self,
        key: &str,
        window: Duration,
        now: DateTime<Utc>,
    ) -> Result<WindowState, RateLimitError>;
}

/// Process-local counter store. Closed windows are swept during
/// increments at most once per window length.
#[derive(Debug, Default)]
pub struct InMemoryCounterStore {
    windows: Mutex<Windows>,
}

#[derive(Debug, Default)]
struct Windows {
    counters: HashMap<String, WindowState>,
    next_sweep: Option<DateTime<Utc>>,
}

impl Windows {
    fn purge_expired(&mut self, now: DateTime<Utc>) -> usize {
        let before = self.counters.len();
        self.counters.retain(|_, state| state.reset_at >= now);
        before - self.counters.len()
    }
}

fn window_end(now: DateTime<Utc>, window: Duration) -> DateTime<Utc> {
    now.checked_add_signed(window)
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

impl InMemoryCounterStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop windows that closed before `now`, returning how many were removed
    pub fn purge_expired(&self, now: DateTime<Utc>) -> Result<usize, RateLimitError> {
        Ok(self.lock()?.purge_expired(now))
    }

    pub fn len(&self) -> usize {
        self.lock().map(|w| w.counters.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Windows>, RateLimitError> {
        self.windows
            .lock()
            .map_err(|e| RateLimitError::Store(e.to_string()))
    }
}

impl CounterStore for InMemoryCounterStore {
    fn increment(
        &self,
        key: &str,
        window: Duration,
        now: DateTime<Utc>,
    ) -> Result<WindowState, RateLimitError> {
        let mut windows = self.lock()?;
        let reset_at = window_end(now, window);

        if windows.next_sweep.map_or(true, |at| now >= at) {
            windows.purge_expired(now);
            windows.next_sweep = Some(reset_at);
        }

        let state = windows
            .counters
            .entry(key.to_string())
            .and_modify(|state| {
                if now > state.reset_at {
                    *state = WindowState { count: 1, reset_at };
                } else {
                    state.count = state.count.saturating_add(1);
                }
            })
            .or_insert(WindowState { count: 1, reset_at });
        Ok(*state)
    }
}

/// Fixed-window limiter over an injected counter store
#[derive(Clone)]
pub struct RateLimiter {
    store: Arc<dyn CounterStore>,
    max_requests: u32,
    window: Duration,
}

impl std::fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimiter")
            .field("max_requests", &self.max_requests)
            .field("window", &self.window)
            .finish_non_exhaustive()
    }
}

impl RateLimiter {
    pub fn new(store: Arc<dyn CounterStore>, max_requests: u32, window: Duration) -> Self {
        Self {
            store,
            max_requests,
            window,
        }
    }

    /// In-memory limiter with the default 100 requests per 15 minutes
    pub fn in_memory() -> Self {
        Self::new(
            Arc::new(InMemoryCounterStore::new()),
            DEFAULT_MAX_REQUESTS,
            Duration::seconds(DEFAULT_WINDOW_SECS),
        )
    }

    pub fn max_requests(&self) -> u32 {
        self.max_requests
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Count a request from `client` on `route` against the limit
    pub fn check(&self, client: &str, route: &str) -> Result<WindowState, RateLimitError> {
        self.check_at(client, route, Utc::now())
    }

    /// Same as [`check`](Self::check) with an explicit clock
    pub fn check_at(
        &self,
        client: &str,
        route: &str,
        now: DateTime<Utc>,
    ) -> Result<WindowState, RateLimitError> {
        let key = rate_limit_key(client, route);
        let state = self.store.increment(&key, self.window, now)?;

        if state.count > self.max_requests {
            let remaining_ms = (state.reset_at - now).num_milliseconds().max(0);
            // round up to whole seconds
            let retry_after_secs = ((remaining_ms + 999) / 1000) as u64;
            return Err(RateLimitError::Exceeded { retry_after_secs });
        }
        Ok(state)
    }
}

pub fn rate_limit_key(client: &str, route: &str) -> String {
    format!("{}-{}", client, route)
}
