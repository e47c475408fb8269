//! Per-client fixed-window rate limiting.
//!
//! Each client key gets one window holding a counter and the instant at which
//! the window resets. The counter is bumped before the threshold check, so a
//! rejected call still counts. Because windows are fixed, a client can land
//! up to `2 * max_requests` calls inside any rolling interval that straddles
//! a reset.
//!
//! Windows whose reset instant has passed are dropped by a periodic sweep.
//! The table never holds more than `max_tracked_clients` keys. When it is
//! full, a new key triggers an inline sweep at most once per
//! [`INLINE_SWEEP_GAP`]; if no slot frees up the new key is rejected (fail
//! closed) while keys already tracked keep being counted as usual.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use common::RateLimitConfig;

/// Minimum spacing between two inline sweeps of a full table.
pub const INLINE_SWEEP_GAP: Duration = Duration::from_secs(1);

const NEVER_SWEPT: u64 = u64::MAX;

/// Counter state for one client key.
#[derive(Debug, Clone, Copy)]
struct ClientWindow {
    count: u64,
    reset_at: Instant,
}

impl ClientWindow {
    fn fresh(now: Instant, window: Duration) -> Self {
        Self {
            count: 0,
            reset_at: now.checked_add(window).unwrap_or(now),
        }
    }
}

/// Outcome of an admission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Admitted {
        limit: u64,
        remaining: u64,
    },
    Rejected {
        limit: u64,
        retry_after_secs: u64,
    },
}

impl Admission {
    pub fn is_admitted(&self) -> bool {
        matches!(self, Admission::Admitted { .. })
    }
}

/// Fixed-window counter table keyed by client.
pub struct RateLimiter {
    windows: DashMap<String, ClientWindow>,
    /// Slots reserved in `windows`; always at least `windows.len()`.
    tracked: AtomicUsize,
    max_requests: u64,
    window: Duration,
    max_tracked_clients: usize,
    sweep_interval: Duration,
    epoch: Instant,
    last_inline_sweep_ms: AtomicU64,
}

impl RateLimiter {
    pub fn new(config: &RateLimitConfig) -> Self {
        Self {
            windows: DashMap::new(),
            tracked: AtomicUsize::new(0),
            max_requests: config.max_requests,
            window: config.window(),
            max_tracked_clients: config.max_tracked_clients.max(1),
            sweep_interval: config.sweep_interval(),
            epoch: Instant::now(),
            last_inline_sweep_ms: AtomicU64::new(NEVER_SWEPT),
        }
    }

    /// Count one call from `client_key` at `now` and decide whether it passes.
    ///
    /// The shard lock for the key is held across the whole read-modify-write,
    /// so concurrent calls for the same client never lose an increment.
    pub fn admit(&self, client_key: &str, now: Instant) -> Admission {
        if let Some(mut window) = self.windows.get_mut(client_key) {
            return self.count_call(window.value_mut(), now);
        }

        if !self.reserve_slot(now) {
            debug!(
                client = client_key,
                tracked = self.tracked_clients(),
                "Rate limit table full, refusing new client"
            );
            return Admission::Rejected {
                limit: self.max_requests,
                retry_after_secs: INLINE_SWEEP_GAP.as_secs().max(1),
            };
        }

        match self.windows.entry(client_key.to_owned()) {
            Entry::Occupied(mut entry) => {
                // Another call inserted the key first.
                self.tracked.fetch_sub(1, Ordering::AcqRel);
                self.count_call(entry.get_mut(), now)
            }
            Entry::Vacant(entry) => {
                let mut window = entry.insert(ClientWindow::fresh(now, self.window));
                self.count_call(window.value_mut(), now)
            }
        }
    }

    fn count_call(&self, window: &mut ClientWindow, now: Instant) -> Admission {
        if now > window.reset_at {
            *window = ClientWindow::fresh(now, self.window);
        }

        window.count += 1;

        if window.count > self.max_requests {
            Admission::Rejected {
                limit: self.max_requests,
                retry_after_secs: retry_after_secs(window.reset_at, now),
            }
        } else {
            Admission::Admitted {
                limit: self.max_requests,
                remaining: self.max_requests - window.count,
            }
        }
    }

    /// Reserve room for one new key, sweeping inline if the table is full
    /// and no inline sweep ran within [`INLINE_SWEEP_GAP`].
    fn reserve_slot(&self, now: Instant) -> bool {
        if self.try_reserve() {
            return true;
        }
        if self.claim_inline_sweep(now) {
            self.sweep(now);
            return self.try_reserve();
        }
        false
    }

    fn try_reserve(&self) -> bool {
        self.tracked
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| {
                (n < self.max_tracked_clients).then_some(n + 1)
            })
            .is_ok()
    }

    fn claim_inline_sweep(&self, now: Instant) -> bool {
        let at = now.saturating_duration_since(self.epoch).as_millis() as u64;
        let last = self.last_inline_sweep_ms.load(Ordering::Acquire);
        let gap = INLINE_SWEEP_GAP.as_millis() as u64;
        if last != NEVER_SWEPT && at < last.saturating_add(gap) {
            return false;
        }
        self.last_inline_sweep_ms
            .compare_exchange(last, at, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Drop every window that has already reset. Returns how many were removed.
    pub fn sweep(&self, now: Instant) -> usize {
        let mut removed = 0;
        self.windows.retain(|_, window| {
            let live = window.reset_at >= now;
            if !live {
                removed += 1;
            }
            live
        });
        if removed > 0 {
            self.tracked.fetch_sub(removed, Ordering::AcqRel);
            debug!(
                removed,
                remaining = self.windows.len(),
                "Swept expired rate limit windows"
            );
        }
        removed
    }

    /// Number of client keys currently tracked.
    pub fn tracked_clients(&self) -> usize {
        self.windows.len()
    }

    /// Spawn a background task that sweeps expired windows until `shutdown` fires.
    pub fn spawn_sweeper(self: &Arc<Self>, shutdown: CancellationToken) {
        let limiter = Arc::clone(self);
        let interval = limiter.sweep_interval;
        tokio::spawn(async move {
            let mut tick = tokio::time::interval(interval);
            tick.tick().await;
            loop {
                tokio::select! {
                    _ = tick.tick() => {
                        limiter.sweep(Instant::now());
                    }
                    _ = shutdown.cancelled() => {
                        debug!("Rate limit sweeper shutting down");
                        break;
                    }
                }
            }
        });
    }

    #[cfg(test)]
    fn count(&self, client_key: &str) -> Option<u64> {
        self.windows.get(client_key).map(|w| w.count)
    }
}

/// Whole seconds until `reset_at`, rounded up, never below one.
fn retry_after_secs(reset_at: Instant, now: Instant) -> u64 {
    let millis = reset_at.saturating_duration_since(now).as_millis() as u64;
    millis.div_ceil(1000).max(1)
}
