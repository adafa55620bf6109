//! Logical-Clock Expiry Scheduler
//!
//! Keys with a time-to-live are tracked on a logical clock rather than wall
//! time. The clock (`elapsed`) advances by one on every tick and a TTL is a
//! number of ticks:
//!
//! ```text
//!   insert("k", ttl=3) at elapsed=4   ->  heap entry k=7
//!
//!   tick  elapsed=5   k=7 pending
//!   tick  elapsed=6   k=7 pending
//!   tick  elapsed=7   k=7 fires -> on_expire("k")
//! ```
//!
//! When a tick finds the heap empty the clock goes back to zero. The heap,
//! the clock and that reset all live under one mutex, so an `insert` always
//! rebases against the clock value the next tick will increment.
//!
//! [`ExpiryTicker`] drives the clock from a background tokio task, one tick
//! per [`ExpiryConfig::tick_interval`]. Dropping the ticker stops the task.

use crate::storage::timer::{TimerEntry, TimerHeap};
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info, trace};

/// Called with each expired key. Returns whether a key was actually removed.
pub type ExpireCallback = Box<dyn Fn(&str) -> bool + Send + Sync>;

#[derive(Debug, Default)]
struct Clock {
    heap: TimerHeap,
    elapsed: i64,
}

/// Fires key expirations on a logical clock.
pub struct Scheduler {
    clock: Mutex<Clock>,
    on_expire: ExpireCallback,
}

impl Scheduler {
    pub fn new<F>(on_expire: F) -> Self
    where
        F: Fn(&str) -> bool + Send + Sync + 'static,
    {
        Self {
            clock: Mutex::new(Clock::default()),
            on_expire: Box::new(on_expire),
        }
    }

    /// Schedules `key` to expire `ttl` ticks from now.
    pub fn insert(&self, key: &str, ttl: i64) {
        let mut clock = self.clock.lock();
        let expiry = clock.elapsed.saturating_add(ttl);
        clock.heap.push(TimerEntry::new(key, expiry));
        trace!(key = key, expiry = expiry, "Expiry scheduled");
    }

    /// Advances the clock by one tick and fires every entry that is due.
    ///
    /// Returns the number of entries fired. Callbacks run after the clock
    /// lock is released.
    pub fn tick(&self) -> usize {
        let fired: Vec<TimerEntry> = {
            let mut clock = self.clock.lock();
            clock.elapsed += 1;

            if clock.heap.is_empty() {
                clock.elapsed = 0;
                return 0;
            }

            let now = clock.elapsed;
            clock.heap.expired(now).collect()
        };

        for entry in &fired {
            if !(self.on_expire)(&entry.key) {
                trace!(key = %entry.key, "Expired key was already gone");
            }
        }

        fired.len()
    }

    /// Drops every pending expiry for `key`. Returns how many were dropped.
    pub fn cancel(&self, key: &str) -> usize {
        let removed = self.clock.lock().heap.remove(key);
        if removed > 0 {
            trace!(key = key, removed = removed, "Expiry cancelled");
        }
        removed
    }

    /// Current value of the logical clock.
    pub fn elapsed(&self) -> i64 {
        self.clock.lock().elapsed
    }

    /// Number of entries waiting to fire.
    pub fn pending(&self) -> usize {
        self.clock.lock().heap.len()
    }
}

impl fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let clock = self.clock.lock();
        f.debug_struct("Scheduler")
            .field("elapsed", &clock.elapsed)
            .field("pending", &clock.heap.len())
            .finish()
    }
}

/// Configuration for the expiry ticker.
#[derive(Debug, Clone)]
pub struct ExpiryConfig {
    /// Wall-clock length of one logical tick (default: 1s)
    pub tick_interval: Duration,
}

impl Default for ExpiryConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_secs(1),
        }
    }
}

/// A handle to the running ticker task.
///
/// When this handle is dropped, the ticker task will be stopped.
#[derive(Debug)]
pub struct ExpiryTicker {
    shutdown_tx: watch::Sender<bool>,
}

impl ExpiryTicker {
    /// Spawns the ticker on the current tokio runtime.
    ///
    /// The first tick happens one `tick_interval` after start.
    pub fn start(scheduler: Arc<Scheduler>, config: ExpiryConfig) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        info!(
            tick_ms = config.tick_interval.as_millis() as u64,
            "Expiry ticker started"
        );
        tokio::spawn(ticker_loop(scheduler, config, shutdown_rx));

        Self { shutdown_tx }
    }

    /// Stops the ticker. Called automatically on drop.
    pub fn stop(&self) {
        if !*self.shutdown_tx.borrow() {
            let _ = self.shutdown_tx.send(true);
            info!("Expiry ticker stopped");
        }
    }
}

impl Drop for ExpiryTicker {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn ticker_loop(
    scheduler: Arc<Scheduler>,
    config: ExpiryConfig,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    let start = tokio::time::Instant::now() + config.tick_interval;
    let mut interval = tokio::time::interval_at(start, config.tick_interval);

    loop {
        tokio::select! {
            biased;

            result = shutdown_rx.changed() => {
                if result.is_err() || *shutdown_rx.borrow() {
                    debug!("Expiry ticker received shutdown signal");
                    return;
                }
            }
            _ = interval.tick() => {}
        }

        let fired = scheduler.tick();
        if fired > 0 {
            debug!(
                fired = fired,
                pending = scheduler.pending(),
                "Expired keys removed"
            );
        }
    }
}
