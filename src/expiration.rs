//! Background TTL reaper
//!
//! A single long-lived task replaces the per-item-timer approach:
//! every installed Expiration Record is ticked once per reaper
//! interval from a flat pending list, rather than spawning a task per
//! entry. Shutdown is signalled immediately via a `Notify` rather than
//! waiting out the remainder of the current interval.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::shard::TickOutcome;
use crate::value::Value;

/// A single outstanding cleanup obligation for one value.
pub struct PendingRecord {
    pub shard_index: usize,
    pub key: String,
    pub weak: Weak<Value>,
}

/// Drives the reaper loop against a set of shards, reached through a
/// caller-supplied closure so this module stays independent of `Store`.
pub struct ExpirationEngine {
    pending: Arc<Mutex<Vec<PendingRecord>>>,
    notify: Arc<Notify>,
    stopped: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl ExpirationEngine {
    pub fn new() -> Self {
        Self {
            pending: Arc::new(Mutex::new(Vec::new())),
            notify: Arc::new(Notify::new()),
            stopped: Arc::new(AtomicBool::new(false)),
            handle: None,
        }
    }

    /// Queues a new Expiration Record. Called by `Store::set` whenever a
    /// value is installed with a finite TTL.
    pub fn register(&self, shard_index: usize, key: String, weak: Weak<Value>) {
        self.pending.lock().push(PendingRecord {
            shard_index,
            key,
            weak,
        });
    }

    /// Spawns the reaper task. `tick_shard` is called with a shard index
    /// and a pending record's key/weak handle, and must return the
    /// outcome of ticking it against that shard.
    pub fn spawn<F>(&mut self, interval: Duration, tick_shard: F)
    where
        F: Fn(usize, &str, &Weak<Value>) -> TickOutcome + Send + Sync + 'static,
    {
        let pending = Arc::clone(&self.pending);
        let notify = Arc::clone(&self.notify);
        let stopped = Arc::clone(&self.stopped);

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {}
                    _ = notify.notified() => {
                        if stopped.load(Ordering::Acquire) {
                            break;
                        }
                        continue;
                    }
                }

                if stopped.load(Ordering::Acquire) {
                    break;
                }

                let batch = std::mem::take(&mut *pending.lock());
                if batch.is_empty() {
                    continue;
                }

                let mut still_pending = Vec::with_capacity(batch.len());
                let mut reaped = 0u64;
                for record in batch {
                    match tick_shard(record.shard_index, &record.key, &record.weak) {
                        TickOutcome::Pending => still_pending.push(record),
                        TickOutcome::Removed => reaped += 1,
                        TickOutcome::Stale => {}
                    }
                }
                if reaped > 0 {
                    debug!(reaped, "expiration engine reaped entries");
                }
                pending.lock().extend(still_pending);
            }
        });

        self.handle = Some(handle);
    }

    /// Signals the reaper to stop and waits for it to drain its current
    /// pass. Safe to call even if `spawn` was never called.
    pub async fn close(&mut self) {
        self.stopped.store(true, Ordering::Release);
        self.notify.notify_one();
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
    }

    /// Snapshot of the currently pending records, used when restoring
    /// from disk so the caller can re-enqueue restored entries.
    pub fn pending_len(&self) -> usize {
        self.pending.lock().len()
    }
}

impl Default for ExpirationEngine {
    fn default() -> Self {
        Self::new()
    }
}
