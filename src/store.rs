//! The cache's public API
//!
//! `Store` owns a fixed set of shards, the shard router, the
//! expiration engine, and the snapshot path. It is cheap to clone (all
//! shared state lives behind `Arc`) so the HTTP surface can hand a copy
//! to every request handler.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde_json::Value as Json;
use tracing::{info, warn};

use crate::error::{Result, StoreError};
use crate::expiration::ExpirationEngine;
use crate::glob::KeyPattern;
use crate::metrics::Metrics;
use crate::persistence::snapshot::{self, SnapshotConfig};
use crate::router;
use crate::shard::Shard;
use crate::value::Value;

/// Tunables for a `Store`. Mirrors the process's `--shards`, `--items`,
/// `--dump`, and `--tick-interval` flags.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub shard_count: usize,
    pub shard_capacity_hint: usize,
    pub snapshot_path: std::path::PathBuf,
    pub tick_interval: Duration,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            shard_count: 256,
            shard_capacity_hint: 2048,
            snapshot_path: std::path::PathBuf::from("./var/cache.snapshot.json"),
            tick_interval: Duration::from_secs(1),
        }
    }
}

struct Inner {
    shards: Arc<Vec<Shard>>,
    config: StoreConfig,
    expiration: parking_lot::Mutex<ExpirationEngine>,
    closed: AtomicBool,
    started: AtomicBool,
    metrics: Metrics,
}

/// The sharded, TTL-aware key/value cache.
#[derive(Clone)]
pub struct Store {
    inner: Arc<Inner>,
}

impl Store {
    pub fn new(config: StoreConfig) -> Self {
        let shards: Vec<Shard> = (0..config.shard_count)
            .map(|_| Shard::with_capacity_hint(config.shard_capacity_hint))
            .collect();

        Self {
            inner: Arc::new(Inner {
                shards: Arc::new(shards),
                config,
                expiration: parking_lot::Mutex::new(ExpirationEngine::new()),
                closed: AtomicBool::new(false),
                started: AtomicBool::new(false),
                metrics: Metrics::new(),
            }),
        }
    }

    /// Snapshot of internal operation counters, for operators or tests;
    /// not exposed over HTTP (the spec names no metrics route).
    pub fn metrics(&self) -> &Metrics {
        &self.inner.metrics
    }

    fn ensure_open(&self) -> Result<()> {
        if self.inner.closed.load(Ordering::Acquire) {
            Err(StoreError::Unavailable)
        } else {
            Ok(())
        }
    }

    fn shard_for(&self, key: &str) -> (usize, &Shard) {
        let idx = router::route(key, self.inner.shards.len());
        (idx, &self.inner.shards[idx])
    }

    /// Starts the background reaper and, if a snapshot file exists,
    /// restores it. Idempotent once the reaper is running: a second
    /// call is a no-op, it does not re-load the snapshot or spawn a
    /// second reaper task.
    pub async fn run(&self) -> Result<()> {
        self.ensure_open()?;

        if self
            .inner
            .started
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Ok(());
        }

        let snapshot_config = SnapshotConfig {
            path: self.inner.config.snapshot_path.clone(),
        };
        match snapshot::load(&snapshot_config) {
            Ok(Some(restored)) => {
                let mut count = 0;
                for (shard_index, key, payload, ttl, kind_tag) in restored {
                    if crate::value::ValueKind::from_tag(kind_tag).is_none() {
                        warn!(kind_tag, key, "skipping snapshot entry with unknown kind tag");
                        continue;
                    }
                    if shard_index >= self.inner.shards.len() {
                        warn!(
                            shard_index,
                            key, "skipping snapshot entry for out-of-range shard index"
                        );
                        continue;
                    }
                    match Value::new(payload, ttl) {
                        Ok(value) => {
                            let value = Arc::new(value);
                            self.inner.shards[shard_index].put(key.clone(), Arc::clone(&value));
                            if ttl.is_some() {
                                self.enqueue_expiration(shard_index, key, &value);
                            }
                            count += 1;
                        }
                        Err(e) => warn!(error = %e, key, "skipping malformed snapshot entry"),
                    }
                }
                info!(restored = count, "restored store from snapshot");
                if let Err(e) = snapshot::remove(&snapshot_config) {
                    warn!(error = %e, "failed to remove consumed snapshot file");
                }
            }
            Ok(None) => {}
            Err(e) => warn!(error = %e, "failed to restore snapshot, starting empty"),
        }

        let shards = Arc::clone(&self.inner.shards);
        self.inner.expiration.lock().spawn(self.inner.config.tick_interval, move |idx, key, weak| {
            shards[idx].tick_if_matching(key, weak)
        });

        Ok(())
    }

    /// Writes a snapshot, stops the reaper, and marks the store closed.
    /// After this call every operation fails with `Unavailable`.
    pub async fn close(&self) -> Result<()> {
        self.inner.closed.store(true, Ordering::Release);

        let snapshot_config = SnapshotConfig {
            path: self.inner.config.snapshot_path.clone(),
        };
        snapshot::save(&snapshot_config, &self.inner.shards)
            .map_err(|e| StoreError::DumpFail(e.to_string()))?;

        self.inner.expiration.lock().close().await;
        Ok(())
    }

    fn enqueue_expiration(&self, shard_index: usize, key: String, value: &Arc<Value>) {
        self.inner
            .expiration
            .lock()
            .register(shard_index, key, Arc::downgrade(value));
    }

    pub fn set(&self, key: &str, payload: Json, ttl: Option<i64>) -> Result<()> {
        let started = Instant::now();
        let result = self.set_inner(key, payload, ttl);
        self.inner.metrics.record_operation("SET", started.elapsed());
        result
    }

    fn set_inner(&self, key: &str, payload: Json, ttl: Option<i64>) -> Result<()> {
        self.ensure_open()?;
        let value = Arc::new(Value::new(payload, ttl)?);
        let (shard_index, shard) = self.shard_for(key);
        let installed = shard.put(key.to_string(), value);
        if ttl.is_some() {
            self.enqueue_expiration(shard_index, key.to_string(), &installed);
        }
        Ok(())
    }

    pub fn get(&self, key: &str) -> Result<Arc<Value>> {
        let started = Instant::now();
        let result = self.get_inner(key);
        self.inner.metrics.record_operation("GET", started.elapsed());
        result
    }

    fn get_inner(&self, key: &str) -> Result<Arc<Value>> {
        self.ensure_open()?;
        let (_, shard) = self.shard_for(key);
        shard.get(key).ok_or(StoreError::NotFound)
    }

    pub fn get_by(&self, key: &str, selector: &str) -> Result<Json> {
        let started = Instant::now();
        let result = self.get_inner(key).and_then(|value| value.get_by(selector));
        self.inner.metrics.record_operation("GETBY", started.elapsed());
        result
    }

    pub fn remove(&self, key: &str) -> Result<()> {
        let started = Instant::now();
        let result = self.remove_inner(key);
        self.inner.metrics.record_operation("REMOVE", started.elapsed());
        result
    }

    fn remove_inner(&self, key: &str) -> Result<()> {
        self.ensure_open()?;
        let (_, shard) = self.shard_for(key);
        shard.remove(key);
        Ok(())
    }

    pub fn keys(&self, pattern: &str) -> Result<Vec<String>> {
        let started = Instant::now();
        let result = self.keys_inner(pattern);
        self.inner.metrics.record_operation("KEYS", started.elapsed());
        result
    }

    fn keys_inner(&self, pattern: &str) -> Result<Vec<String>> {
        self.ensure_open()?;
        let pattern = KeyPattern::compile(pattern)?;
        let mut matches = Vec::new();
        for shard in &self.inner.shards {
            matches.extend(shard.scan_matching(|k| pattern.matches(k)));
        }
        Ok(matches)
    }

    pub fn shard_count(&self) -> usize {
        self.inner.shards.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn test_store() -> Store {
        let dir = tempfile::tempdir().unwrap();
        Store::new(StoreConfig {
            shard_count: 8,
            shard_capacity_hint: 4,
            snapshot_path: dir.path().join("snapshot.json"),
            tick_interval: Duration::from_millis(10),
        })
    }

    #[tokio::test]
    async fn round_trip() {
        let store = test_store();
        store.run().await.unwrap();
        store.set("testGet", json!("ok"), None).unwrap();
        assert_eq!(store.get("testGet").unwrap().payload(), &json!("ok"));
        store.close().await.unwrap();
    }

    #[tokio::test]
    async fn overwrite_replaces_value() {
        let store = test_store();
        store.run().await.unwrap();
        store.set("k", json!("one"), Some(5)).unwrap();
        store.set("k", json!("two"), None).unwrap();
        assert_eq!(store.get("k").unwrap().payload(), &json!("two"));
        store.close().await.unwrap();
    }

    #[tokio::test]
    async fn expires_after_ttl_ticks() {
        let store = test_store();
        store.run().await.unwrap();
        store.set("t", json!("x"), Some(1)).unwrap();
        tokio::time::sleep(Duration::from_millis(60)).await;
        assert!(matches!(store.get("t"), Err(StoreError::NotFound)));
        store.close().await.unwrap();
    }

    #[tokio::test]
    async fn get_by_dispatches_on_kind() {
        let store = test_store();
        store.run().await.unwrap();
        store
            .set("testContentArr", json!([["ok"]]), Some(5))
            .unwrap();
        assert_eq!(store.get_by("testContentArr", "0").unwrap(), json!(["ok"]));

        store
            .set("testContentMap", json!({"key": {"innerKey": "ok"}}), Some(5))
            .unwrap();
        assert_eq!(
            store.get_by("testContentMap", "key").unwrap(),
            json!({"innerKey": "ok"})
        );
        store.close().await.unwrap();
    }

    #[tokio::test]
    async fn remove_is_idempotent() {
        let store = test_store();
        store.run().await.unwrap();
        store.set("k", json!("v"), None).unwrap();
        store.remove("k").unwrap();
        store.remove("k").unwrap();
        assert!(matches!(store.get("k"), Err(StoreError::NotFound)));
        store.close().await.unwrap();
    }

    #[tokio::test]
    async fn keys_matches_glob_pattern() {
        let store = test_store();
        store.run().await.unwrap();
        store.set("TestKeys", json!("ok"), Some(5)).unwrap();
        let matched = store.keys("Test*eys").unwrap();
        assert!(matched.contains(&"TestKeys".to_string()));
        store.close().await.unwrap();
    }

    #[tokio::test]
    async fn operations_fail_after_close() {
        let store = test_store();
        store.run().await.unwrap();
        store.close().await.unwrap();
        assert!(matches!(
            store.set("k", json!("v"), None),
            Err(StoreError::Unavailable)
        ));
    }

    #[tokio::test]
    async fn run_twice_is_a_no_op() {
        let store = test_store();
        store.run().await.unwrap();
        store.set("k", json!("v"), None).unwrap();

        // A second run() must not re-spawn the reaper or touch existing data.
        store.run().await.unwrap();
        assert_eq!(store.get("k").unwrap().payload(), &json!("v"));

        store.close().await.unwrap();
    }

    #[tokio::test]
    async fn metrics_count_operations() {
        let store = test_store();
        store.run().await.unwrap();
        store.set("k", json!("v"), None).unwrap();
        let _ = store.get("k");
        let _ = store.get("missing");
        assert_eq!(store.metrics().total_ops(), 3);
        let by_cmd = store.metrics().ops_by_command();
        assert_eq!(by_cmd.get("SET"), Some(&1));
        assert_eq!(by_cmd.get("GET"), Some(&2));
        store.close().await.unwrap();
    }
}
