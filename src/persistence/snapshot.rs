//! JSON snapshot codec
//!
//! The whole store is serialized into a single JSON document keyed by
//! a two-character lowercase hex shard prefix, matching the router in
//! [`crate::router`]. An empty store writes nothing — no file is
//! created or overwritten. Writes retry a few times before giving up.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value as Json;
use tracing::warn;

use crate::error::{Result, StoreError};
use crate::shard::Shard;

const WRITE_RETRIES: usize = 3;

#[derive(Debug, Clone)]
pub struct SnapshotConfig {
    pub path: PathBuf,
}

#[derive(Serialize, Deserialize)]
struct WireEntry {
    body: Json,
    ttl: Option<i64>,
    #[serde(rename = "type")]
    kind_tag: u8,
}

type WireShard = std::collections::BTreeMap<String, WireEntry>;
type WireDocument = std::collections::BTreeMap<String, WireShard>;

/// Writes every non-empty shard to `config.path`. Does nothing if the
/// whole store is empty.
pub fn save(config: &SnapshotConfig, shards: &[Shard]) -> std::result::Result<(), StoreError> {
    let mut doc = WireDocument::new();

    for (idx, shard) in shards.iter().enumerate() {
        if shard.is_empty() {
            continue;
        }
        let mut wire_shard = WireShard::new();
        for (key, value) in shard.snapshot_entries() {
            wire_shard.insert(
                key,
                WireEntry {
                    body: value.payload().clone(),
                    ttl: value.remaining_ttl(),
                    kind_tag: value.kind().tag(),
                },
            );
        }
        doc.insert(shard_hex(idx), wire_shard);
    }

    if doc.is_empty() {
        return Ok(());
    }

    let encoded = serde_json::to_vec_pretty(&doc)
        .map_err(|e| StoreError::DumpFail(format!("encode: {e}")))?;

    let mut last_err = None;
    for attempt in 0..WRITE_RETRIES {
        match write_atomically(&config.path, &encoded) {
            Ok(()) => return Ok(()),
            Err(e) => {
                warn!(attempt, error = %e, "snapshot write attempt failed");
                last_err = Some(e);
            }
        }
    }
    Err(StoreError::DumpFail(
        last_err.map(|e| e.to_string()).unwrap_or_default(),
    ))
}

fn write_atomically(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let tmp_path = path.with_extension("tmp");
    fs::write(&tmp_path, bytes)?;
    fs::rename(&tmp_path, path)
}

/// Reads back a snapshot file, if present, as a flat list of
/// `(shard_index, key, payload, ttl, kind_tag)` tuples ready for
/// reinsertion. Returns `Ok(None)` if the file does not exist.
/// Malformed entries are skipped and logged rather than failing the
/// whole restore.
#[allow(clippy::type_complexity)]
pub fn load(
    config: &SnapshotConfig,
) -> Result<Option<Vec<(usize, String, Json, Option<i64>, u8)>>> {
    let bytes = match fs::read(&config.path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            warn!(error = %e, "failed to read snapshot file");
            return Ok(None);
        }
    };

    let doc: WireDocument = match serde_json::from_slice(&bytes) {
        Ok(doc) => doc,
        Err(e) => {
            warn!(error = %e, "failed to parse snapshot file");
            return Ok(None);
        }
    };

    let mut restored = Vec::new();
    for (shard_hex, entries) in doc {
        let Ok(shard_index) = usize::from_str_radix(&shard_hex, 16) else {
            warn!(shard_hex, "skipping snapshot shard with invalid hex prefix");
            continue;
        };
        for (key, entry) in entries {
            restored.push((shard_index, key, entry.body, entry.ttl, entry.kind_tag));
        }
    }

    Ok(Some(restored))
}

/// Deletes the snapshot file so an unclean shutdown cannot resurrect
/// data already folded back into memory.
pub fn remove(config: &SnapshotConfig) -> std::io::Result<()> {
    match fs::remove_file(&config.path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}

fn shard_hex(index: usize) -> String {
    format!("{:02x}", index)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;
    use serde_json::json;
    use std::sync::Arc;

    fn config_in(dir: &tempfile::TempDir) -> SnapshotConfig {
        SnapshotConfig {
            path: dir.path().join("snapshot.json"),
        }
    }

    #[test]
    fn empty_store_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(&dir);
        let shards = vec![Shard::with_capacity_hint(1)];
        save(&config, &shards).unwrap();
        assert!(!config.path.exists());
    }

    #[test]
    fn round_trips_entries() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(&dir);

        let shards: Vec<Shard> = (0..4).map(|_| Shard::with_capacity_hint(4)).collect();
        shards[2].put(
            "k".to_string(),
            Arc::new(Value::new(json!("hello"), Some(7)).unwrap()),
        );

        save(&config, &shards).unwrap();
        assert!(config.path.exists());

        let restored = load(&config).unwrap().unwrap();
        assert_eq!(restored.len(), 1);
        let (shard_index, key, body, ttl, kind_tag) = &restored[0];
        assert_eq!(*shard_index, 2);
        assert_eq!(key, "k");
        assert_eq!(body, &json!("hello"));
        assert_eq!(*ttl, Some(7));
        assert_eq!(*kind_tag, 0);

        remove(&config).unwrap();
        assert!(!config.path.exists());
    }

    #[test]
    fn missing_file_restores_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(&dir);
        assert!(load(&config).unwrap().is_none());
    }
}
