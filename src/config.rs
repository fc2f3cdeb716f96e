//! Process configuration
//!
//! Plain data carried from parsed CLI flags down into the `Store` and
//! the HTTP surface; kept separate from `clap::Parser` so the rest of
//! the crate has no CLI dependency.

use std::path::PathBuf;
use std::time::Duration;

use sha1::{Digest, Sha1};

use crate::store::StoreConfig;

/// Full process configuration, assembled from CLI flags.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Listen address, e.g. `0.0.0.0:8081`.
    pub socket: String,

    /// Number of shards.
    pub shards: usize,

    /// Per-shard capacity hint.
    pub items: usize,

    /// Snapshot file path.
    pub dump: PathBuf,

    /// Log file path, used unless `stdout` is set.
    pub log: PathBuf,

    /// Tracing log level filter, e.g. `info`.
    pub log_level: String,

    /// Log to stdout instead of `log`.
    pub stdout: bool,

    /// Reaper tick interval.
    pub tick_interval: Duration,

    /// Auth login, combined with `password` to derive the expected token.
    pub login: String,

    /// Auth password, combined with `login` to derive the expected token.
    pub password: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            socket: "0.0.0.0:8081".to_string(),
            shards: 256,
            items: 2048,
            dump: PathBuf::from("./var/cache.snapshot.json"),
            log: PathBuf::from("./var/cache.log"),
            log_level: "info".to_string(),
            stdout: false,
            tick_interval: Duration::from_secs(1),
            login: String::new(),
            password: String::new(),
        }
    }
}

impl ServerConfig {
    pub fn store_config(&self) -> StoreConfig {
        StoreConfig {
            shard_count: self.shards,
            shard_capacity_hint: self.items,
            snapshot_path: self.dump.clone(),
            tick_interval: self.tick_interval,
        }
    }

    /// The token every request's `token` header must equal to pass the
    /// auth filter: lowercase hex SHA-1 of `login || password`.
    pub fn expected_token(&self) -> String {
        derive_token(&self.login, &self.password)
    }
}

/// Shared by both the server (to compute the expected token) and the
/// CLI client (to compute the token it sends).
pub fn derive_token(login: &str, password: &str) -> String {
    let mut hasher = Sha1::new();
    hasher.update(login.as_bytes());
    hasher.update(password.as_bytes());
    let digest = hasher.finalize();
    digest.iter().map(|b| format!("{:02x}", b)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_derivation_is_deterministic() {
        assert_eq!(derive_token("a", "b"), derive_token("a", "b"));
        assert_ne!(derive_token("a", "b"), derive_token("a", "c"));
    }
}
