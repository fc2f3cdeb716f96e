//! shardkv - sharded in-memory cache with TTL expiry
//!
//! A sharded key/value cache with per-entry time-to-live, glob-based
//! key enumeration, and structural subscripting (by sequence index or
//! mapping key) into stored values, exposed over HTTP/JSON and
//! persisted across restarts via a JSON snapshot file.

pub mod auth;
pub mod config;
pub mod error;
pub mod expiration;
pub mod glob;
pub mod http;
pub mod metrics;
pub mod persistence;
pub mod router;
pub mod server;
pub mod shard;
pub mod store;
pub mod value;

pub use error::{Result, StoreError};
pub use metrics::Metrics;
pub use server::Server;
pub use store::{Store, StoreConfig};
pub use value::{Value, ValueKind};
