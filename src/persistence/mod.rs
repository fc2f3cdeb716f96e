//! Persistence
//!
//! Whole-store JSON snapshot, written on shutdown and restored on
//! startup.

pub mod snapshot;

pub use snapshot::SnapshotConfig;
