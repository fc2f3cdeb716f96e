//! Shared error type
//!
//! Every layer of the store returns `StoreError`; the HTTP surface maps
//! it to a status code.

use thiserror::Error;

/// Errors produced by the store and its collaborators.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("key not found")]
    NotFound,

    #[error("value is not a sequence or mapping")]
    NotSequence,

    #[error("selector does not match the stored value's kind")]
    SubSeqType,

    #[error("payload is not a string, array, or object")]
    UnknownDataType,

    #[error("ttl must not be negative")]
    NegativeTtl,

    #[error("invalid glob pattern: {0}")]
    InvalidPattern(String),

    #[error("failed to write snapshot: {0}")]
    DumpFail(String),

    #[error("store is closed")]
    Unavailable,
}

pub type Result<T> = std::result::Result<T, StoreError>;
