//! Error types for LODESTAR operations

use crate::LookupKind;
use thiserror::Error;

/// Filter validation errors, raised before any cache or store access.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FilterError {
    #[error("Invalid value for criterion \"{criterion}\": {reason}")]
    InvalidCriterion {
        criterion: &'static str,
        reason: String,
    },

    #[error("Required criterion missing: \"{criterion}\"")]
    MissingCriterion { criterion: &'static str },
}

/// Cache store errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("Cache store unavailable: {reason}")]
    Unavailable { reason: String },

    #[error("Failed to serialize shard \"{shard}\": {reason}")]
    Serialization { shard: String, reason: String },

    #[error("Failed to deserialize shard \"{shard}\": {reason}")]
    Deserialization { shard: String, reason: String },
}

/// Backing store read errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SourceError {
    #[error("Bulk read of {table} failed: {reason}")]
    Unavailable { table: String, reason: String },
}

/// Master error type for all LODESTAR operations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FinderError {
    #[error("Filter error: {0}")]
    Filter(#[from] FilterError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Source error: {0}")]
    Source(#[from] SourceError),

    /// The shard was populated and warm, but the requested key path does
    /// not exist in it. A definitive answer, never a transient condition.
    #[error("Catalog {lookup} not found for {criteria}")]
    NotFound {
        lookup: LookupKind,
        criteria: String,
    },

    #[error("Required dependency missing: {dependency}")]
    DependencyMissing { dependency: &'static str },
}

/// Result type alias for LODESTAR operations.
pub type FinderResult<T> = Result<T, FinderError>;

// =============================================================================
// TESTS
// =============================================================================
