//! Error types for carbon backend operations

use crate::{EntityId, EntityType};
use thiserror::Error;

/// Relational store errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StorageError {
    #[error("{entity_type} with id {id} not found")]
    NotFound {
        entity_type: EntityType,
        id: EntityId,
    },

    #[error("{entity_type} with {field} '{value}' already exists")]
    AlreadyExists {
        entity_type: EntityType,
        field: String,
        value: String,
    },

    #[error("Store unavailable: {reason}")]
    Unavailable { reason: String },

    #[error("Query failed: {reason}")]
    QueryFailed { reason: String },

    #[error("Storage lock poisoned")]
    LockPoisoned,
}

/// Cache layer errors.
///
/// Read paths treat every variant as a miss and fall back to the store.
/// Write paths report them without undoing the store mutation.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CacheError {
    #[error("{entity_type} with id {id} not in cache")]
    NotFound {
        entity_type: EntityType,
        id: EntityId,
    },

    #[error("Cache backend unavailable: {reason}")]
    Unavailable { reason: String },

    #[error("Cache operation '{operation}' timed out")]
    Timeout { operation: String },

    #[error("Failed to encode or decode {entity_type} snapshot: {reason}")]
    Serialization {
        entity_type: EntityType,
        reason: String,
    },

    #[error("Cache transaction failed: {reason}")]
    Transaction { reason: String },
}

/// Input validation errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Required field missing: {field}")]
    MissingField { field: String },

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },
}

/// Configuration errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing required configuration field: {field}")]
    MissingRequired { field: String },

    #[error("Invalid value for {field}: {value} - {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },
}

/// Master error type for all carbon backend errors.
#[derive(Debug, Clone, Error)]
pub enum CarbonError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}

/// Result type alias for carbon backend operations.
pub type CarbonResult<T> = Result<T, CarbonError>;

// =============================================================================
// TESTS
// =============================================================================
