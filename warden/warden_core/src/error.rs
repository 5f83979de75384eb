//! Error types for the Warden permission broker.
//!
//! The root error type, `Error`, covers everything a broker caller can get
//! back from an operation. Storage and configuration keep their own error
//! types and are wrapped by `Error` through `#[from]`.
//!
//! Failures that belong to a single category's resolution are not returned as
//! errors at all. They are recorded as a [`Diagnostic`] attached to a `Denied`
//! state, so that one category failing never aborts a whole sequence.

use crate::category::{Category, CategoryFamily};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Root error type for the broker.
#[derive(Debug, Error)]
pub enum Error {
    /// Coordinator input is empty or repeats a category.
    #[error("Invalid sequence: {0}")]
    InvalidSequence(String),

    /// A category value does not exist in the registry, or is not registered
    /// with this broker.
    #[error("Unknown category: {0}")]
    UnknownCategory(String),

    /// A capability requester did not answer within the bounded window.
    #[error("Platform call for {category} timed out after {after_ms}ms")]
    PlatformTimeout {
        /// Category whose request timed out
        category: Category,

        /// Configured timeout in milliseconds
        after_ms: u64,
    },

    /// A category that needs setup was requested before it was configured.
    #[error("Category {0} requires preconfiguration before it can be requested")]
    PreconfigurationMissing(Category),

    /// A preconfiguration object does not fit its category.
    #[error("Invalid configuration for {category}: {reason}")]
    InvalidConfiguration {
        /// Category being configured
        category: Category,

        /// Why the configuration was rejected
        reason: String,
    },

    /// A registered category has no requester for its family.
    #[error("No capability requester registered for family {0}")]
    MissingRequester(CategoryFamily),

    /// The platform reported an error for a category.
    #[error("Platform error for {category}: {message}")]
    Platform {
        /// Category whose request failed
        category: Category,

        /// Message reported by the requester
        message: String,
    },

    /// Status store errors
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Errors raised by status stores.
#[derive(Debug, Error)]
pub enum StoreError {
    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The stored data could not be encoded or decoded
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Stored data references a category code that is not in the registry
    #[error("Stored data references unknown category: {0}")]
    UnknownCategory(String),
}

/// Errors raised while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read
    #[error("Failed to load configuration: {0}")]
    LoadFailed(String),

    /// The configuration file could not be parsed
    #[error("Failed to parse configuration: {0}")]
    ParseFailed(String),

    /// The configuration parsed but holds an invalid value
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Why a category resolved to `Denied` without a platform answer.
///
/// A diagnostic travels with the resolution, the transition event and the
/// coordinator's step result. The state it is attached to is provisional: it
/// is never persisted and the next request retries the platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Diagnostic {
    /// The requester did not answer in time.
    #[error("platform call timed out after {after_ms}ms")]
    PlatformTimeout {
        /// Configured timeout in milliseconds
        after_ms: u64,
    },

    /// A required preconfiguration was never supplied.
    #[error("preconfiguration missing")]
    PreconfigurationMissing,

    /// The requester reported an error.
    #[error("platform error: {message}")]
    PlatformError {
        /// Message reported by the requester
        message: String,
    },
}

impl Diagnostic {
    /// Lift this diagnostic into the root error type for `category`.
    pub fn into_error(self, category: Category) -> Error {
        match self {
            Diagnostic::PlatformTimeout { after_ms } => Error::PlatformTimeout { category, after_ms },
            Diagnostic::PreconfigurationMissing => Error::PreconfigurationMissing(category),
            Diagnostic::PlatformError { message } => Error::Platform { category, message },
        }
    }
}

/// Result type used throughout the broker.
pub type Result<T> = std::result::Result<T, Error>;
