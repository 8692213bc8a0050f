//! Error types for Ferry core

use thiserror::Error;

/// Errors related to endpoint identity
#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("Invalid identity format: {0}")]
    InvalidFormat(String),

    #[error("Invalid identity length: expected {expected}, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    #[error("Unsupported endpoint scheme: {0}")]
    UnsupportedScheme(String),
}
