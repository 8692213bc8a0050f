//! DTN-specific error types

use thiserror::Error;

/// Bundle store admission errors
///
/// None of these are fatal; the router keeps operating on the remaining
/// bundles and links.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// The bundle can never fit in the store
    #[error("Bundle exceeds store capacity (size: {size}, max: {max})")]
    OverCapacity { size: usize, max: usize },

    /// No room left even after evicting the oldest bundles
    #[error("Buffer overflow (size: {size}, free: {free})")]
    BufferOverflow { size: usize, free: usize },
}

/// Beacon (hello message) codec errors
#[derive(Debug, Error)]
pub enum HelloError {
    #[error("Failed to encode hello: {0}")]
    Encode(String),

    #[error("Failed to decode hello: {0}")]
    Decode(String),
}
