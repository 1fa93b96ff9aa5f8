//! Error types for trellis-cache.
//!
//! Cache reads and writes never fail from the caller's point of view: an
//! internal failure is logged and reported as a miss, `false` or `0`. The
//! only operation that can return an error is starting the background sweeper.

use std::io;
use thiserror::Error;

/// The error type for trellis-cache operations.
#[derive(Debug, Error)]
pub enum Error {
    /// The sweeper thread could not be spawned.
    #[error("failed to spawn cache sweeper: {0}")]
    Spawn(#[from] io::Error),
}

/// A specialized Result type for trellis-cache operations.
pub type Result<T> = std::result::Result<T, Error>;
