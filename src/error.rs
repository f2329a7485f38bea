//! Error type shared by table and entry operations.

use thiserror::Error;

/// Failures surfaced by table and entry operations.
///
/// A missing key is never an error; lookups answer with `None`/`false`.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TableError {
    /// A key/value copy or a bucket array could not be allocated. The
    /// table is left exactly as it was before the call.
    #[error("failed to allocate {bytes} bytes")]
    OutOfMemory { bytes: usize },
    #[error("a table needs at least one bucket")]
    ZeroCapacity,
    #[error("max load factor must be finite and non-negative, got {0}")]
    InvalidLoadFactor(f64),
}
