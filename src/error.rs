//! Errors for rebalancing, screening, and allocation.

use crate::types::{Bucket, Symbol};

/// All errors the core library can return.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Error {
    /// A bucket is empty while its leverage is nonzero, under
    /// [`EmptyBucketPolicy::Reject`](crate::EmptyBucketPolicy::Reject).
    #[error("{bucket} bucket is empty but leverage is {leverage}")]
    DegenerateBucket { bucket: Bucket, leverage: f64 },

    /// The same instrument was requested both long and short.
    #[error("{0} appears in both the long and the short bucket")]
    OverlappingBuckets(Symbol),

    #[error("invalid leverage: {0}")]
    InvalidLeverage(String),

    #[error("invalid symbol {0:?}: expected 1-8 printable ASCII bytes")]
    InvalidSymbol(String),

    #[error("invalid percentile band: {0}")]
    InvalidBand(String),

    #[error("insufficient price history: need {needed} bars, got {got}")]
    InsufficientHistory { needed: usize, got: usize },

    /// The execution collaborator refused an intent.
    #[error("order sink error: {0}")]
    Sink(String),
}

pub type Result<T> = std::result::Result<T, Error>;
