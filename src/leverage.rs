//! Leverage parameters and the empty-bucket policy.

use crate::error::{Error, Result};
use crate::types::Bucket;

/// What to do when a bucket ends up empty for a cycle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum EmptyBucketPolicy {
    /// The empty side gets weight 0 and emits nothing; the other side trades.
    #[default]
    #[cfg_attr(feature = "serde", serde(alias = "zero_weight"))]
    Zero,
    /// An empty side with nonzero leverage fails the whole cycle.
    Reject,
}

/// Gross leverage applied to each bucket.
///
/// `long` is non-negative, `short` is non-positive. Fixed for the life of a
/// strategy.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct LeverageConfig {
    long: f64,
    short: f64,
}

impl LeverageConfig {
    /// Validate and build a leverage pair.
    pub fn new(long: f64, short: f64) -> Result<Self> {
        if !long.is_finite() || !short.is_finite() {
            return Err(Error::InvalidLeverage(format!(
                "leverage must be finite, got long={long} short={short}"
            )));
        }
        if long < 0.0 {
            return Err(Error::InvalidLeverage(format!(
                "long leverage must be >= 0, got {long}"
            )));
        }
        if short > 0.0 {
            return Err(Error::InvalidLeverage(format!(
                "short leverage must be <= 0, got {short}"
            )));
        }
        Ok(Self { long, short })
    }

    /// Long-only book: `long` on the long side, nothing short.
    pub fn long_only(long: f64) -> Result<Self> {
        Self::new(long, 0.0)
    }

    #[inline]
    pub fn long(&self) -> f64 {
        self.long
    }

    #[inline]
    pub fn short(&self) -> f64 {
        self.short
    }

    /// Leverage for one bucket.
    #[inline]
    pub fn for_bucket(&self, bucket: Bucket) -> f64 {
        match bucket {
            Bucket::Long => self.long,
            Bucket::Short => self.short,
        }
    }

    /// Sum of absolute bucket leverages.
    pub fn gross(&self) -> f64 {
        self.long + self.short.abs()
    }
}
