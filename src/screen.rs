//! Cross-sectional mean-reversion screen.
//!
//! Picks the week's losers to buy and winners to sell from a precomputed
//! factor table, restricted to the most liquid names and, optionally, away
//! from earnings announcements. Factor values (dollar volume, trailing
//! return, business days to/from earnings) come from an external data
//! pipeline.

use crate::desired::DesiredPositions;
use crate::error::{Error, Result};
use crate::types::Symbol;

/// One instrument's factor values for the current cycle.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FactorRow {
    pub symbol: Symbol,
    /// Average daily dollar volume.
    pub dollar_volume: f64,
    /// Trailing return over the lookback window (0.05 = +5%).
    pub recent_return: f64,
    /// Business days until the next earnings announcement, if scheduled.
    #[cfg_attr(feature = "serde", serde(default))]
    pub days_until_earnings: Option<u32>,
    /// Business days since the previous earnings announcement, if known.
    #[cfg_attr(feature = "serde", serde(default))]
    pub days_since_earnings: Option<u32>,
}

/// Inclusive percentile band, in [0, 100].
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PercentileBand {
    pub min: f64,
    pub max: f64,
}

impl PercentileBand {
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    fn is_valid(&self) -> bool {
        let range = 0.0..=100.0;
        range.contains(&self.min) && range.contains(&self.max) && self.min <= self.max
    }
}

/// Screen configuration.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ReversionScreen {
    /// Dollar-volume band that defines the tradable universe.
    pub liquidity: PercentileBand,
    /// Return band to buy (the losers).
    pub long_band: PercentileBand,
    /// Return band to sell short (the winners).
    pub short_band: PercentileBand,
    /// Drop candidates within this many business days of earnings.
    ///
    /// Off by default. When set, the blackout removes names from the
    /// buckets outright; it never adds names to the universe.
    pub earnings_blackout_days: Option<u32>,
}

impl Default for ReversionScreen {
    fn default() -> Self {
        Self {
            liquidity: PercentileBand::new(95.0, 100.0),
            long_band: PercentileBand::new(0.0, 10.0),
            short_band: PercentileBand::new(90.0, 100.0),
            earnings_blackout_days: None,
        }
    }
}

impl ReversionScreen {
    /// Check band bounds. Returns a description of the first bad band.
    pub fn validate(&self) -> std::result::Result<(), String> {
        for (name, band) in [
            ("liquidity", self.liquidity),
            ("long_band", self.long_band),
            ("short_band", self.short_band),
        ] {
            if !band.is_valid() {
                return Err(format!(
                    "{name} must satisfy 0 <= min <= max <= 100, got [{}, {}]",
                    band.min, band.max
                ));
            }
        }
        Ok(())
    }

    /// Partition `rows` into desired longs and shorts.
    ///
    /// Fails with [`Error::InvalidBand`] if any band is out of range.
    pub fn select(&self, rows: &[FactorRow]) -> Result<DesiredPositions> {
        self.validate().map_err(Error::InvalidBand)?;
        let volumes: Vec<f64> = rows
            .iter()
            .map(|r| r.dollar_volume)
            .filter(|v| v.is_finite())
            .collect();
        let Some((vol_lo, vol_hi)) = band_bounds(&volumes, self.liquidity) else {
            return Ok(DesiredPositions::empty());
        };

        let liquid: Vec<&FactorRow> = rows
            .iter()
            .filter(|r| r.dollar_volume.is_finite() && r.recent_return.is_finite())
            .filter(|r| (vol_lo..=vol_hi).contains(&r.dollar_volume))
            .collect();

        let returns: Vec<f64> = liquid.iter().map(|r| r.recent_return).collect();
        let (Some(long_bounds), Some(short_bounds)) = (
            band_bounds(&returns, self.long_band),
            band_bounds(&returns, self.short_band),
        ) else {
            return Ok(DesiredPositions::empty());
        };

        let in_band = |r: &FactorRow, (lo, hi): (f64, f64)| (lo..=hi).contains(&r.recent_return);

        let mut longs = Vec::new();
        let mut shorts = Vec::new();
        for row in liquid {
            if !self.clear_of_earnings(row) {
                continue;
            }
            match (in_band(row, long_bounds), in_band(row, short_bounds)) {
                (true, false) => longs.push(row.symbol),
                (false, true) => shorts.push(row.symbol),
                // Neither, or both in a universe too small to separate
                _ => {}
            }
        }

        DesiredPositions::new(longs, shorts)
    }

    fn clear_of_earnings(&self, row: &FactorRow) -> bool {
        let Some(days) = self.earnings_blackout_days else {
            return true;
        };
        let next_ok = row.days_until_earnings.is_none_or(|d| d > days);
        let prev_ok = row.days_since_earnings.is_some_and(|d| d > days);
        next_ok && prev_ok
    }
}

/// Values at the two ends of `band` over `values`, or `None` if empty.
fn band_bounds(values: &[f64], band: PercentileBand) -> Option<(f64, f64)> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    Some((percentile(&sorted, band.min), percentile(&sorted, band.max)))
}

/// Linear-interpolated percentile of sorted, non-empty data. `p` in [0, 100].
pub fn percentile(sorted: &[f64], p: f64) -> f64 {
    debug_assert!(!sorted.is_empty());
    let rank = (p / 100.0) * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    let frac = rank - lo as f64;
    sorted[lo] + (sorted[hi] - sorted[lo]) * frac
}
