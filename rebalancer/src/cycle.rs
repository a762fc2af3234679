//! Cycle snapshot (cycle.json) loading and validation.
//!
//! A snapshot is everything one rebalance cycle needs from the outside world:
//! held positions, which names cannot trade or have orders working, and the
//! strategy's choice of longs and shorts (given directly or as a factor table
//! to screen).

use std::path::Path;

use chrono::{DateTime, NaiveDate, Utc};
use rustc_hash::FxHashSet;
use serde::Deserialize;
use weightbook::{DesiredPositions, FactorRow, Holdings, ReversionScreen, StaticMarket, Symbol};

use crate::error::{Error, Result};

/// One cycle's inputs.
#[derive(Debug, Clone, Deserialize)]
pub struct CycleSnapshot {
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub holdings: Vec<HeldPosition>,
    #[serde(default)]
    pub untradable: Vec<String>,
    #[serde(default)]
    pub open_orders: Vec<String>,
    #[serde(default)]
    pub desired: Option<DesiredBuckets>,
    #[serde(default)]
    pub factors: Option<Vec<FactorRow>>,
    #[serde(default)]
    pub trend: Option<TrendHistory>,
    /// Last prices in dollars, for the leverage readout.
    #[serde(default)]
    pub prices: Vec<PriceQuote>,
    /// Account equity in dollars.
    #[serde(default)]
    pub equity: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PriceQuote {
    pub symbol: String,
    pub price: f64,
}

/// A held position: symbol + signed share count.
#[derive(Debug, Clone, Deserialize)]
pub struct HeldPosition {
    pub symbol: String,
    pub quantity: i64,
}

/// Longs and shorts chosen upstream.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DesiredBuckets {
    #[serde(default)]
    pub longs: Vec<String>,
    #[serde(default)]
    pub shorts: Vec<String>,
}

/// Price history for the trend allocator.
#[derive(Debug, Clone, Deserialize)]
pub struct TrendHistory {
    /// Series the moving average is computed on.
    pub reference: Vec<f64>,
    /// Series the momentum is computed on.
    pub momentum: Vec<f64>,
    /// Current price of the core instrument.
    pub price: f64,
}

impl CycleSnapshot {
    /// Load and validate a cycle.json file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| Error::CycleRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::from_json(&contents)
    }

    /// Parse from a JSON string (useful for testing).
    pub fn from_json(json: &str) -> Result<Self> {
        let snapshot: CycleSnapshot = serde_json::from_str(json)?;
        snapshot.validate()?;
        Ok(snapshot)
    }

    /// Validate the snapshot.
    fn validate(&self) -> Result<()> {
        match (&self.desired, &self.factors) {
            (Some(_), Some(_)) => {
                return Err(Error::Cycle(
                    "give either desired or factors, not both".into(),
                ));
            }
            (None, None) if self.trend.is_none() => {
                return Err(Error::Cycle(
                    "one of desired, factors or trend is required".into(),
                ));
            }
            _ => {}
        }

        let mut seen = FxHashSet::default();
        for p in &self.holdings {
            let sym = parse_symbol(&p.symbol)?;
            if !seen.insert(sym) {
                return Err(Error::Cycle(format!("duplicate holding: {}", p.symbol)));
            }
        }
        for s in self.untradable.iter().chain(&self.open_orders) {
            parse_symbol(s)?;
        }

        if let Some(desired) = &self.desired {
            desired_positions(desired)?;
        }

        for q in &self.prices {
            parse_symbol(&q.symbol)?;
            if !q.price.is_finite() || q.price < 0.0 {
                return Err(Error::Cycle(format!(
                    "price for {} must be non-negative, got {}",
                    q.symbol, q.price
                )));
            }
        }
        if let Some(equity) = self.equity {
            if !equity.is_finite() {
                return Err(Error::Cycle(format!("equity must be finite, got {equity}")));
            }
        }

        if let Some(trend) = &self.trend {
            if !trend.price.is_finite() || trend.price <= 0.0 {
                return Err(Error::Cycle(format!(
                    "trend price must be positive, got {}",
                    trend.price
                )));
            }
        }

        Ok(())
    }

    /// Trading date of the snapshot.
    pub fn date(&self) -> NaiveDate {
        self.timestamp.date_naive()
    }

    pub fn holdings(&self) -> Result<Holdings> {
        self.holdings
            .iter()
            .map(|p| Ok((parse_symbol(&p.symbol)?, p.quantity)))
            .collect::<Result<Vec<_>>>()
            .map(Holdings::from_pairs)
    }

    /// Market state as of the snapshot.
    pub fn market(&self) -> Result<StaticMarket> {
        Ok(StaticMarket::builder()
            .halted_all(parse_symbols(&self.untradable)?)
            .open_orders(parse_symbols(&self.open_orders)?)
            .build())
    }

    /// This cycle's longs and shorts, screening the factor table if given.
    pub fn desired(&self, screen: &ReversionScreen) -> Result<DesiredPositions> {
        match (&self.desired, &self.factors) {
            (Some(desired), _) => desired_positions(desired),
            (None, Some(rows)) => Ok(screen.select(rows)?),
            (None, None) => Err(Error::Cycle(
                "cycle has neither desired positions nor factors".into(),
            )),
        }
    }

    /// Gross leverage of the holdings, or `None` without an equity figure.
    pub fn gross_leverage(&self) -> Result<Option<f64>> {
        let Some(equity) = self.equity else {
            return Ok(None);
        };
        let prices = self
            .prices
            .iter()
            .map(|q| Ok((parse_symbol(&q.symbol)?, to_cents(q.price))))
            .collect::<Result<Vec<_>>>()?;
        Ok(Some(self.holdings()?.gross_leverage(&prices, to_cents(equity))))
    }

    pub fn trend_history(&self) -> Result<&TrendHistory> {
        self.trend
            .as_ref()
            .ok_or_else(|| Error::Cycle("cycle has no trend history".into()))
    }
}

fn desired_positions(desired: &DesiredBuckets) -> Result<DesiredPositions> {
    Ok(DesiredPositions::new(
        parse_symbols(&desired.longs)?,
        parse_symbols(&desired.shorts)?,
    )?)
}

fn to_cents(dollars: f64) -> i64 {
    (dollars * 100.0).round() as i64
}

fn parse_symbol(s: &str) -> Result<Symbol> {
    Symbol::try_new(s).map_err(|e| Error::Cycle(e.to_string()))
}

fn parse_symbols(names: &[String]) -> Result<Vec<Symbol>> {
    names.iter().map(|s| parse_symbol(s)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use weightbook::{Bucket, MarketView};

    fn valid_json() -> &'static str {
        r#"{
            "timestamp": "2026-03-09T15:30:00Z",
            "holdings": [
                { "symbol": "AAPL", "quantity": 100 },
                { "symbol": "TSLA", "quantity": -40 }
            ],
            "untradable": ["GME"],
            "open_orders": ["MSFT"],
            "desired": { "longs": ["AAPL", "MSFT"], "shorts": ["SPY"] }
        }"#
    }

    fn factor_json() -> String {
        let rows: Vec<String> = (0..11)
            .map(|i| {
                format!(
                    r#"{{"symbol":"L{i:02}","dollar_volume":1e9,"recent_return":{i},"days_since_earnings":10}}"#
                )
            })
            .collect();
        format!(
            r#"{{"timestamp":"2026-03-09T15:30:00Z","factors":[{}]}}"#,
            rows.join(",")
        )
    }

    #[test]
    fn parse_valid_cycle() {
        let c = CycleSnapshot::from_json(valid_json()).unwrap();
        assert_eq!(c.holdings.len(), 2);
        assert_eq!(c.date(), NaiveDate::from_ymd_opt(2026, 3, 9).unwrap());
    }

    #[test]
    fn holdings_conversion() {
        let c = CycleSnapshot::from_json(valid_json()).unwrap();
        let h = c.holdings().unwrap();
        assert_eq!(h.quantity(&Symbol::new("TSLA")), -40);
        assert_eq!(h.len(), 2);
    }

    #[test]
    fn market_conversion() {
        let c = CycleSnapshot::from_json(valid_json()).unwrap();
        let m = c.market().unwrap();
        assert!(!m.can_trade(&Symbol::new("GME")));
        assert!(m.has_open_order(&Symbol::new("MSFT")));
        assert!(m.can_trade(&Symbol::new("AAPL")));
    }

    #[test]
    fn desired_given_directly() {
        let c = CycleSnapshot::from_json(valid_json()).unwrap();
        let d = c.desired(&ReversionScreen::default()).unwrap();
        assert_eq!(d.len(Bucket::Long), 2);
        assert_eq!(d.bucket_of(&Symbol::new("SPY")), Some(Bucket::Short));
    }

    #[test]
    fn desired_from_factors() {
        let c = CycleSnapshot::from_json(&factor_json()).unwrap();
        let d = c.desired(&ReversionScreen::default()).unwrap();
        assert_eq!(d.labels(Bucket::Long), "L00, L01");
        assert_eq!(d.labels(Bucket::Short), "L09, L10");
    }

    #[test]
    fn reject_both_desired_and_factors() {
        let json = r#"{
            "timestamp": "2026-01-01T00:00:00Z",
            "desired": { "longs": ["AAPL"] },
            "factors": []
        }"#;
        assert!(matches!(CycleSnapshot::from_json(json), Err(Error::Cycle(_))));
    }

    #[test]
    fn reject_empty_cycle() {
        let json = r#"{"timestamp":"2026-01-01T00:00:00Z"}"#;
        assert!(CycleSnapshot::from_json(json).is_err());
    }

    #[test]
    fn reject_duplicate_holding() {
        let json = r#"{
            "timestamp": "2026-01-01T00:00:00Z",
            "holdings": [
                { "symbol": "AAPL", "quantity": 5 },
                { "symbol": "AAPL", "quantity": 3 }
            ],
            "desired": {}
        }"#;
        assert!(CycleSnapshot::from_json(json).is_err());
    }

    #[test]
    fn reject_long_symbol() {
        let json = r#"{
            "timestamp": "2026-01-01T00:00:00Z",
            "desired": { "longs": ["TOOLONGNAME"] }
        }"#;
        assert!(matches!(CycleSnapshot::from_json(json), Err(Error::Cycle(_))));
    }

    #[test]
    fn reject_overlapping_buckets() {
        let json = r#"{
            "timestamp": "2026-01-01T00:00:00Z",
            "desired": { "longs": ["AAPL"], "shorts": ["AAPL"] }
        }"#;
        assert!(matches!(
            CycleSnapshot::from_json(json),
            Err(Error::Core(weightbook::Error::OverlappingBuckets(_)))
        ));
    }

    #[test]
    fn trend_only_cycle() {
        let json = r#"{
            "timestamp": "2026-01-01T00:00:00Z",
            "trend": { "reference": [1.0, 2.0], "momentum": [1.0, 2.0], "price": 2.5 }
        }"#;
        let c = CycleSnapshot::from_json(json).unwrap();
        assert_eq!(c.trend_history().unwrap().price, 2.5);
        assert!(c.desired(&ReversionScreen::default()).is_err());
    }

    #[test]
    fn reject_nonpositive_trend_price() {
        let json = r#"{
            "timestamp": "2026-01-01T00:00:00Z",
            "trend": { "reference": [], "momentum": [], "price": 0.0 }
        }"#;
        assert!(CycleSnapshot::from_json(json).is_err());
    }

    #[test]
    fn gross_leverage_from_prices_and_equity() {
        let json = r#"{
            "timestamp": "2026-01-01T00:00:00Z",
            "holdings": [
                { "symbol": "AAPL", "quantity": 100 },
                { "symbol": "SPY", "quantity": -10 }
            ],
            "prices": [
                { "symbol": "AAPL", "price": 150.0 },
                { "symbol": "SPY", "price": 430.0 }
            ],
            "equity": 10000.0,
            "desired": {}
        }"#;
        let c = CycleSnapshot::from_json(json).unwrap();
        let lev = c.gross_leverage().unwrap().unwrap();
        assert!((lev - 1.93).abs() < 1e-9);
    }

    #[test]
    fn gross_leverage_needs_equity() {
        let c = CycleSnapshot::from_json(valid_json()).unwrap();
        assert_eq!(c.gross_leverage().unwrap(), None);
    }

    #[test]
    fn reject_negative_price() {
        let json = r#"{
            "timestamp": "2026-01-01T00:00:00Z",
            "prices": [{ "symbol": "AAPL", "price": -1.0 }],
            "desired": {}
        }"#;
        assert!(matches!(CycleSnapshot::from_json(json), Err(Error::Cycle(_))));
    }
}
