//! Trend-following regime switch between an equity ETF, its leveraged twin,
//! and a bond ETF.
//!
//! Two signals: price above the moving average of a reference series, and
//! positive momentum over a long window. Both → aggressive (mostly leveraged),
//! one → moderate (mostly unleveraged), none → all bonds.
//!
//! The reference series is usually the equity ETF's own price history; the
//! volatility-index variant feeds a different series for the average.

use std::fmt;

use crate::error::{Error, Result};
use crate::market::MarketView;
use crate::rebalance::TargetIntent;
use crate::types::Symbol;

/// Allocation regime picked for a cycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Regime {
    /// Both signals positive: 25% core, 75% leveraged (1.75x gross).
    Aggressive,
    /// One signal positive: 75% core, 25% leveraged (1.25x gross).
    Moderate,
    /// Neither: exit equities, 100% bonds.
    Defensive,
}

impl fmt::Display for Regime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Regime::Aggressive => f.pad("aggressive"),
            Regime::Moderate => f.pad("moderate"),
            Regime::Defensive => f.pad("defensive"),
        }
    }
}

/// Signal values computed for a cycle.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TrendSignal {
    pub price: f64,
    pub moving_average: f64,
    pub momentum: f64,
}

impl TrendSignal {
    pub fn above_average(&self) -> bool {
        self.price > self.moving_average
    }

    pub fn positive_momentum(&self) -> bool {
        self.momentum > 0.0
    }

    /// Regime before tradability is considered.
    pub fn regime(&self) -> Regime {
        match (self.above_average(), self.positive_momentum()) {
            (true, true) => Regime::Aggressive,
            (true, false) | (false, true) => Regime::Moderate,
            (false, false) => Regime::Defensive,
        }
    }
}

/// The allocation for a cycle: regime and the intents that realise it.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TrendAllocation {
    pub signal: TrendSignal,
    pub regime: Regime,
    pub intents: Vec<TargetIntent>,
}

/// Regime-switching allocator over three instruments.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TrendAllocator {
    /// Unleveraged equity ETF (e.g. SPY).
    pub core: Symbol,
    /// Leveraged equity ETF (e.g. SSO).
    pub leveraged: Symbol,
    /// Bond ETF for the defensive regime (e.g. AGG).
    pub bond: Symbol,
    /// Bars in the moving-average window, including the current bar.
    pub ma_window: usize,
    /// Bars in the momentum window.
    pub momentum_window: usize,
}

impl TrendAllocator {
    pub const DEFAULT_MA_WINDOW: usize = 200;
    pub const DEFAULT_MOMENTUM_WINDOW: usize = 365;

    pub fn new(core: Symbol, leveraged: Symbol, bond: Symbol) -> Self {
        Self {
            core,
            leveraged,
            bond,
            ma_window: Self::DEFAULT_MA_WINDOW,
            momentum_window: Self::DEFAULT_MOMENTUM_WINDOW,
        }
    }

    /// Compute both signals.
    ///
    /// `reference` feeds the moving average: the mean of its last `ma_window`
    /// bars with the most recent bar dropped. `momentum_series` feeds the
    /// momentum `(last - first) / first` over its last `momentum_window` bars.
    pub fn signal(
        &self,
        reference: &[f64],
        momentum_series: &[f64],
        price: f64,
    ) -> Result<TrendSignal> {
        let ma_window = self.ma_window.max(2);
        if reference.len() < ma_window {
            return Err(Error::InsufficientHistory {
                needed: ma_window,
                got: reference.len(),
            });
        }
        let mom_window = self.momentum_window.max(2);
        if momentum_series.len() < mom_window {
            return Err(Error::InsufficientHistory {
                needed: mom_window,
                got: momentum_series.len(),
            });
        }

        let window = &reference[reference.len() - ma_window..reference.len() - 1];
        let moving_average = window.iter().sum::<f64>() / window.len() as f64;

        let bars = &momentum_series[momentum_series.len() - mom_window..];
        let (first, last) = (bars[0], bars[bars.len() - 1]);
        let momentum = if first > 0.0 { (last - first) / first } else { 0.0 };

        Ok(TrendSignal {
            price,
            moving_average,
            momentum,
        })
    }

    /// Target weights for a regime.
    pub fn weights(&self, regime: Regime) -> [TargetIntent; 3] {
        let (core, leveraged, bond) = match regime {
            Regime::Aggressive => (0.25, 0.75, 0.0),
            Regime::Moderate => (0.75, 0.25, 0.0),
            Regime::Defensive => (0.0, 0.0, 1.0),
        };
        [
            TargetIntent::new(self.core, core),
            TargetIntent::new(self.leveraged, leveraged),
            TargetIntent::new(self.bond, bond),
        ]
    }

    /// Pick the regime and build intents.
    ///
    /// A price above its moving average is enough for the moderate regime on
    /// its own. The aggressive regime, and the moderate regime reached through
    /// momentum alone, also need both equity legs tradable; otherwise the
    /// cycle drops a level. Intents for untradable instruments are left out,
    /// as are zero-weight intents for the bond leg outside the defensive
    /// regime (bonds are only bought, never sold, by this switch).
    pub fn allocate<M: MarketView + ?Sized>(
        &self,
        reference: &[f64],
        momentum_series: &[f64],
        price: f64,
        market: &M,
    ) -> Result<TrendAllocation> {
        let signal = self.signal(reference, momentum_series, price)?;
        let equities_tradable = market.can_trade(&self.core) && market.can_trade(&self.leveraged);

        let regime = match (
            signal.above_average(),
            signal.positive_momentum(),
            equities_tradable,
        ) {
            (true, true, true) => Regime::Aggressive,
            (true, _, _) | (false, true, true) => Regime::Moderate,
            _ => Regime::Defensive,
        };

        let intents = self
            .weights(regime)
            .into_iter()
            .filter(|i| !(i.symbol == self.bond && regime != Regime::Defensive))
            .filter(|i| market.can_trade(&i.symbol))
            .collect();

        log::info!(
            "trend regime {regime}: price {:.2} vs MA {:.2}, momentum {:+.2}%",
            signal.price,
            signal.moving_average,
            signal.momentum * 100.0
        );

        Ok(TrendAllocation {
            signal,
            regime,
            intents,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market::StaticMarket;

    fn allocator() -> TrendAllocator {
        TrendAllocator {
            ma_window: 5,
            momentum_window: 10,
            ..TrendAllocator::new(Symbol::new("SPY"), Symbol::new("SSO"), Symbol::new("AGG"))
        }
    }

    fn rising(n: usize) -> Vec<f64> {
        (0..n).map(|i| 100.0 + i as f64).collect()
    }

    fn falling(n: usize) -> Vec<f64> {
        (0..n).map(|i| 200.0 - i as f64).collect()
    }

    #[test]
    fn moving_average_drops_latest_bar() {
        let series = [1.0, 2.0, 3.0, 4.0, 5.0, 1000.0];
        let a = TrendAllocator {
            ma_window: 3,
            momentum_window: 2,
            ..allocator()
        };
        let sig = a.signal(&series, &series, 10.0).unwrap();
        // Last 3 bars are [4, 5, 1000]; dropping the latest leaves [4, 5]
        assert_eq!(sig.moving_average, 4.5);
        assert!((sig.momentum - 199.0).abs() < 1e-12);
    }

    #[test]
    fn rising_market_is_aggressive() {
        let prices = rising(20);
        let alloc = allocator()
            .allocate(&prices, &prices, 119.0, &StaticMarket::open())
            .unwrap();
        assert_eq!(alloc.regime, Regime::Aggressive);
        assert_eq!(
            alloc.intents,
            vec![
                TargetIntent::new(Symbol::new("SPY"), 0.25),
                TargetIntent::new(Symbol::new("SSO"), 0.75),
            ]
        );
    }

    #[test]
    fn falling_market_is_defensive() {
        let prices = falling(20);
        let alloc = allocator()
            .allocate(&prices, &prices, 181.0, &StaticMarket::open())
            .unwrap();
        assert_eq!(alloc.regime, Regime::Defensive);
        let bond = alloc.intents.iter().find(|i| i.symbol == Symbol::new("AGG")).unwrap();
        assert_eq!(bond.weight, 1.0);
        let equity_legs = alloc.intents.iter().filter(|i| i.symbol != Symbol::new("AGG"));
        assert!(equity_legs.clone().all(|i| i.is_flatten()));
        assert_eq!(equity_legs.count(), 2);
    }

    #[test]
    fn one_signal_is_moderate() {
        // Price above a falling average, but momentum negative
        let prices = falling(20);
        let alloc = allocator()
            .allocate(&prices, &prices, 500.0, &StaticMarket::open())
            .unwrap();
        assert_eq!(alloc.signal.regime(), Regime::Moderate);
        assert_eq!(alloc.regime, Regime::Moderate);
        assert_eq!(alloc.intents[0].weight, 0.75);
        assert_eq!(alloc.intents[1].weight, 0.25);
    }

    #[test]
    fn halted_leg_above_average_stays_moderate() {
        let prices = rising(20);
        let market = StaticMarket::builder().halted(Symbol::new("SSO")).build();
        let alloc = allocator().allocate(&prices, &prices, 119.0, &market).unwrap();
        assert_eq!(alloc.signal.regime(), Regime::Aggressive);
        assert_eq!(alloc.regime, Regime::Moderate);
        // SSO is halted, so no intent is sent for it
        assert_eq!(alloc.intents, vec![TargetIntent::new(Symbol::new("SPY"), 0.75)]);
    }

    #[test]
    fn halted_leg_on_momentum_alone_is_defensive() {
        let reference = vec![1000.0; 10];
        let equity = rising(20);
        let market = StaticMarket::builder().halted(Symbol::new("SSO")).build();
        let alloc = allocator().allocate(&reference, &equity, 119.0, &market).unwrap();
        assert_eq!(alloc.signal.regime(), Regime::Moderate);
        assert_eq!(alloc.regime, Regime::Defensive);
        assert_eq!(
            alloc.intents,
            vec![
                TargetIntent::new(Symbol::new("SPY"), 0.0),
                TargetIntent::new(Symbol::new("AGG"), 1.0),
            ]
        );
    }

    #[test]
    fn halted_leg_below_average_without_momentum_is_defensive() {
        let prices = falling(20);
        let market = StaticMarket::builder().halted(Symbol::new("SPY")).build();
        let alloc = allocator().allocate(&prices, &prices, 181.0, &market).unwrap();
        assert_eq!(alloc.regime, Regime::Defensive);
        assert!(alloc.intents.iter().all(|i| i.symbol != Symbol::new("SPY")));
    }

    #[test]
    fn separate_reference_series() {
        // Reference average is high, equity momentum positive → moderate
        let reference = vec![1000.0; 10];
        let equity = rising(20);
        let alloc = allocator()
            .allocate(&reference, &equity, 119.0, &StaticMarket::open())
            .unwrap();
        assert!(!alloc.signal.above_average());
        assert!(alloc.signal.positive_momentum());
        assert_eq!(alloc.regime, Regime::Moderate);
    }

    #[test]
    fn short_history_is_an_error() {
        let err = allocator().signal(&[1.0, 2.0], &rising(20), 1.0).unwrap_err();
        assert_eq!(err, Error::InsufficientHistory { needed: 5, got: 2 });
        let err = allocator().signal(&rising(20), &[1.0], 1.0).unwrap_err();
        assert_eq!(err, Error::InsufficientHistory { needed: 10, got: 1 });
    }

    #[test]
    fn non_positive_first_bar_has_zero_momentum() {
        let mut series = rising(20);
        series[10] = 0.0;
        let sig = allocator().signal(&series, &series, 1.0).unwrap();
        assert_eq!(sig.momentum, 0.0);
    }
}
