//! Collaborator seams: what the rebalancer asks of the market and where it
//! sends its intents.
//!
//! The backtest or brokerage engine behind these traits is external. The
//! in-memory implementations here ([`StaticMarket`], [`RecordingSink`]) are
//! enough to drive the core from a snapshot file or from tests.
//!
//! ```
//! use weightbook::{MarketView, StaticMarket, Symbol};
//!
//! let market = StaticMarket::builder()
//!     .halted(Symbol::new("XYZ"))
//!     .open_order(Symbol::new("AAPL"))
//!     .build();
//! assert!(!market.can_trade(&Symbol::new("XYZ")));
//! assert!(market.has_open_order(&Symbol::new("AAPL")));
//! ```

use rustc_hash::FxHashSet;

use crate::error::{Error, Result};
use crate::rebalance::TargetIntent;
use crate::types::Symbol;

/// Read-only market queries made during a cycle.
pub trait MarketView {
    /// Can `symbol` be traded right now (not halted, not delisted)?
    fn can_trade(&self, symbol: &Symbol) -> bool;

    /// Does `symbol` have an unresolved open order?
    fn has_open_order(&self, symbol: &Symbol) -> bool;
}

/// Consumer of target-weight intents (the order-routing collaborator).
pub trait OrderSink {
    /// Move `intent.symbol` to `intent.weight` of portfolio value.
    fn order_target_percent(&mut self, intent: &TargetIntent) -> Result<()>;
}

impl<T: MarketView + ?Sized> MarketView for &T {
    fn can_trade(&self, symbol: &Symbol) -> bool {
        (**self).can_trade(symbol)
    }

    fn has_open_order(&self, symbol: &Symbol) -> bool {
        (**self).has_open_order(symbol)
    }
}

/// A market where everything is tradable except an explicit halted list.
#[derive(Clone, Debug, Default)]
pub struct StaticMarket {
    halted: FxHashSet<Symbol>,
    open_orders: FxHashSet<Symbol>,
}

/// Builder for [`StaticMarket`].
#[derive(Default)]
pub struct StaticMarketBuilder {
    halted: FxHashSet<Symbol>,
    open_orders: FxHashSet<Symbol>,
}

impl StaticMarketBuilder {
    pub fn halted(mut self, symbol: Symbol) -> Self {
        self.halted.insert(symbol);
        self
    }

    pub fn halted_all(mut self, symbols: impl IntoIterator<Item = Symbol>) -> Self {
        self.halted.extend(symbols);
        self
    }

    pub fn open_order(mut self, symbol: Symbol) -> Self {
        self.open_orders.insert(symbol);
        self
    }

    pub fn open_orders(mut self, symbols: impl IntoIterator<Item = Symbol>) -> Self {
        self.open_orders.extend(symbols);
        self
    }

    pub fn build(self) -> StaticMarket {
        StaticMarket {
            halted: self.halted,
            open_orders: self.open_orders,
        }
    }
}

impl StaticMarket {
    pub fn builder() -> StaticMarketBuilder {
        StaticMarketBuilder::default()
    }

    /// Everything tradable, no open orders.
    pub fn open() -> Self {
        Self::default()
    }
}

impl MarketView for StaticMarket {
    fn can_trade(&self, symbol: &Symbol) -> bool {
        !self.halted.contains(symbol)
    }

    fn has_open_order(&self, symbol: &Symbol) -> bool {
        self.open_orders.contains(symbol)
    }
}

/// An [`OrderSink`] that records every intent, for tests and dry runs.
///
/// Can be told to refuse after a number of intents to exercise error paths.
#[derive(Clone, Debug, Default)]
pub struct RecordingSink {
    intents: Vec<TargetIntent>,
    accept_limit: Option<usize>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Refuse every intent after the first `n`.
    pub fn refusing_after(n: usize) -> Self {
        Self {
            intents: Vec::new(),
            accept_limit: Some(n),
        }
    }

    /// Intents accepted so far, in submission order.
    pub fn intents(&self) -> &[TargetIntent] {
        &self.intents
    }

    /// Weight sent for `symbol`, if any.
    pub fn weight_of(&self, symbol: &Symbol) -> Option<f64> {
        self.intents
            .iter()
            .find(|i| i.symbol == *symbol)
            .map(|i| i.weight)
    }
}

impl OrderSink for RecordingSink {
    fn order_target_percent(&mut self, intent: &TargetIntent) -> Result<()> {
        if let Some(limit) = self.accept_limit {
            if self.intents.len() >= limit {
                return Err(Error::Sink(format!("refused {}", intent.symbol)));
            }
        }
        self.intents.push(*intent);
        Ok(())
    }
}
