//! Held positions as reported by the execution collaborator.

use rustc_hash::FxHashMap;

use crate::types::Symbol;

/// Current holdings: symbol → signed quantity (positive = long, negative = short).
///
/// Read-only input to a rebalance cycle. Entries with zero quantity are kept
/// out of the map so "held" always means "nonzero".
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Holdings {
    positions: FxHashMap<Symbol, i64>,
}

/// Number of long and short positions, as recorded at the end of each day.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PositionTally {
    pub longs: usize,
    pub shorts: usize,
}

impl Holdings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from (symbol, quantity) pairs. Later pairs for the same symbol
    /// are added to earlier ones.
    pub fn from_pairs(pairs: impl IntoIterator<Item = (Symbol, i64)>) -> Self {
        let mut h = Self::new();
        for (sym, qty) in pairs {
            h.add(sym, qty);
        }
        h
    }

    /// Add `qty` to the position in `symbol`, dropping it if it nets to zero.
    ///
    /// Saturates at the `i64` bounds.
    pub fn add(&mut self, symbol: Symbol, qty: i64) {
        if qty == 0 {
            return;
        }
        let entry = self.positions.entry(symbol).or_insert(0);
        *entry = entry.saturating_add(qty);
        if *entry == 0 {
            self.positions.remove(&symbol);
        }
    }

    /// Signed quantity held in `symbol` (0 if flat).
    #[inline]
    pub fn quantity(&self, symbol: &Symbol) -> i64 {
        self.positions.get(symbol).copied().unwrap_or(0)
    }

    #[inline]
    pub fn is_held(&self, symbol: &Symbol) -> bool {
        self.positions.contains_key(symbol)
    }

    /// Held symbols in symbol order.
    pub fn held(&self) -> Vec<Symbol> {
        let mut syms: Vec<Symbol> = self.positions.keys().copied().collect();
        syms.sort_unstable();
        syms
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Count long and short positions.
    pub fn tally(&self) -> PositionTally {
        self.positions
            .values()
            .fold(PositionTally::default(), |mut t, &qty| {
                if qty > 0 {
                    t.longs += 1;
                } else {
                    t.shorts += 1;
                }
                t
            })
    }

    /// Gross exposure over equity: `Σ |qty × price| / equity`.
    ///
    /// `prices` are in cents, as is `equity_cents`. Symbols without a price
    /// contribute nothing. Returns 0 when equity is not positive. Exposure is
    /// summed in `f64`, so huge books lose precision rather than overflow.
    pub fn gross_leverage(&self, prices: &[(Symbol, i64)], equity_cents: i64) -> f64 {
        if equity_cents <= 0 {
            return 0.0;
        }
        let price_map: FxHashMap<Symbol, i64> = prices.iter().copied().collect();
        let gross: f64 = self
            .positions
            .iter()
            .map(|(sym, &qty)| {
                let price = price_map.get(sym).copied().unwrap_or(0);
                (qty as f64 * price as f64).abs()
            })
            .sum();
        gross / equity_cents as f64
    }
}

impl FromIterator<(Symbol, i64)> for Holdings {
    fn from_iter<I: IntoIterator<Item = (Symbol, i64)>>(iter: I) -> Self {
        Self::from_pairs(iter)
    }
}
