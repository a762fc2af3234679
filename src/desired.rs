//! Desired long/short buckets for one rebalance cycle.

use std::collections::BTreeSet;
use std::collections::btree_set;

use crate::error::{Error, Result};
use crate::types::{Bucket, Symbol};

/// The instruments a strategy wants to hold this cycle.
///
/// `longs` and `shorts` are disjoint. Iteration is in symbol order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DesiredPositions {
    longs: BTreeSet<Symbol>,
    shorts: BTreeSet<Symbol>,
}

impl DesiredPositions {
    /// Build the buckets, rejecting any instrument listed on both sides.
    /// Duplicates within a side collapse.
    pub fn new(
        longs: impl IntoIterator<Item = Symbol>,
        shorts: impl IntoIterator<Item = Symbol>,
    ) -> Result<Self> {
        let longs: BTreeSet<Symbol> = longs.into_iter().collect();
        let shorts: BTreeSet<Symbol> = shorts.into_iter().collect();
        if let Some(sym) = longs.intersection(&shorts).next() {
            return Err(Error::OverlappingBuckets(*sym));
        }
        Ok(Self { longs, shorts })
    }

    /// No desired positions: everything held gets flattened.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn longs(&self) -> btree_set::Iter<'_, Symbol> {
        self.longs.iter()
    }

    pub fn shorts(&self) -> btree_set::Iter<'_, Symbol> {
        self.shorts.iter()
    }

    pub fn len(&self, bucket: Bucket) -> usize {
        match bucket {
            Bucket::Long => self.longs.len(),
            Bucket::Short => self.shorts.len(),
        }
    }

    /// True if neither bucket holds anything.
    pub fn is_empty(&self) -> bool {
        self.longs.is_empty() && self.shorts.is_empty()
    }

    /// Which bucket `symbol` is in, if any.
    pub fn bucket_of(&self, symbol: &Symbol) -> Option<Bucket> {
        if self.longs.contains(symbol) {
            Some(Bucket::Long)
        } else if self.shorts.contains(symbol) {
            Some(Bucket::Short)
        } else {
            None
        }
    }

    /// True if `symbol` is in either bucket.
    #[inline]
    pub fn contains(&self, symbol: &Symbol) -> bool {
        self.bucket_of(symbol).is_some()
    }

    /// Comma-separated labels for one bucket, for log lines.
    pub fn labels(&self, bucket: Bucket) -> String {
        let set = match bucket {
            Bucket::Long => &self.longs,
            Bucket::Short => &self.shorts,
        };
        set.iter().map(Symbol::as_str).collect::<Vec<_>>().join(", ")
    }
}
