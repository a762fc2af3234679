//! The rebalancer: desired buckets → per-instrument target weights.
//!
//! One call per scheduled cycle. Weights are equal within a bucket and scaled
//! by that bucket's leverage:
//!
//! ```text
//! long_weight  = long_leverage  / max(1, |longs|)
//! short_weight = short_leverage / max(1, |shorts|)
//! ```
//!
//! Every desired instrument is either assigned its bucket weight or skipped
//! with a reason. Held instruments outside both buckets are flattened when
//! tradable. No instrument gets more than one decision per cycle.

use std::fmt;

use log::{debug, info};
use rustc_hash::FxHashSet;

use crate::desired::DesiredPositions;
use crate::error::{Error, Result};
use crate::holdings::Holdings;
use crate::leverage::{EmptyBucketPolicy, LeverageConfig};
use crate::market::{MarketView, OrderSink};
use crate::types::{Bucket, Symbol};

/// A target-weight instruction for the execution collaborator.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TargetIntent {
    pub symbol: Symbol,
    /// Signed fraction of portfolio value. 0 means flatten.
    pub weight: f64,
}

impl TargetIntent {
    pub fn new(symbol: Symbol, weight: f64) -> Self {
        Self { symbol, weight }
    }

    /// True if this intent closes the position.
    #[inline]
    pub fn is_flatten(&self) -> bool {
        self.weight == 0.0
    }
}

/// Why an instrument was left alone this cycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum SkipReason {
    /// Halted, delisted, or otherwise not tradable now.
    Untradable,
    /// An earlier order is still working.
    OpenOrderPending,
    /// On the exclusion list (e.g. leveraged ETFs).
    Excluded,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::Untradable => write!(f, "untradable"),
            SkipReason::OpenOrderPending => write!(f, "open order pending"),
            SkipReason::Excluded => write!(f, "excluded"),
        }
    }
}

/// What happens to one instrument this cycle.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "outcome", rename_all = "snake_case"))]
pub enum Outcome {
    /// Move to the bucket weight.
    Target { bucket: Bucket, weight: f64 },
    /// Held but not desired: go to weight 0.
    Flatten,
    /// Left untouched.
    Skipped { reason: SkipReason },
}

/// One instrument's decision.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Decision {
    pub symbol: Symbol,
    #[cfg_attr(feature = "serde", serde(flatten))]
    pub outcome: Outcome,
}

impl Decision {
    /// The intent to send, if this decision trades.
    pub fn intent(&self) -> Option<TargetIntent> {
        match self.outcome {
            Outcome::Target { weight, .. } => Some(TargetIntent::new(self.symbol, weight)),
            Outcome::Flatten => Some(TargetIntent::new(self.symbol, 0.0)),
            Outcome::Skipped { .. } => None,
        }
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.outcome {
            Outcome::Target { bucket, weight } => {
                write!(f, "{:8} {:>5} {:>+8.4}", self.symbol, bucket, weight)
            }
            Outcome::Flatten => write!(f, "{:8} {:>5} {:>+8.4}", self.symbol, "flat", 0.0),
            Outcome::Skipped { reason } => write!(f, "{:8} skip  ({reason})", self.symbol),
        }
    }
}

/// Per-bucket equal weights for a cycle.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BucketWeights {
    pub long: f64,
    pub short: f64,
}

impl BucketWeights {
    #[inline]
    pub fn for_bucket(&self, bucket: Bucket) -> f64 {
        match bucket {
            Bucket::Long => self.long,
            Bucket::Short => self.short,
        }
    }
}

/// Split each bucket's leverage equally across its members.
///
/// An empty bucket gets weight 0 under [`EmptyBucketPolicy::Zero`]. Under
/// [`EmptyBucketPolicy::Reject`] an empty bucket with nonzero leverage is
/// [`Error::DegenerateBucket`]; zero leverage is always fine.
pub fn assign_weights(
    leverage: &LeverageConfig,
    n_longs: usize,
    n_shorts: usize,
    policy: EmptyBucketPolicy,
) -> Result<BucketWeights> {
    let long = bucket_weight(Bucket::Long, leverage.long(), n_longs, policy)?;
    let short = bucket_weight(Bucket::Short, leverage.short(), n_shorts, policy)?;
    Ok(BucketWeights { long, short })
}

fn bucket_weight(
    bucket: Bucket,
    leverage: f64,
    count: usize,
    policy: EmptyBucketPolicy,
) -> Result<f64> {
    if count == 0 {
        return match policy {
            EmptyBucketPolicy::Reject if leverage != 0.0 => {
                Err(Error::DegenerateBucket { bucket, leverage })
            }
            _ => Ok(0.0),
        };
    }
    Ok(leverage / count as f64)
}

/// The outcome of one cycle: weights used and a decision per instrument.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RebalancePlan {
    pub weights: BucketWeights,
    /// Longs, then shorts, then flattens, each in symbol order.
    pub decisions: Vec<Decision>,
}

impl RebalancePlan {
    /// Intents to submit, in decision order.
    pub fn intents(&self) -> Vec<TargetIntent> {
        self.decisions.iter().filter_map(Decision::intent).collect()
    }

    /// Decision for `symbol`, if it was considered.
    pub fn decision(&self, symbol: &Symbol) -> Option<&Decision> {
        self.decisions.iter().find(|d| d.symbol == *symbol)
    }

    /// Instruments left alone, with the reason.
    pub fn skipped(&self) -> impl Iterator<Item = (Symbol, SkipReason)> + '_ {
        self.decisions.iter().filter_map(|d| match d.outcome {
            Outcome::Skipped { reason } => Some((d.symbol, reason)),
            _ => None,
        })
    }

    /// Number of intents (targets + flattens).
    pub fn intent_count(&self) -> usize {
        self.decisions
            .iter()
            .filter(|d| !matches!(d.outcome, Outcome::Skipped { .. }))
            .count()
    }

    /// Send every intent to `sink`, stopping at the first refusal.
    ///
    /// Returns the number of intents accepted.
    pub fn submit<S: OrderSink + ?Sized>(&self, sink: &mut S) -> Result<usize> {
        let mut sent = 0;
        for intent in self.intents() {
            sink.order_target_percent(&intent)?;
            sent += 1;
        }
        Ok(sent)
    }
}

impl fmt::Display for RebalancePlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "REBALANCE PLAN (long {:+.4}/name, short {:+.4}/name):",
            self.weights.long, self.weights.short
        )?;
        if self.decisions.is_empty() {
            writeln!(f, "  nothing to do")?;
        }
        for d in &self.decisions {
            writeln!(f, "  {d}")?;
        }
        Ok(())
    }
}

/// Equal-weight long/short rebalancer.
///
/// Immutable after construction: one value serves every cycle of a strategy.
#[derive(Clone, Debug)]
pub struct Rebalancer {
    leverage: LeverageConfig,
    policy: EmptyBucketPolicy,
    exclusions: FxHashSet<Symbol>,
}

impl Rebalancer {
    pub fn new(leverage: LeverageConfig) -> Self {
        Self {
            leverage,
            policy: EmptyBucketPolicy::default(),
            exclusions: FxHashSet::default(),
        }
    }

    pub fn with_policy(mut self, policy: EmptyBucketPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Instruments that must never be given a position.
    pub fn with_exclusions(mut self, symbols: impl IntoIterator<Item = Symbol>) -> Self {
        self.exclusions.extend(symbols);
        self
    }

    pub fn leverage(&self) -> &LeverageConfig {
        &self.leverage
    }

    pub fn policy(&self) -> EmptyBucketPolicy {
        self.policy
    }

    pub fn is_excluded(&self, symbol: &Symbol) -> bool {
        self.exclusions.contains(symbol)
    }

    /// Decide every instrument's fate for this cycle without sending anything.
    pub fn plan<M: MarketView + ?Sized>(
        &self,
        desired: &DesiredPositions,
        holdings: &Holdings,
        market: &M,
    ) -> Result<RebalancePlan> {
        let weights = assign_weights(
            &self.leverage,
            desired.len(Bucket::Long),
            desired.len(Bucket::Short),
            self.policy,
        )?;

        let n_desired = desired.len(Bucket::Long) + desired.len(Bucket::Short);
        let mut decisions = Vec::with_capacity(n_desired + holdings.len());

        let buckets = [
            (Bucket::Long, desired.longs()),
            (Bucket::Short, desired.shorts()),
        ];
        for (bucket, members) in buckets {
            let weight = weights.for_bucket(bucket);
            for &symbol in members {
                let outcome = match self.screen_desired(&symbol, market) {
                    Some(reason) => Outcome::Skipped { reason },
                    None => Outcome::Target { bucket, weight },
                };
                decisions.push(Decision { symbol, outcome });
            }
        }

        for symbol in holdings.held() {
            if desired.contains(&symbol) {
                continue;
            }
            let outcome = if market.can_trade(&symbol) {
                Outcome::Flatten
            } else {
                Outcome::Skipped {
                    reason: SkipReason::Untradable,
                }
            };
            decisions.push(Decision { symbol, outcome });
        }

        let plan = RebalancePlan { weights, decisions };
        for (symbol, reason) in plan.skipped() {
            debug!("skipping {symbol}: {reason}");
        }
        Ok(plan)
    }

    /// Plan the cycle and submit every intent to `sink`.
    pub fn run<M, S>(
        &self,
        desired: &DesiredPositions,
        holdings: &Holdings,
        market: &M,
        sink: &mut S,
    ) -> Result<RebalancePlan>
    where
        M: MarketView + ?Sized,
        S: OrderSink + ?Sized,
    {
        let plan = self.plan(desired, holdings, market)?;
        plan.submit(sink)?;
        info!("This cycle's longs: {}", desired.labels(Bucket::Long));
        info!("This cycle's shorts: {}", desired.labels(Bucket::Short));
        Ok(plan)
    }

    /// Skip reason for a desired instrument, or `None` if it can trade.
    fn screen_desired<M>(&self, symbol: &Symbol, market: &M) -> Option<SkipReason>
    where
        M: MarketView + ?Sized,
    {
        if self.exclusions.contains(symbol) {
            Some(SkipReason::Excluded)
        } else if market.has_open_order(symbol) {
            Some(SkipReason::OpenOrderPending)
        } else if !market.can_trade(symbol) {
            Some(SkipReason::Untradable)
        } else {
            None
        }
    }
}
