//! # weightbook
//!
//! Equal-weight long/short rebalancing for rule-based trading strategies.
//!
//! Each scheduled cycle a strategy produces a set of instruments to hold long
//! and a set to hold short. The [`Rebalancer`] splits each side's leverage
//! equally across its members, emits a target-weight intent per instrument,
//! and flattens anything held that is no longer wanted. Instruments it cannot
//! touch are reported with a reason instead of being silently dropped.
//!
//! ## Features
//!
//! - **Equal weighting**: `weight = leverage / max(1, |bucket|)` per side
//! - **Explicit empty-bucket policy**: zero weight, or a hard error
//! - **Skip reasons**: untradable, open order pending, excluded
//! - **Collaborator traits**: [`MarketView`] for queries, [`OrderSink`] for intents
//! - **Signal helpers**: a cross-sectional reversion [`screen`] and a
//!   [`trend`] regime switch that feed the rebalancer
//!
//! ## Quick Start
//!
//! ```
//! use weightbook::{
//!     DesiredPositions, Holdings, LeverageConfig, Rebalancer, RecordingSink, StaticMarket,
//!     Symbol,
//! };
//!
//! let rebalancer = Rebalancer::new(LeverageConfig::new(1.5, -1.5).unwrap());
//!
//! let desired = DesiredPositions::new(
//!     [Symbol::new("A"), Symbol::new("B"), Symbol::new("C")],
//!     [Symbol::new("D"), Symbol::new("E")],
//! )
//! .unwrap();
//!
//! let mut sink = RecordingSink::new();
//! let plan = rebalancer
//!     .run(&desired, &Holdings::new(), &StaticMarket::open(), &mut sink)
//!     .unwrap();
//!
//! assert_eq!(plan.weights.long, 0.5);
//! assert_eq!(plan.weights.short, -0.75);
//! assert_eq!(sink.intents().len(), 5);
//! ```
//!
//! ## Empty Buckets
//!
//! An empty side never divides by zero. By default it simply trades nothing;
//! [`EmptyBucketPolicy::Reject`] turns it into an error when that side has
//! leverage to deploy:
//!
//! ```
//! use weightbook::{
//!     DesiredPositions, EmptyBucketPolicy, Error, Holdings, LeverageConfig, Rebalancer,
//!     StaticMarket, Symbol,
//! };
//!
//! let desired = DesiredPositions::new([], [Symbol::new("F")]).unwrap();
//! let lev = LeverageConfig::new(1.5, -1.5).unwrap();
//!
//! let plan = Rebalancer::new(lev)
//!     .plan(&desired, &Holdings::new(), &StaticMarket::open())
//!     .unwrap();
//! assert_eq!(plan.intents().len(), 1);
//! assert_eq!(plan.intents()[0].weight, -1.5);
//!
//! let err = Rebalancer::new(lev)
//!     .with_policy(EmptyBucketPolicy::Reject)
//!     .plan(&desired, &Holdings::new(), &StaticMarket::open())
//!     .unwrap_err();
//! assert!(matches!(err, Error::DegenerateBucket { .. }));
//! ```
//!
//! ## Flattening
//!
//! Anything held but not desired goes to weight 0, unless it cannot trade:
//!
//! ```
//! use weightbook::{
//!     DesiredPositions, Holdings, LeverageConfig, Outcome, Rebalancer, SkipReason,
//!     StaticMarket, Symbol,
//! };
//!
//! let holdings = Holdings::from_pairs([(Symbol::new("OLD"), 100), (Symbol::new("HALT"), -20)]);
//! let market = StaticMarket::builder().halted(Symbol::new("HALT")).build();
//!
//! let plan = Rebalancer::new(LeverageConfig::new(1.0, -1.0).unwrap())
//!     .plan(&DesiredPositions::empty(), &holdings, &market)
//!     .unwrap();
//!
//! assert_eq!(plan.decision(&Symbol::new("OLD")).unwrap().outcome, Outcome::Flatten);
//! assert_eq!(
//!     plan.decision(&Symbol::new("HALT")).unwrap().outcome,
//!     Outcome::Skipped { reason: SkipReason::Untradable }
//! );
//! ```

mod desired;
mod error;
mod holdings;
mod leverage;
pub mod market;
pub mod rebalance;
pub mod screen;
pub mod trend;
mod types;

// Re-export public API
pub use desired::DesiredPositions;
pub use error::{Error, Result};
pub use holdings::{Holdings, PositionTally};
pub use leverage::{EmptyBucketPolicy, LeverageConfig};
pub use market::{MarketView, OrderSink, RecordingSink, StaticMarket};
pub use rebalance::{
    BucketWeights, Decision, Outcome, RebalancePlan, Rebalancer, SkipReason, TargetIntent,
    assign_weights,
};
pub use screen::{FactorRow, PercentileBand, ReversionScreen};
pub use trend::{Regime, TrendAllocation, TrendAllocator, TrendSignal};
pub use types::{Bucket, SYMBOL_MAX_LEN, Symbol};
