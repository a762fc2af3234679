//! weightbook-rebalancer: cycle runner for the weightbook rebalancer.
//!
//! Reads a cycle snapshot (holdings, market state, and either the desired
//! longs/shorts or a factor table) from JSON, checks the rebalance schedule,
//! plans the cycle with [`weightbook::Rebalancer`], and appends target-weight
//! intents to a JSONL file with an audit trail.

pub mod audit;
pub mod config;
pub mod cycle;
pub mod error;
pub mod execution;
pub mod intents;
pub mod schedule;
