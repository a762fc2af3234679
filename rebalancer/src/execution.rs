//! Execution orchestrator: schedule → plan → confirm → write intents.
//!
//! This is the main workflow that ties together all components.

use std::path::Path;

use log::{error, info, warn};
use weightbook::{Bucket, DesiredPositions, OrderSink, RebalancePlan, TrendAllocation};

use crate::audit::{self, AuditLog};
use crate::config::Config;
use crate::cycle::CycleSnapshot;
use crate::error::{Error, Result};
use crate::intents::IntentFile;

/// Options for a run.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub dry_run: bool,
    pub force: bool,
    pub ignore_schedule: bool,
    pub cycle_file: String,
}

/// Compute the plan for a cycle without side effects.
pub fn compute_plan(
    config: &Config,
    cycle: &CycleSnapshot,
) -> Result<(DesiredPositions, RebalancePlan)> {
    let rebalancer = config.rebalancer()?;
    let desired = cycle.desired(&config.reversion_screen()?)?;
    let holdings = cycle.holdings()?;
    let market = cycle.market()?;
    let plan = rebalancer.plan(&desired, &holdings, &market)?;
    Ok((desired, plan))
}

/// Show the plan for a cycle.
pub fn show_plan(config: &Config, cycle: &CycleSnapshot) -> Result<()> {
    let (desired, plan) = compute_plan(config, cycle)?;
    display_buckets(&desired);
    print!("\n{plan}");
    Ok(())
}

/// Execute a full rebalance cycle.
///
/// Returns the number of intents written.
pub fn run(config: &Config, cycle: &CycleSnapshot, opts: &RunOptions) -> Result<usize> {
    // 1. Schedule gate
    if !is_due(config, cycle, opts) {
        return Ok(0);
    }

    // 2. Open audit log
    let mut audit = AuditLog::open(&config.audit_path())?;
    audit::log_run_started(&mut audit, "run", &opts.cycle_file)?;

    // 3. Plan
    let (desired, plan) = match compute_plan(config, cycle) {
        Ok(p) => p,
        Err(e) => {
            audit::log_run_failed(&mut audit, &e, 0)?;
            return Err(e);
        }
    };
    audit::log_plan(&mut audit, &plan)?;

    display_buckets(&desired);
    print!("\n{plan}");
    let skipped = plan.skipped().count();
    if skipped > 0 {
        warn!("{skipped} instrument(s) skipped this cycle");
    }

    if plan.intent_count() == 0 {
        println!("\nNo intents this cycle.");
        audit::log_run_completed(&mut audit, 0, skipped)?;
        return Ok(0);
    }

    // 4. Dry run stops here
    if opts.dry_run {
        println!("\n[DRY RUN] No intents written.");
        return Ok(0);
    }

    // 5. Confirm
    if !confirm(&mut audit, opts.force)? {
        return Ok(0);
    }

    // 6. Write intents
    let path = config.intents_path();
    let written = write_intents(&mut audit, &path, cycle, |sink| plan.submit(sink))?;

    info!("This cycle's longs: {}", desired.labels(Bucket::Long));
    info!("This cycle's shorts: {}", desired.labels(Bucket::Short));

    // 7. Log completion
    audit::log_run_completed(&mut audit, written, skipped)?;
    println!(
        "\n{written} intent(s) written to {}. Audit logged to {}",
        path.display(),
        config.audit_path().display()
    );

    Ok(written)
}

/// Run the trend allocator on the cycle's price history.
///
/// Returns the number of intents written.
pub fn run_trend(config: &Config, cycle: &CycleSnapshot, opts: &RunOptions) -> Result<usize> {
    let allocator = config
        .trend_allocator()?
        .ok_or_else(|| Error::Config("no [trend] section in config".into()))?;
    if !is_due(config, cycle, opts) {
        return Ok(0);
    }
    let history = cycle.trend_history()?;
    let market = cycle.market()?;

    let mut audit = AuditLog::open(&config.audit_path())?;
    audit::log_run_started(&mut audit, "trend", &opts.cycle_file)?;

    let allocation =
        match allocator.allocate(&history.reference, &history.momentum, history.price, &market) {
            Ok(a) => a,
            Err(e) => {
                let e = Error::from(e);
                audit::log_run_failed(&mut audit, &e, 0)?;
                return Err(e);
            }
        };
    audit::log_trend(&mut audit, &allocation)?;
    display_trend(&allocation);

    if opts.dry_run {
        println!("\n[DRY RUN] No intents written.");
        return Ok(0);
    }

    if !confirm(&mut audit, opts.force)? {
        return Ok(0);
    }

    let path = config.intents_path();
    let written = write_intents(&mut audit, &path, cycle, |sink| {
        for intent in &allocation.intents {
            sink.order_target_percent(intent)?;
        }
        Ok(sink.written())
    })?;
    audit::log_run_completed(&mut audit, written, 0)?;
    println!("\n{written} intent(s) written to {}", path.display());

    Ok(written)
}

/// Show how many long and short positions the cycle holds, and the gross
/// leverage when the snapshot carries prices and equity.
pub fn show_tally(cycle: &CycleSnapshot) -> Result<()> {
    let tally = cycle.holdings()?.tally();
    println!("Long positions:  {}", tally.longs);
    println!("Short positions: {}", tally.shorts);
    if let Some(leverage) = cycle.gross_leverage()? {
        println!("Gross leverage:  {leverage:.2}x");
    }
    Ok(())
}

// === Helpers ===

/// Schedule gate. `false` means today is not a rebalance day.
fn is_due(config: &Config, cycle: &CycleSnapshot, opts: &RunOptions) -> bool {
    let schedule = config.schedule();
    if opts.ignore_schedule || schedule.is_due(cycle.date()) {
        return true;
    }
    info!(
        "{} is not a {:?} rebalance day, skipping",
        cycle.date(),
        schedule.cadence
    );
    println!("Not a rebalance day ({}). Nothing to do.", cycle.date());
    false
}

/// Open the intents file and hand it to `submit`. Any failure is audited
/// as `run_failed` with the count of intents already on disk.
fn write_intents<F>(
    audit: &mut AuditLog,
    path: &Path,
    cycle: &CycleSnapshot,
    submit: F,
) -> Result<usize>
where
    F: FnOnce(&mut IntentFile) -> weightbook::Result<usize>,
{
    let mut sink = match IntentFile::open(path, cycle.timestamp) {
        Ok(sink) => sink,
        Err(e) => {
            audit::log_run_failed(audit, &e, 0)?;
            return Err(e);
        }
    };
    match submit(&mut sink) {
        Ok(written) => {
            audit::log_intents_written(audit, path, written)?;
            Ok(written)
        }
        Err(e) => {
            let e = Error::from(e);
            error!("writing intents to {} failed: {e}", path.display());
            audit::log_run_failed(audit, &e, sink.written())?;
            Err(e)
        }
    }
}

/// Ask before writing. `Ok(false)` means the user declined.
fn confirm(audit: &mut AuditLog, force: bool) -> Result<bool> {
    if force {
        return Ok(true);
    }

    let confirmed = dialoguer::Confirm::new()
        .with_prompt("Write intents?")
        .default(false)
        .interact()
        .map_err(|e| Error::Aborted(format!("confirmation prompt failed: {e}")))?;

    audit.log("user_confirmed", serde_json::json!({ "approved": confirmed }))?;
    if !confirmed {
        println!("Aborted.");
    }
    Ok(confirmed)
}

fn display_buckets(desired: &DesiredPositions) {
    println!("LONGS  ({}): {}", desired.len(Bucket::Long), desired.labels(Bucket::Long));
    println!("SHORTS ({}): {}", desired.len(Bucket::Short), desired.labels(Bucket::Short));
}

fn display_trend(allocation: &TrendAllocation) {
    let s = &allocation.signal;
    println!(
        "TREND: price {:.2}, MA {:.2}, momentum {:+.2}% => {}",
        s.price,
        s.moving_average,
        s.momentum * 100.0,
        allocation.regime
    );
    for intent in &allocation.intents {
        println!("  {:8} {:>+8.4}", intent.symbol, intent.weight);
    }
}
