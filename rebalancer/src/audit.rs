//! JSONL audit trail logging.
//!
//! Each run appends events to an audit.jsonl file, one JSON object per line.

use std::fs::{self, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::Serialize;
use weightbook::{RebalancePlan, TrendAllocation};

use crate::error::{Error, Result};

/// An audit event written to the JSONL trail.
#[derive(Debug, Clone, Serialize)]
pub struct AuditEvent {
    pub event: &'static str,
    pub ts: DateTime<Utc>,
    #[serde(flatten)]
    pub data: serde_json::Value,
}

/// Append-only audit logger.
pub struct AuditLog {
    writer: BufWriter<std::fs::File>,
}

impl AuditLog {
    /// Open (or create) the audit log file for appending.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new().create(true).append(true).open(path)?;

        Ok(Self {
            writer: BufWriter::new(file),
        })
    }

    /// Log an event with arbitrary JSON data.
    pub fn log(&mut self, event: &'static str, data: serde_json::Value) -> Result<()> {
        let entry = AuditEvent {
            event,
            ts: Utc::now(),
            data,
        };
        let json = serde_json::to_string(&entry)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        writeln!(self.writer, "{json}")?;
        self.writer.flush()?;
        Ok(())
    }

    /// Log a simple event with no additional data.
    pub fn log_simple(&mut self, event: &'static str) -> Result<()> {
        self.log(event, serde_json::json!({}))
    }
}

pub fn log_run_started(audit: &mut AuditLog, command: &str, cycle_file: &str) -> Result<()> {
    audit.log(
        "run_started",
        serde_json::json!({
            "command": command,
            "cycle_file": cycle_file,
        }),
    )
}

/// Log the full plan: bucket weights and every decision.
pub fn log_plan(audit: &mut AuditLog, plan: &RebalancePlan) -> Result<()> {
    let data = serde_json::to_value(plan)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
    audit.log("plan_computed", data)
}

pub fn log_trend(audit: &mut AuditLog, allocation: &TrendAllocation) -> Result<()> {
    let data = serde_json::to_value(allocation)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
    audit.log("trend_computed", data)
}

pub fn log_intents_written(audit: &mut AuditLog, path: &Path, count: usize) -> Result<()> {
    audit.log(
        "intents_written",
        serde_json::json!({
            "path": path.display().to_string(),
            "count": count,
        }),
    )
}

/// Log a run that stopped on `error` after `intents_written` intents.
pub fn log_run_failed(audit: &mut AuditLog, error: &Error, intents_written: usize) -> Result<()> {
    audit.log(
        "run_failed",
        serde_json::json!({
            "error": error.to_string(),
            "intents_written": intents_written,
        }),
    )
}

pub fn log_run_completed(audit: &mut AuditLog, intents: usize, skipped: usize) -> Result<()> {
    audit.log(
        "run_completed",
        serde_json::json!({
            "intents": intents,
            "skipped": skipped,
        }),
    )
}
