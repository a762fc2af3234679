//! JSONL intent file: the runner's execution collaborator.
//!
//! Every accepted intent becomes one line,
//! `{"symbol":"AAPL","weight":0.5,"ts":"..."}`, for a downstream executor to
//! pick up.

use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::Serialize;
use weightbook::{OrderSink, Symbol, TargetIntent};

use crate::error::Result;

#[derive(Debug, Clone, Serialize)]
struct IntentLine {
    symbol: Symbol,
    weight: f64,
    ts: DateTime<Utc>,
}

/// Append-only intent writer.
pub struct IntentFile {
    writer: BufWriter<File>,
    ts: DateTime<Utc>,
    written: usize,
}

impl IntentFile {
    /// Open (or create) the intents file for appending. Every line written
    /// carries `ts`, the cycle timestamp.
    pub fn open(path: &Path, ts: DateTime<Utc>) -> Result<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            writer: BufWriter::new(file),
            ts,
            written: 0,
        })
    }

    /// Lines written through this handle.
    pub fn written(&self) -> usize {
        self.written
    }

    fn write_line(&mut self, intent: &TargetIntent) -> std::io::Result<()> {
        let line = IntentLine {
            symbol: intent.symbol,
            weight: intent.weight,
            ts: self.ts,
        };
        let json = serde_json::to_string(&line)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        writeln!(self.writer, "{json}")?;
        self.writer.flush()
    }
}

impl OrderSink for IntentFile {
    fn order_target_percent(&mut self, intent: &TargetIntent) -> weightbook::Result<()> {
        self.write_line(intent)
            .map_err(|e| weightbook::Error::Sink(format!("{}: {e}", intent.symbol)))?;
        self.written += 1;
        Ok(())
    }
}
