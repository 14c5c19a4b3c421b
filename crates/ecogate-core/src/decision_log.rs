//! Append-only decision log.
//!
//! One line per observation:
//!
//! ```text
//! 2025-03-01T09:15:02.123456, Damage Index: 0.2875
//! ```
//!
//! Timestamps are naive UTC; the reader also accepts RFC 3339 with an offset.

use chrono::{DateTime, Duration, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cell::Cell;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::{HistoryError, Result};
use crate::index::DamageIndex;

/// Literal separating the timestamp from the value in each record.
pub const RECORD_SEPARATOR: &str = ", Damage Index: ";
const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6f";

/// Source of "now".
pub trait Clock: Send {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Deterministic clock. Each call returns the current instant and then
/// advances it by `step` (zero unless set with [`FixedClock::stepping`]).
#[derive(Debug, Clone)]
pub struct FixedClock {
    at: Cell<DateTime<Utc>>,
    step: Duration,
}

impl FixedClock {
    pub fn new(at: DateTime<Utc>) -> Self {
        Self {
            at: Cell::new(at),
            step: Duration::zero(),
        }
    }

    pub fn stepping(mut self, step: Duration) -> Self {
        self.step = step;
        self
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        let now = self.at.get();
        self.at.set(now + self.step);
        now
    }
}

/// One persisted observation. Never modified once written.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DecisionRecord {
    pub timestamp: DateTime<Utc>,
    pub index: DamageIndex,
}

impl DecisionRecord {
    /// Render without the trailing newline.
    pub fn to_line(&self) -> String {
        format!(
            "{}{}{}",
            self.timestamp.naive_utc().format(TIMESTAMP_FORMAT),
            RECORD_SEPARATOR,
            self.index
        )
    }

    pub fn parse_line(line: &str) -> std::result::Result<Self, String> {
        let (time_str, value_str) = line
            .trim()
            .split_once(RECORD_SEPARATOR)
            .ok_or_else(|| format!("missing separator '{}'", RECORD_SEPARATOR.trim()))?;

        let timestamp = parse_timestamp(time_str.trim())?;
        let value = value_str
            .trim()
            .parse::<f64>()
            .map_err(|e| format!("invalid damage index '{}': {e}", value_str.trim()))?;

        Ok(Self {
            timestamp,
            index: DamageIndex::new(value),
        })
    }
}

fn parse_timestamp(s: &str) -> std::result::Result<DateTime<Utc>, String> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }
    s.parse::<NaiveDateTime>()
        .map(|naive| naive.and_utc())
        .map_err(|e| format!("invalid timestamp '{s}': {e}"))
}

pub struct DecisionLog {
    path: PathBuf,
    clock: Box<dyn Clock>,
}

impl DecisionLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            clock: Box::new(SystemClock),
        }
    }

    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one record stamped with the current time. Creates the file if
    /// it does not exist; earlier lines are never touched.
    pub fn append(&self, index: DamageIndex) -> Result<DecisionRecord> {
        let record = DecisionRecord {
            timestamp: self.clock.now(),
            index,
        };

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        let mut line = record.to_line();
        line.push('\n');
        file.write_all(line.as_bytes())?;

        debug!(path = %self.path.display(), %index, "decision logged");
        Ok(record)
    }

    pub fn read_all(&self) -> std::result::Result<Vec<DecisionRecord>, HistoryError> {
        crate::history::load_history(&self.path)
    }
}
