//! Decision history: parse the decision log and render it as a time series.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt::Write;
use std::path::Path;

use crate::decision::{should_compute, Threshold};
use crate::decision_log::DecisionRecord;
use crate::error::HistoryError;

/// Read every record from the log at `path`, in file order.
///
/// Blank lines are skipped; any other unparseable line is an error.
pub fn load_history(path: &Path) -> Result<Vec<DecisionRecord>, HistoryError> {
    let content = std::fs::read_to_string(path).map_err(|source| HistoryError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse_history(&content)
}

pub fn parse_history(content: &str) -> Result<Vec<DecisionRecord>, HistoryError> {
    content
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(i, line)| {
            DecisionRecord::parse_line(line)
                .map_err(|message| HistoryError::MalformedLine { line: i + 1, message })
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistorySummary {
    pub count: usize,
    pub first: DateTime<Utc>,
    pub last: DateTime<Utc>,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    /// Records that would have passed the gate at the given threshold.
    pub green: usize,
}

impl HistorySummary {
    pub fn from_records(records: &[DecisionRecord], threshold: Threshold) -> Option<Self> {
        let first = records.first()?;
        let last = records.last()?;

        let values = records.iter().map(|r| r.index.value());
        let min = values.clone().fold(f64::INFINITY, f64::min);
        let max = values.clone().fold(f64::NEG_INFINITY, f64::max);
        let mean = values.sum::<f64>() / records.len() as f64;
        let green = records
            .iter()
            .filter(|r| should_compute(r.index, threshold))
            .count();

        Some(Self {
            count: records.len(),
            first: first.timestamp,
            last: last.timestamp,
            min,
            max,
            mean,
            green,
        })
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ChartOptions {
    pub width: usize,
    pub height: usize,
    pub threshold: Option<Threshold>,
}

impl Default for ChartOptions {
    fn default() -> Self {
        Self {
            width: 60,
            height: 10,
            threshold: None,
        }
    }
}

const POINT: char = '*';
const THRESHOLD_MARK: char = '-';

/// Render records as a text chart, y axis 0..1, oldest on the left.
///
/// When there are more records than columns, consecutive records are averaged
/// into one column.
pub fn render_chart(records: &[DecisionRecord], options: ChartOptions) -> Result<String, HistoryError> {
    let (Some(first), Some(last)) = (records.first(), records.last()) else {
        return Err(HistoryError::Empty);
    };

    let height = options.height.max(2);
    let columns = resample(records, options.width.max(1));
    let row_of = |v: f64| ((1.0 - v) * (height - 1) as f64).round() as usize;
    let threshold_row = options.threshold.map(|t| row_of(t.value()));

    let mut out = String::new();
    for row in 0..height {
        let level = 1.0 - row as f64 / (height - 1) as f64;
        let _ = write!(out, "{level:>5.2} |");
        for &v in &columns {
            let ch = if row_of(v) == row {
                POINT
            } else if threshold_row == Some(row) {
                THRESHOLD_MARK
            } else {
                ' '
            };
            out.push(ch);
        }
        out.push('\n');
    }

    let _ = writeln!(out, "      +{}", "-".repeat(columns.len()));
    let _ = writeln!(
        out,
        "       {} .. {} ({} records)",
        first.timestamp.format("%Y-%m-%d %H:%M"),
        last.timestamp.format("%Y-%m-%d %H:%M"),
        records.len()
    );
    if let Some(t) = options.threshold {
        let _ = writeln!(out, "       {THRESHOLD_MARK} threshold {t}");
    }
    Ok(out)
}

fn resample(records: &[DecisionRecord], width: usize) -> Vec<f64> {
    if records.len() <= width {
        return records.iter().map(|r| r.index.value()).collect();
    }
    (0..width)
        .map(|col| {
            let start = col * records.len() / width;
            let end = ((col + 1) * records.len() / width).max(start + 1);
            let bucket = &records[start..end];
            bucket.iter().map(|r| r.index.value()).sum::<f64>() / bucket.len() as f64
        })
        .collect()
}
