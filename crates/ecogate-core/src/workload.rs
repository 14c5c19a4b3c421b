//! The gated workload.

use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::info;

/// What a workload reports when it finishes. Nothing downstream gates on it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkloadReport {
    pub name: String,
    pub result: String,
    pub elapsed: Duration,
}

/// A unit of work run once the green condition is met.
pub trait Workload {
    fn name(&self) -> &str;

    fn run(&mut self) -> WorkloadReport;
}

impl<W: Workload + ?Sized> Workload for Box<W> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn run(&mut self) -> WorkloadReport {
        (**self).run()
    }
}

/// Placeholder CPU-bound task: the sum of `i * i` for `i` in `0..upper`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SumOfSquares {
    pub upper: u64,
}

impl SumOfSquares {
    pub const DEFAULT_UPPER: u64 = 1_000_000;

    pub fn new(upper: u64) -> Self {
        Self { upper }
    }

    pub fn compute(&self) -> u128 {
        (0..self.upper).map(|i| u128::from(i) * u128::from(i)).sum()
    }
}

impl Default for SumOfSquares {
    fn default() -> Self {
        Self::new(Self::DEFAULT_UPPER)
    }
}

impl Workload for SumOfSquares {
    fn name(&self) -> &str {
        "sum-of-squares"
    }

    fn run(&mut self) -> WorkloadReport {
        info!(upper = self.upper, "running workload");
        let started = Instant::now();
        let total = self.compute();
        let elapsed = started.elapsed();
        info!(result = %total, elapsed_ms = elapsed.as_millis() as u64, "workload complete");

        WorkloadReport {
            name: self.name().to_string(),
            result: total.to_string(),
            elapsed,
        }
    }
}
