//! Single-shot decision: read once, log once, maybe run.

use serde::Serialize;
use tracing::info;

use crate::decision::{should_compute, Threshold};
use crate::decision_log::DecisionLog;
use crate::error::Result;
use crate::index::{IndexProvider, IndexReading};
use crate::workload::{Workload, WorkloadReport};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Outcome {
    Computed { forced: bool, report: WorkloadReport },
    /// Too much damage right now; nothing ran.
    Deferred,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Decision {
    pub reading: IndexReading,
    pub outcome: Outcome,
}

impl Decision {
    pub fn computed(&self) -> bool {
        matches!(self.outcome, Outcome::Computed { .. })
    }
}

pub struct EcoAgent<P, W> {
    provider: P,
    log: DecisionLog,
    workload: W,
    threshold: Threshold,
}

impl<P: IndexProvider, W: Workload> EcoAgent<P, W> {
    pub fn new(provider: P, log: DecisionLog, workload: W, threshold: Threshold) -> Self {
        Self {
            provider,
            log,
            workload,
            threshold,
        }
    }

    pub fn threshold(&self) -> Threshold {
        self.threshold
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn workload(&self) -> &W {
        &self.workload
    }

    pub fn log(&self) -> &DecisionLog {
        &self.log
    }

    /// Fetch a reading and append it to the decision log.
    pub(crate) fn observe(&mut self) -> Result<IndexReading> {
        let reading = self.provider.read_index();
        self.log.append(reading.index)?;
        info!(index = %reading.index, provenance = ?reading.provenance, "current damage index");
        Ok(reading)
    }

    pub(crate) fn is_green(&self, reading: &IndexReading) -> bool {
        should_compute(reading.index, self.threshold)
    }

    pub(crate) fn run_workload(&mut self) -> WorkloadReport {
        self.workload.run()
    }

    /// One evaluation, no retry. Runs the workload when `force` is set or the
    /// index is below the threshold.
    ///
    /// # Errors
    ///
    /// Only a failure to append to the decision log is reported.
    pub fn maybe_compute(&mut self, force: bool) -> Result<Decision> {
        let reading = self.observe()?;

        let green = self.is_green(&reading);
        let outcome = if force || green {
            let forced = !green;
            info!(forced, "green condition met, running task");
            Outcome::Computed {
                forced,
                report: self.run_workload(),
            }
        } else {
            info!(threshold = %self.threshold, "too much damage, waiting for better conditions");
            Outcome::Deferred
        };

        Ok(Decision { reading, outcome })
    }
}
