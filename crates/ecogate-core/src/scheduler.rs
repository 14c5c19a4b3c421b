//! Poll loop: keep checking until the gate opens, then run once.
//!
//! ## State Transitions
//!
//! ```text
//! Polling -> (read -> log -> gate) -> Polling | Green | Cancelled | TimedOut
//! ```
//!
//! The interval is fixed: no jitter, no backoff. Without a cancel request or
//! a `max_wait`, the loop only ends when the gate opens.

use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::info;

use crate::agent::EcoAgent;
use crate::error::Result;
use crate::index::{IndexProvider, IndexReading};
use crate::workload::{Workload, WorkloadReport};

/// Longest uninterrupted sleep between cancellation checks.
const SLEEP_SLICE: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollOptions {
    pub check_interval: Duration,
    /// Give up after this long. `None` polls forever.
    pub max_wait: Option<Duration>,
}

impl Default for PollOptions {
    fn default() -> Self {
        Self {
            check_interval: Duration::from_secs(60),
            max_wait: None,
        }
    }
}

/// Cooperative cancellation flag shared between the loop and its owner.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PollOutcome {
    /// The gate opened on tick `ticks` and the workload ran exactly once.
    Green {
        ticks: usize,
        reading: IndexReading,
        report: WorkloadReport,
    },
    Cancelled { ticks: usize },
    TimedOut { ticks: usize },
}

impl PollOutcome {
    pub fn ticks(&self) -> usize {
        match self {
            PollOutcome::Green { ticks, .. }
            | PollOutcome::Cancelled { ticks }
            | PollOutcome::TimedOut { ticks } => *ticks,
        }
    }
}

enum Wait {
    Elapsed,
    Cancelled,
    DeadlineReached,
}

/// An interval too large to represent as an `Instant` never elapses; only
/// cancellation or the deadline ends the wait.
fn wait(interval: Duration, deadline: Option<Instant>, cancel: &CancelToken) -> Wait {
    let wake_at = Instant::now().checked_add(interval);
    loop {
        if cancel.is_cancelled() {
            return Wait::Cancelled;
        }
        let now = Instant::now();
        if deadline.is_some_and(|d| now >= d) {
            return Wait::DeadlineReached;
        }
        if wake_at.is_some_and(|w| now >= w) {
            return Wait::Elapsed;
        }
        let until = match (deadline, wake_at) {
            (Some(d), Some(w)) => Some(d.min(w)),
            (d, w) => d.or(w),
        };
        let nap = until.map_or(SLEEP_SLICE, |u| {
            u.saturating_duration_since(now).min(SLEEP_SLICE)
        });
        std::thread::sleep(nap);
    }
}

/// Poll the agent's provider until the index drops below its threshold.
///
/// Each tick reads the index, appends it to the decision log and evaluates
/// the gate. The workload runs at most once, only on `Green`.
///
/// # Errors
///
/// A failure to append to the decision log ends the loop.
pub fn run_when_green<P: IndexProvider, W: Workload>(
    agent: &mut EcoAgent<P, W>,
    options: &PollOptions,
    cancel: &CancelToken,
) -> Result<PollOutcome> {
    // A deadline beyond what `Instant` can represent is no deadline at all.
    let deadline = options.max_wait.and_then(|d| Instant::now().checked_add(d));
    let mut ticks = 0;

    info!(threshold = %agent.threshold(), interval_secs = options.check_interval.as_secs_f64(), "waiting for eco-friendly conditions");

    loop {
        if cancel.is_cancelled() {
            info!(ticks, "poll loop cancelled");
            return Ok(PollOutcome::Cancelled { ticks });
        }

        let reading = agent.observe()?;
        ticks += 1;

        if agent.is_green(&reading) {
            info!(ticks, "conditions met, executing task");
            let report = agent.run_workload();
            return Ok(PollOutcome::Green {
                ticks,
                reading,
                report,
            });
        }

        info!(
            ticks,
            next_check_secs = options.check_interval.as_secs_f64(),
            "still too high, checking again later"
        );
        match wait(options.check_interval, deadline, cancel) {
            Wait::Elapsed => {}
            Wait::Cancelled => {
                info!(ticks, "poll loop cancelled");
                return Ok(PollOutcome::Cancelled { ticks });
            }
            Wait::DeadlineReached => {
                info!(ticks, "poll loop timed out");
                return Ok(PollOutcome::TimedOut { ticks });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::tests::scripted_agent;
    use tempfile::TempDir;

    fn immediate() -> PollOptions {
        PollOptions {
            check_interval: Duration::ZERO,
            max_wait: None,
        }
    }

    #[test]
    fn runs_once_after_third_tick() {
        let dir = TempDir::new().unwrap();
        let mut agent = scripted_agent(&dir, vec![0.5, 0.5, 0.2], 0.3);

        let outcome = run_when_green(&mut agent, &immediate(), &CancelToken::new()).unwrap();

        assert_eq!(outcome.ticks(), 3);
        assert!(matches!(outcome, PollOutcome::Green { .. }));
        assert_eq!(agent.provider().reads(), 3);
        assert_eq!(agent.workload().runs, 1);

        let content = std::fs::read_to_string(dir.path().join("eco_log.txt")).unwrap();
        let values: Vec<&str> = content
            .lines()
            .map(|l| l.rsplit(": ").next().unwrap())
            .collect();
        assert_eq!(values, ["0.5000", "0.5000", "0.2000"]);
    }

    #[test]
    fn equal_to_threshold_keeps_polling() {
        let dir = TempDir::new().unwrap();
        let mut agent = scripted_agent(&dir, vec![0.3, 0.3, 0.29], 0.3);
        let outcome = run_when_green(&mut agent, &immediate(), &CancelToken::new()).unwrap();
        assert_eq!(outcome.ticks(), 3);
    }

    #[test]
    fn cancelled_before_start_does_nothing() {
        let dir = TempDir::new().unwrap();
        let mut agent = scripted_agent(&dir, vec![0.1], 0.3);
        let cancel = CancelToken::new();
        cancel.cancel();

        let outcome = run_when_green(&mut agent, &immediate(), &cancel).unwrap();
        assert_eq!(outcome, PollOutcome::Cancelled { ticks: 0 });
        assert_eq!(agent.workload().runs, 0);
        assert!(!dir.path().join("eco_log.txt").exists());
    }

    #[test]
    fn cancel_from_another_thread_interrupts_wait() {
        let dir = TempDir::new().unwrap();
        let mut agent = scripted_agent(&dir, vec![0.9], 0.3);
        let cancel = CancelToken::new();
        let remote = cancel.clone();
        let handle = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(50));
            remote.cancel();
        });

        let started = Instant::now();
        let options = PollOptions {
            check_interval: Duration::from_secs(30),
            max_wait: None,
        };
        let outcome = run_when_green(&mut agent, &options, &cancel).unwrap();
        handle.join().unwrap();

        assert_eq!(outcome, PollOutcome::Cancelled { ticks: 1 });
        assert!(started.elapsed() < Duration::from_secs(5));
        assert_eq!(agent.workload().runs, 0);
    }

    #[test]
    fn max_wait_bounds_the_loop() {
        let dir = TempDir::new().unwrap();
        let mut agent = scripted_agent(&dir, vec![1.0], 0.3);
        let options = PollOptions {
            check_interval: Duration::from_millis(10),
            max_wait: Some(Duration::from_millis(100)),
        };

        let outcome = run_when_green(&mut agent, &options, &CancelToken::new()).unwrap();

        assert!(matches!(outcome, PollOutcome::TimedOut { .. }));
        assert!(outcome.ticks() >= 1);
        assert_eq!(agent.workload().runs, 0);
        assert_eq!(agent.provider().reads(), outcome.ticks());
    }

    #[test]
    fn unrepresentable_max_wait_means_no_deadline() {
        let dir = TempDir::new().unwrap();
        let mut agent = scripted_agent(&dir, vec![0.9, 0.9, 0.1], 0.3);
        let options = PollOptions {
            check_interval: Duration::ZERO,
            max_wait: Some(Duration::from_secs(u64::MAX)),
        };

        let outcome = run_when_green(&mut agent, &options, &CancelToken::new()).unwrap();

        assert!(matches!(outcome, PollOutcome::Green { ticks: 3, .. }));
        assert_eq!(agent.workload().runs, 1);
    }

    #[test]
    fn unrepresentable_interval_waits_until_cancelled() {
        let dir = TempDir::new().unwrap();
        let mut agent = scripted_agent(&dir, vec![0.9], 0.3);
        let cancel = CancelToken::new();
        let remote = cancel.clone();
        let handle = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(50));
            remote.cancel();
        });

        let options = PollOptions {
            check_interval: Duration::from_secs(u64::MAX),
            max_wait: None,
        };
        let outcome = run_when_green(&mut agent, &options, &cancel).unwrap();
        handle.join().unwrap();

        assert_eq!(outcome, PollOutcome::Cancelled { ticks: 1 });
    }

    #[test]
    fn unrepresentable_interval_still_honours_deadline() {
        let dir = TempDir::new().unwrap();
        let mut agent = scripted_agent(&dir, vec![0.9], 0.3);
        let options = PollOptions {
            check_interval: Duration::from_secs(u64::MAX),
            max_wait: Some(Duration::from_millis(50)),
        };
        let outcome = run_when_green(&mut agent, &options, &CancelToken::new()).unwrap();
        assert_eq!(outcome, PollOutcome::TimedOut { ticks: 1 });
    }

    #[test]
    fn zero_max_wait_still_checks_once() {
        let dir = TempDir::new().unwrap();
        let mut agent = scripted_agent(&dir, vec![0.9], 0.3);
        let options = PollOptions {
            check_interval: Duration::from_secs(60),
            max_wait: Some(Duration::ZERO),
        };
        let outcome = run_when_green(&mut agent, &options, &CancelToken::new()).unwrap();
        assert_eq!(outcome, PollOutcome::TimedOut { ticks: 1 });
    }
}
