//! # ecogate Core Library
//!
//! Decides whether a computational task should run now, based on a normalized
//! "damage index" derived from the carbon intensity of the local grid.
//!
//! ## Architecture
//!
//! - **Index**: fetches carbon intensity and normalizes it into [0, 1], falling
//!   back to a random draw when credentials or the network are missing
//! - **Decision**: the strict `index < threshold` gate
//! - **Decision log**: append-only text record of every observed index
//! - **Scheduler**: polls until the gate opens, then runs the workload once
//! - **History**: parses the decision log and renders it as a time series
//!
//! ## Key Components
//!
//! - [`EcoAgent`]: ties provider, log, workload and threshold together
//! - [`run_when_green`]: cancellable poll loop
//! - [`DecisionLog`]: persistent decision record
//! - [`Config`]: application configuration management

pub mod agent;
pub mod config;
pub mod decision;
pub mod decision_log;
pub mod error;
pub mod history;
pub mod index;
pub mod scheduler;
pub mod workload;

pub use agent::{Decision, EcoAgent, Outcome};
pub use config::{CarbonConfig, Config};
pub use decision::{should_compute, Threshold};
pub use decision_log::{Clock, DecisionLog, DecisionRecord, FixedClock, SystemClock};
pub use error::{ConfigError, CoreError, HistoryError, ValidationError};
pub use history::{load_history, render_chart, ChartOptions, HistorySummary};
pub use index::{
    normalize, CarbonIntensityProvider, DamageIndex, IndexProvider, IndexReading, Provenance,
    ScriptedProvider,
};
pub use scheduler::{run_when_green, CancelToken, PollOptions, PollOutcome};
pub use workload::{SumOfSquares, Workload, WorkloadReport};
