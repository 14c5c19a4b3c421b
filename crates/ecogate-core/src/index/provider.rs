use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::damage::DamageIndex;
use crate::decision_log::{Clock, SystemClock};

/// Where a damage index came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Provenance {
    /// No credentials configured; the network was never touched.
    Simulated,
    /// Normalized from a live carbon intensity reading.
    Fetched { raw_gco2_per_kwh: f64 },
    /// The fetch was attempted and failed; the value is a random draw.
    FetchFailedFallback { reason: String },
}

impl Provenance {
    pub fn is_live(&self) -> bool {
        matches!(self, Provenance::Fetched { .. })
    }
}

/// One observation of the damage index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexReading {
    pub index: DamageIndex,
    pub provenance: Provenance,
    pub observed_at: DateTime<Utc>,
}

impl IndexReading {
    pub fn new(index: DamageIndex, provenance: Provenance, observed_at: DateTime<Utc>) -> Self {
        Self {
            index,
            provenance,
            observed_at,
        }
    }
}

/// Source of damage index readings.
///
/// Implementations must not fail and must not cache: every call is a fresh
/// observation.
pub trait IndexProvider {
    fn read_index(&mut self) -> IndexReading;
}

impl<P: IndexProvider + ?Sized> IndexProvider for Box<P> {
    fn read_index(&mut self) -> IndexReading {
        (**self).read_index()
    }
}

/// Replays a fixed sequence of index values, repeating the last one once the
/// sequence is exhausted. An empty script always yields the worst case.
pub struct ScriptedProvider {
    values: Vec<f64>,
    cursor: usize,
    clock: Box<dyn Clock>,
}

impl ScriptedProvider {
    pub fn new(values: impl Into<Vec<f64>>) -> Self {
        Self {
            values: values.into(),
            cursor: 0,
            clock: Box::new(SystemClock),
        }
    }

    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    /// Number of reads served so far.
    pub fn reads(&self) -> usize {
        self.cursor
    }
}

impl IndexProvider for ScriptedProvider {
    fn read_index(&mut self) -> IndexReading {
        let value = self
            .values
            .get(self.cursor)
            .or_else(|| self.values.last())
            .copied()
            .unwrap_or(1.0);
        self.cursor += 1;
        IndexReading::new(DamageIndex::new(value), Provenance::Simulated, self.clock.now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scripted_provider_replays_then_repeats_last() {
        let mut provider = ScriptedProvider::new(vec![0.5, 0.2]);
        assert_eq!(provider.read_index().index.value(), 0.5);
        assert_eq!(provider.read_index().index.value(), 0.2);
        assert_eq!(provider.read_index().index.value(), 0.2);
        assert_eq!(provider.reads(), 3);
    }

    #[test]
    fn scripted_provider_clamps_values() {
        let mut provider = ScriptedProvider::new(vec![4.0, -1.0]);
        assert_eq!(provider.read_index().index, DamageIndex::MAX);
        assert_eq!(provider.read_index().index, DamageIndex::MIN);
    }

    #[test]
    fn empty_script_is_worst_case() {
        let mut provider = ScriptedProvider::new(Vec::new());
        assert_eq!(provider.read_index().index, DamageIndex::MAX);
    }

    #[test]
    fn provenance_serializes_with_kind_tag() {
        let json = serde_json::to_value(Provenance::Fetched {
            raw_gco2_per_kwh: 120.0,
        })
        .unwrap();
        assert_eq!(json["kind"], "fetched");
        assert_eq!(json["raw_gco2_per_kwh"], 120.0);
    }
}
