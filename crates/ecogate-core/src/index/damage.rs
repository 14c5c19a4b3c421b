use serde::{Deserialize, Serialize};
use std::fmt;

/// Normalized environmental cost of computing now. Lower is better.
///
/// Always within [0, 1]; the constructor clamps whatever it is given.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(from = "f64", into = "f64")]
pub struct DamageIndex(f64);

impl DamageIndex {
    pub const MIN: DamageIndex = DamageIndex(0.0);
    pub const MAX: DamageIndex = DamageIndex(1.0);

    /// Clamp `value` into [0, 1]. NaN is treated as the worst case.
    pub fn new(value: f64) -> Self {
        if value.is_nan() {
            return Self::MAX;
        }
        Self(value.clamp(0.0, 1.0))
    }

    pub fn value(self) -> f64 {
        self.0
    }
}

impl From<f64> for DamageIndex {
    fn from(value: f64) -> Self {
        Self::new(value)
    }
}

impl From<DamageIndex> for f64 {
    fn from(index: DamageIndex) -> Self {
        index.0
    }
}

impl fmt::Display for DamageIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.4}", self.0)
    }
}

/// Map `value` from `[min, max]` onto `[0, 1]`, clamping out-of-range input.
///
/// A degenerate range (`max <= min`) acts as a step at `min`.
pub fn normalize(value: f64, min: f64, max: f64) -> f64 {
    if max <= min {
        return if value <= min { 0.0 } else { 1.0 };
    }
    ((value - min) / (max - min)).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn normalize_reference_points() {
        assert_eq!(normalize(-100.0, 0.0, 800.0), 0.0);
        assert_eq!(normalize(1000.0, 0.0, 800.0), 1.0);
        assert_eq!(normalize(400.0, 0.0, 800.0), 0.5);
        assert_eq!(normalize(0.0, 0.0, 800.0), 0.0);
        assert_eq!(normalize(800.0, 0.0, 800.0), 1.0);
    }

    #[test]
    fn normalize_degenerate_range() {
        assert_eq!(normalize(5.0, 10.0, 10.0), 0.0);
        assert_eq!(normalize(11.0, 10.0, 10.0), 1.0);
    }

    #[test]
    fn damage_index_clamps() {
        assert_eq!(DamageIndex::new(-0.2).value(), 0.0);
        assert_eq!(DamageIndex::new(1.7).value(), 1.0);
        assert_eq!(DamageIndex::new(0.25).value(), 0.25);
        assert_eq!(DamageIndex::new(f64::NAN), DamageIndex::MAX);
    }

    #[test]
    fn damage_index_displays_four_decimals() {
        assert_eq!(DamageIndex::new(0.5).to_string(), "0.5000");
        assert_eq!(DamageIndex::new(0.123456).to_string(), "0.1235");
    }

    #[test]
    fn damage_index_deserializes_clamped() {
        let index: DamageIndex = serde_json::from_str("3.5").unwrap();
        assert_eq!(index, DamageIndex::MAX);
        assert_eq!(serde_json::to_string(&DamageIndex::new(0.25)).unwrap(), "0.25");
    }

    proptest! {
        #[test]
        fn normalize_stays_in_unit_interval(v in -1.0e6f64..1.0e6) {
            let n = normalize(v, 0.0, 800.0);
            prop_assert!((0.0..=1.0).contains(&n));
        }

        #[test]
        fn normalize_is_monotonic(a in -2000.0f64..2000.0, b in -2000.0f64..2000.0) {
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            prop_assert!(normalize(lo, 0.0, 800.0) <= normalize(hi, 0.0, 800.0));
        }

        #[test]
        fn damage_index_always_in_range(v in proptest::num::f64::ANY) {
            let index = DamageIndex::new(v).value();
            prop_assert!((0.0..=1.0).contains(&index));
        }
    }
}
