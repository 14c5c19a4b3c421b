//! Damage index acquisition.
//!
//! The provider contract is deliberately infallible: every read produces a
//! value in [0, 1] together with a [`Provenance`] describing where it came from.

mod carbon;
mod damage;
mod provider;

pub use carbon::{CarbonIntensityProvider, FetchError, CARBON_ZONE_ENV, TOKEN_ENV};
pub use damage::{normalize, DamageIndex};
pub use provider::{IndexProvider, IndexReading, Provenance, ScriptedProvider};
