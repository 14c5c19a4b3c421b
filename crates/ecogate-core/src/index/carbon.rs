//! Carbon intensity provider backed by the electricityMap HTTP API.

use rand::{Rng, RngCore, SeedableRng};
use rand_pcg::Pcg64;
use reqwest::blocking::Client;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};
use url::Url;

use super::damage::{normalize, DamageIndex};
use super::provider::{IndexProvider, IndexReading, Provenance};
use crate::config::CarbonConfig;
use crate::decision_log::{Clock, SystemClock};

/// Environment variable holding the API access token.
pub const TOKEN_ENV: &str = "ELECTRICITY_MAP_TOKEN";
/// Environment variable overriding the configured zone.
pub const CARBON_ZONE_ENV: &str = "CARBON_ZONE";

const AUTH_HEADER: &str = "auth-token";
const INTENSITY_FIELD: &str = "carbonIntensity.gCO2eqPerkWh";

/// Why a live carbon intensity reading could not be obtained.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("invalid endpoint: {0}")]
    Endpoint(#[from] url::ParseError),

    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("HTTP {0}")]
    Status(u16),

    #[error("malformed response body: {0}")]
    Body(#[source] reqwest::Error),

    #[error("missing or non-numeric field '{0}'")]
    MissingField(&'static str),
}

pub struct CarbonIntensityProvider {
    settings: CarbonConfig,
    token: Option<String>,
    client: Option<Client>,
    rng: Box<dyn RngCore + Send>,
    clock: Box<dyn Clock>,
}

impl CarbonIntensityProvider {
    /// An empty token is treated the same as no token.
    pub fn new(settings: CarbonConfig, token: Option<String>) -> Self {
        Self {
            settings,
            token: token.filter(|t| !t.trim().is_empty()),
            client: None,
            rng: Box::new(Pcg64::from_entropy()),
            clock: Box::new(SystemClock),
        }
    }

    /// Build from configuration, reading the token and zone override from the
    /// process environment.
    pub fn from_env(mut settings: CarbonConfig) -> Self {
        if let Ok(zone) = std::env::var(CARBON_ZONE_ENV) {
            if !zone.trim().is_empty() {
                settings.zone = zone;
            }
        }
        Self::new(settings, std::env::var(TOKEN_ENV).ok())
    }

    pub fn with_rng(mut self, rng: impl RngCore + Send + 'static) -> Self {
        self.rng = Box::new(rng);
        self
    }

    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    pub fn has_token(&self) -> bool {
        self.token.is_some()
    }

    pub fn zone(&self) -> &str {
        &self.settings.zone
    }

    fn client(&mut self) -> Result<&Client, FetchError> {
        let client = match self.client.take() {
            Some(client) => client,
            None => {
                let mut builder = Client::builder();
                if let Some(secs) = self.settings.request_timeout_secs {
                    builder = builder.timeout(Duration::from_secs(secs));
                }
                builder.build()?
            }
        };
        Ok(self.client.insert(client))
    }

    /// Fetch the raw intensity in gCO2eq/kWh.
    fn fetch(&mut self, token: &str) -> Result<f64, FetchError> {
        let url = Url::parse_with_params(
            &self.settings.endpoint,
            &[("zone", self.settings.zone.as_str())],
        )?;
        debug!(%url, "requesting carbon intensity");

        let resp = self.client()?.get(url).header(AUTH_HEADER, token).send()?;
        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        let body: Value = resp.json().map_err(FetchError::Body)?;
        extract_intensity(&body)
    }

    fn random_index(&mut self) -> DamageIndex {
        DamageIndex::new(self.rng.gen_range(0.0..=1.0))
    }
}

fn extract_intensity(body: &Value) -> Result<f64, FetchError> {
    body.get("carbonIntensity")
        .and_then(|c| c.get("gCO2eqPerkWh"))
        .and_then(Value::as_f64)
        .ok_or(FetchError::MissingField(INTENSITY_FIELD))
}

impl IndexProvider for CarbonIntensityProvider {
    fn read_index(&mut self) -> IndexReading {
        let observed_at = self.clock.now();

        let Some(token) = self.token.clone() else {
            debug!("no carbon token configured, simulating damage index");
            return IndexReading::new(self.random_index(), Provenance::Simulated, observed_at);
        };

        match self.fetch(&token) {
            Ok(raw) => {
                let index = DamageIndex::new(normalize(
                    raw,
                    self.settings.min_gco2,
                    self.settings.max_gco2,
                ));
                debug!(zone = %self.settings.zone, raw, %index, "fetched carbon intensity");
                IndexReading::new(
                    index,
                    Provenance::Fetched {
                        raw_gco2_per_kwh: raw,
                    },
                    observed_at,
                )
            }
            Err(err) => {
                warn!(zone = %self.settings.zone, error = %err, "failed to fetch carbon intensity, using simulated index");
                IndexReading::new(
                    self.random_index(),
                    Provenance::FetchFailedFallback {
                        reason: err.to_string(),
                    },
                    observed_at,
                )
            }
        }
    }
}
