//! Session and client configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::belief::{BeliefVector, MASS_TOLERANCE};
use crate::error::ValidationError;
use crate::scenario::Scenario;

/// Number of turns in the reference simulation.
pub const DEFAULT_TURN_LIMIT: u32 = 3;

/// Budget the reference front end offers the optimizer.
pub const DEFAULT_OPTIMIZATION_BUDGET: f64 = 100.0;

/// Environment variable naming the inference service base URL.
pub const API_URL_ENV: &str = "ADOSIM_API_URL";
/// Environment variable carrying the optional demo API key.
pub const API_KEY_ENV: &str = "ADOSIM_API_KEY";
/// Environment variable overriding the HTTP timeout, in seconds.
pub const TIMEOUT_ENV: &str = "ADOSIM_TIMEOUT_SECS";

const DEFAULT_API_URL: &str = "http://127.0.0.1:8000";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Where the session's starting beliefs come from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PriorSource {
    /// A fixed prior, normalized before use.
    Fixed {
        /// Raw prior mass per hypothesis.
        beliefs: BeliefVector,
    },
    /// The scenario's threat probabilities, normalized.
    Threats,
}

impl Default for PriorSource {
    fn default() -> Self {
        Self::Fixed {
            beliefs: BeliefVector::default_prior(),
        }
    }
}

impl PriorSource {
    /// Resolves the settled prior for a scenario.
    ///
    /// # Errors
    /// `DegenerateBeliefs` if the source carries no positive mass.
    pub fn resolve(&self, scenario: &Scenario) -> Result<BeliefVector, ValidationError> {
        let raw = match self {
            Self::Fixed { beliefs } => beliefs.clone(),
            Self::Threats => scenario.threat_prior(),
        };
        let settled = BeliefVector::normalize(&raw);
        if settled.is_empty() || !settled.is_settled() {
            return Err(ValidationError::DegenerateBeliefs { total: raw.sum() });
        }
        Ok(settled)
    }
}

/// Rules for one simulation session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Turns allowed before the session is complete.
    pub turn_limit: u32,
    /// Starting beliefs.
    pub prior: PriorSource,
    /// Allowed deviation of the belief mass from 1.0 before a warning is logged.
    pub mass_tolerance: f64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            turn_limit: DEFAULT_TURN_LIMIT,
            prior: PriorSource::default(),
            mass_tolerance: MASS_TOLERANCE,
        }
    }
}

impl SessionConfig {
    /// Validate configuration before a session is built from it.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.turn_limit == 0 {
            return Err(ValidationError::InvalidConfig {
                reason: "turn_limit must be > 0".to_string(),
            });
        }
        if !(self.mass_tolerance.is_finite() && self.mass_tolerance > 0.0) {
            return Err(ValidationError::InvalidConfig {
                reason: "mass_tolerance must be a positive finite number".to_string(),
            });
        }
        Ok(())
    }
}

/// Connection settings for the HTTP collaborators.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Service base URL, without a trailing slash.
    pub base_url: String,
    /// Sent as `X-API-Key` when set.
    pub api_key: Option<String>,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_URL.to_string(),
            api_key: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl ClientConfig {
    /// Config for an explicit base URL.
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            ..Self::default()
        }
    }

    /// Sets the API key.
    #[must_use]
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Sets the request timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Reads `ADOSIM_API_URL`, `ADOSIM_API_KEY` and `ADOSIM_TIMEOUT_SECS`.
    ///
    /// Unset or unparsable values keep their defaults.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = lookup(API_URL_ENV)
            .filter(|s| !s.trim().is_empty())
            .map_or_else(Self::default, Self::new);
        config.api_key = lookup(API_KEY_ENV).filter(|s| !s.is_empty());
        if let Some(secs) = lookup(TIMEOUT_ENV).and_then(|s| s.trim().parse::<u64>().ok()) {
            config.timeout = Duration::from_secs(secs);
        }
        config
    }

    /// Joins an endpoint path onto the base URL.
    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    #[test]
    fn test_session_default_is_valid() {
        let config = SessionConfig::default();
        config.validate().unwrap();
        assert_eq!(config.turn_limit, 3);
    }

    #[test]
    fn test_session_rejects_zero_limits() {
        let mut c = SessionConfig::default();
        c.turn_limit = 0;
        assert!(c.validate().is_err());

        let mut c = SessionConfig::default();
        c.mass_tolerance = 0.0;
        assert!(c.validate().is_err());
    }

    #[test]
    fn test_degenerate_fixed_prior_is_rejected() {
        let scenario: Scenario = serde_json::from_value(serde_json::json!({
            "title": "t",
            "actions": [{"id": "a", "name": "A", "cost": 1}]
        }))
        .unwrap();
        let prior = PriorSource::Fixed {
            beliefs: BeliefVector::from_pairs([("H1", 0.0)]),
        };
        assert!(matches!(
            prior.resolve(&scenario),
            Err(ValidationError::DegenerateBeliefs { .. })
        ));
        // No threats declared: nothing to build a prior from.
        assert!(PriorSource::Threats.resolve(&scenario).is_err());
    }

    #[test]
    fn test_client_from_lookup() {
        let vars: HashMap<&str, &str> = [
            (API_URL_ENV, "http://sim.local:9000/"),
            (API_KEY_ENV, "demo"),
            (TIMEOUT_ENV, "5"),
        ]
        .into_iter()
        .collect();
        let config = ClientConfig::from_lookup(|k| vars.get(k).map(|v| (*v).to_string()));
        assert_eq!(config.base_url, "http://sim.local:9000");
        assert_eq!(config.api_key.as_deref(), Some("demo"));
        assert_eq!(config.timeout, Duration::from_secs(5));
        assert_eq!(config.url("/scenario"), "http://sim.local:9000/scenario");
    }

    #[test]
    fn test_client_from_empty_lookup_uses_defaults() {
        let config = ClientConfig::from_lookup(|_| None);
        assert_eq!(config, ClientConfig::default());
    }
}
