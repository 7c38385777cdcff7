//! Scenario catalog: resolves the active scenario from a primary source with
//! a single-shot fallback.
//!
//! The fallback path is degraded mode, not a retry loop. Once the primary
//! has failed, it is not contacted again by this loader.

pub mod sources;

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{ScenarioError, SimError, SimResult, TransportError};
use crate::scenario::Scenario;

pub use sources::{BundledScenarioSource, FileScenarioSource};
#[cfg(feature = "transport-http")]
pub use sources::HttpScenarioSource;

/// Somewhere a scenario can be fetched from.
#[async_trait]
pub trait ScenarioSource: Send + Sync {
    /// Short label used in logs and errors.
    fn name(&self) -> &str;

    /// Fetches and decodes the scenario. One attempt, no retry.
    async fn fetch(&self) -> Result<Scenario, TransportError>;
}

/// Which source produced the active scenario.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScenarioOrigin {
    /// The primary source answered.
    Primary,
    /// Degraded/offline mode.
    Fallback,
}

/// A validated scenario plus where it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedScenario {
    /// The validated scenario.
    pub scenario: Scenario,
    /// Which source produced it.
    pub origin: ScenarioOrigin,
}

impl LoadedScenario {
    /// True when the scenario came from the fallback source.
    #[must_use]
    pub fn is_degraded(&self) -> bool {
        self.origin == ScenarioOrigin::Fallback
    }
}

/// Primary-then-fallback scenario loader.
#[derive(Clone)]
pub struct ScenarioCatalogLoader {
    primary: Arc<dyn ScenarioSource>,
    fallback: Arc<dyn ScenarioSource>,
}

impl std::fmt::Debug for ScenarioCatalogLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScenarioCatalogLoader")
            .field("primary", &self.primary.name())
            .field("fallback", &self.fallback.name())
            .finish()
    }
}

async fn fetch_validated(source: &dyn ScenarioSource) -> Result<Scenario, ScenarioError> {
    let scenario = source
        .fetch()
        .await
        .map_err(|cause| ScenarioError::SourceFailed {
            source_name: source.name().to_string(),
            cause,
        })?;
    scenario.validate().map_err(|cause| ScenarioError::Invalid {
        source_name: source.name().to_string(),
        cause,
    })?;
    Ok(scenario)
}

impl ScenarioCatalogLoader {
    /// Loader trying `primary` first and `fallback` once after it.
    #[must_use]
    pub fn new(primary: Arc<dyn ScenarioSource>, fallback: Arc<dyn ScenarioSource>) -> Self {
        Self { primary, fallback }
    }

    /// Loader that only has the scenario compiled into the crate.
    ///
    /// Useful offline; the "primary" and "fallback" are the same bundled data.
    #[must_use]
    pub fn bundled_only() -> Self {
        let bundled: Arc<dyn ScenarioSource> = Arc::new(BundledScenarioSource::default());
        Self::new(bundled.clone(), bundled)
    }

    /// Resolves the active scenario.
    ///
    /// # Errors
    /// `ScenarioUnavailable` when both sources fail or return invalid data.
    pub async fn load(&self) -> SimResult<LoadedScenario> {
        let primary_err = match fetch_validated(self.primary.as_ref()).await {
            Ok(scenario) => {
                info!(source = self.primary.name(), title = %scenario.title, "scenario loaded");
                return Ok(LoadedScenario {
                    scenario,
                    origin: ScenarioOrigin::Primary,
                });
            }
            Err(e) => e,
        };

        warn!(
            source = self.primary.name(),
            error = %primary_err,
            fallback = self.fallback.name(),
            "primary scenario source failed; using fallback"
        );

        match fetch_validated(self.fallback.as_ref()).await {
            Ok(scenario) => {
                info!(
                    source = self.fallback.name(),
                    title = %scenario.title,
                    "scenario loaded in offline mode"
                );
                Ok(LoadedScenario {
                    scenario,
                    origin: ScenarioOrigin::Fallback,
                })
            }
            Err(fallback_err) => {
                warn!(error = %fallback_err, "fallback scenario source failed");
                Err(SimError::ScenarioUnavailable {
                    primary: primary_err,
                    fallback: fallback_err,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    struct Failing {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl ScenarioSource for Failing {
        fn name(&self) -> &str {
            "failing"
        }

        async fn fetch(&self) -> Result<Scenario, TransportError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(TransportError::Status {
                status: 503,
                body: String::new(),
            })
        }
    }

    #[tokio::test]
    async fn test_bundled_only_loads_from_primary() {
        let loaded = ScenarioCatalogLoader::bundled_only().load().await.unwrap();
        assert_eq!(loaded.origin, ScenarioOrigin::Primary);
        assert!(!loaded.is_degraded());
        assert_eq!(loaded.scenario.actions.len(), 3);
    }

    #[tokio::test]
    async fn test_primary_failure_uses_fallback_once() {
        let primary = Arc::new(Failing {
            calls: AtomicUsize::new(0),
        });
        let loader = ScenarioCatalogLoader::new(
            primary.clone(),
            Arc::new(BundledScenarioSource::default()),
        );
        let loaded = loader.load().await.unwrap();
        assert!(loaded.is_degraded());
        assert_eq!(primary.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_both_failing_is_scenario_unavailable() {
        let primary = Arc::new(Failing {
            calls: AtomicUsize::new(0),
        });
        let fallback = Arc::new(Failing {
            calls: AtomicUsize::new(0),
        });
        let loader = ScenarioCatalogLoader::new(primary.clone(), fallback.clone());
        let err = loader.load().await.unwrap_err();
        assert!(err.is_scenario_unavailable());
        assert_eq!(primary.calls.load(Ordering::SeqCst), 1);
        assert_eq!(fallback.calls.load(Ordering::SeqCst), 1);
    }
}
