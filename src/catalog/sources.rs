//! Concrete scenario sources.

use std::path::PathBuf;

use async_trait::async_trait;

use super::ScenarioSource;
use crate::error::TransportError;
use crate::scenario::Scenario;
use crate::transport::decode_json;

/// Reference APT scenario shipped with the crate.
pub const BUNDLED_SCENARIO_JSON: &str = include_str!("../../assets/scenario.json");

/// The scenario compiled into the crate.
#[derive(Debug, Clone)]
pub struct BundledScenarioSource {
    json: &'static str,
}

impl Default for BundledScenarioSource {
    fn default() -> Self {
        Self {
            json: BUNDLED_SCENARIO_JSON,
        }
    }
}

impl BundledScenarioSource {
    /// Serves arbitrary static JSON instead of the reference scenario.
    #[must_use]
    pub const fn from_static(json: &'static str) -> Self {
        Self { json }
    }
}

#[async_trait]
impl ScenarioSource for BundledScenarioSource {
    fn name(&self) -> &str {
        "bundled"
    }

    async fn fetch(&self) -> Result<Scenario, TransportError> {
        decode_json(self.json.as_bytes())
    }
}

/// A scenario JSON file on local disk.
#[derive(Debug, Clone)]
pub struct FileScenarioSource {
    path: PathBuf,
    name: String,
}

impl FileScenarioSource {
    /// Source reading the given file on every fetch.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = format!("file:{}", path.display());
        Self { path, name }
    }
}

#[async_trait]
impl ScenarioSource for FileScenarioSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch(&self) -> Result<Scenario, TransportError> {
        let bytes = tokio::fs::read(&self.path)
            .await
            .map_err(|e| TransportError::Io {
                path: self.path.display().to_string(),
                message: e.to_string(),
            })?;
        decode_json(&bytes)
    }
}

#[cfg(feature = "transport-http")]
pub use http_source::HttpScenarioSource;

#[cfg(feature = "transport-http")]
mod http_source {
    use async_trait::async_trait;
    use reqwest::Client;

    use super::ScenarioSource;
    use crate::config::ClientConfig;
    use crate::error::TransportError;
    use crate::scenario::Scenario;
    use crate::transport::http::{build_client, send_json, API_KEY_HEADER};
    use crate::transport::SCENARIO_PATH;

    /// `GET {base_url}/scenario` on the inference service.
    #[derive(Debug, Clone)]
    pub struct HttpScenarioSource {
        client: Client,
        config: ClientConfig,
    }

    impl HttpScenarioSource {
        /// Creates the source for the configured service.
        pub fn new(config: ClientConfig) -> Result<Self, TransportError> {
            Ok(Self {
                client: build_client(&config)?,
                config,
            })
        }
    }

    #[async_trait]
    impl ScenarioSource for HttpScenarioSource {
        fn name(&self) -> &str {
            "http"
        }

        async fn fetch(&self) -> Result<Scenario, TransportError> {
            let mut request = self.client.get(self.config.url(SCENARIO_PATH));
            if let Some(key) = &self.config.api_key {
                request = request.header(API_KEY_HEADER, key);
            }
            send_json(request).await
        }
    }
}
