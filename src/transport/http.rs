//! HTTP client for the inference service.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use tracing::debug;

use super::{
    decode_json, malformed, ApplyActionRequest, ApplyActionResponse, InferenceClient,
    OptimizeRequest, OptimizeResponse, MAX_RESPONSE_JSON_BYTES, OPTIMIZE_PATH, SIMULATE_TURN_PATH,
};
use crate::config::ClientConfig;
use crate::error::TransportError;

/// Header carrying the optional demo API key.
pub const API_KEY_HEADER: &str = "X-API-Key";

fn connection_failed(err: &reqwest::Error) -> TransportError {
    TransportError::ConnectionFailed {
        message: err.to_string(),
    }
}

/// Builds a `reqwest` client honoring the configured timeout.
pub(crate) fn build_client(config: &ClientConfig) -> Result<Client, TransportError> {
    Client::builder()
        .timeout(config.timeout)
        .build()
        .map_err(|e| TransportError::ConnectionFailed {
            message: format!("failed to create HTTP client: {e}"),
        })
}

/// Reads at most `limit` body bytes; a longer body is malformed.
///
/// A declared `Content-Length` over the limit is refused before any of the
/// body is read.
async fn read_capped(mut response: Response, limit: usize) -> Result<Vec<u8>, TransportError> {
    if let Some(declared) = response.content_length() {
        if declared > u64::try_from(limit).unwrap_or(u64::MAX) {
            return Err(malformed(format!(
                "response of {declared} bytes exceeds maximum size"
            )));
        }
    }
    let mut body = Vec::new();
    while let Some(chunk) = response.chunk().await.map_err(|e| connection_failed(&e))? {
        if body.len() + chunk.len() > limit {
            return Err(malformed("response exceeds maximum size"));
        }
        body.extend_from_slice(&chunk);
    }
    Ok(body)
}

/// Sends a request and decodes a successful JSON body.
///
/// Non-2xx answers become `TransportError::Status` carrying the body text.
pub(crate) async fn send_json<T: DeserializeOwned>(
    request: RequestBuilder,
) -> Result<T, TransportError> {
    let response: Response = request.send().await.map_err(|e| connection_failed(&e))?;
    let status = response.status();
    if !status.is_success() {
        let body = read_capped(response, MAX_RESPONSE_JSON_BYTES)
            .await
            .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
            .unwrap_or_default();
        return Err(TransportError::Status {
            status: status.as_u16(),
            body,
        });
    }
    let bytes = read_capped(response, MAX_RESPONSE_JSON_BYTES).await?;
    decode_json(&bytes)
}

/// [`InferenceClient`] over the service's JSON/HTTP API.
#[derive(Debug, Clone)]
pub struct HttpInferenceClient {
    client: Client,
    config: ClientConfig,
}

impl HttpInferenceClient {
    /// Creates a client for the given endpoint configuration.
    pub fn new(config: ClientConfig) -> Result<Self, TransportError> {
        Ok(Self {
            client: build_client(&config)?,
            config,
        })
    }

    /// Creates a client from `ADOSIM_*` environment variables.
    pub fn from_env() -> Result<Self, TransportError> {
        Self::new(ClientConfig::from_env())
    }

    fn post(&self, path: &str) -> RequestBuilder {
        let builder = self.client.post(self.config.url(path));
        match &self.config.api_key {
            Some(key) => builder.header(API_KEY_HEADER, key),
            None => builder,
        }
    }
}

#[async_trait]
impl InferenceClient for HttpInferenceClient {
    async fn apply_action(
        &self,
        request: &ApplyActionRequest,
    ) -> Result<ApplyActionResponse, TransportError> {
        debug!(action_id = %request.chosen_action_id, "POST {}", SIMULATE_TURN_PATH);
        send_json(self.post(SIMULATE_TURN_PATH).json(request)).await
    }

    async fn optimize(&self, request: &OptimizeRequest) -> Result<OptimizeResponse, TransportError> {
        debug!(budget = request.available_budget, "POST {}", OPTIMIZE_PATH);
        send_json(self.post(OPTIMIZE_PATH).json(request)).await
    }
}
