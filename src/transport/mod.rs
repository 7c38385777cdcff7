//! Request/response contracts for the external inference service.
//!
//! The session never computes posteriors, expected loss or ROI itself. It
//! hands the current beliefs to an [`InferenceClient`] and reconciles what
//! comes back. Payloads are JSON with snake_case field names; required
//! numeric fields have no serde defaults, so a response that omits one fails
//! to decode instead of silently reading as zero.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};

use crate::belief::BeliefVector;
use crate::error::TransportError;
use crate::hypothesis::HypothesisId;
use crate::scenario::Action;

#[cfg(feature = "transport-http")]
pub mod http;

#[cfg(feature = "transport-http")]
pub use http::HttpInferenceClient;

// ----------------------------------------------------------------------------
// Limits
// ----------------------------------------------------------------------------

/// Maximum size of a response JSON payload.
pub const MAX_RESPONSE_JSON_BYTES: usize = 1024 * 1024; // 1 MiB

/// Endpoint applying one defensive action.
pub const SIMULATE_TURN_PATH: &str = "/simulate_turn";
/// Endpoint ranking actions for a budget.
pub const OPTIMIZE_PATH: &str = "/optimize_deception";
/// Endpoint serving the active scenario.
pub const SCENARIO_PATH: &str = "/scenario";

/// Apply-action request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplyActionRequest {
    /// Action to apply.
    pub chosen_action_id: String,
    /// Beliefs before the action.
    pub current_beliefs: BeliefVector,
}

/// Apply-action response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplyActionResponse {
    /// Posterior beliefs, not necessarily normalized.
    pub updated_beliefs: BeliefVector,
    /// Expected loss before the action.
    pub expected_loss_before: f64,
    /// Expected loss after the action.
    pub expected_loss_after: f64,
    /// Return on the action's cost.
    pub roi: f64,
    /// Human-readable explanation.
    #[serde(default)]
    pub rationale_summary: String,
    /// Per-hypothesis likelihood of the observed evidence.
    #[serde(default)]
    pub evidence: BTreeMap<HypothesisId, f64>,
    /// The action as the service understood it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action_taken: Option<serde_json::Value>,
}

impl ApplyActionResponse {
    /// Checks the fields a turn cannot advance without.
    ///
    /// # Errors
    /// `MalformedResponse` if a numeric field is not finite or the updated
    /// beliefs carry no positive mass.
    pub fn validate(&self) -> Result<(), TransportError> {
        for (field, value) in [
            ("expected_loss_before", self.expected_loss_before),
            ("expected_loss_after", self.expected_loss_after),
            ("roi", self.roi),
        ] {
            if !value.is_finite() {
                return Err(malformed(format!("{field} is not a finite number")));
            }
        }
        if self.updated_beliefs.is_empty() {
            return Err(malformed("updated_beliefs is empty"));
        }
        if !BeliefVector::normalize(&self.updated_beliefs).is_settled() {
            return Err(malformed(format!(
                "updated_beliefs has no positive mass (sum {})",
                self.updated_beliefs.sum()
            )));
        }
        Ok(())
    }
}

/// Optimize request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizeRequest {
    /// Beliefs before the action.
    pub current_beliefs: BeliefVector,
    /// Spending limit for the recommendation.
    pub available_budget: f64,
}

/// Analysis attached to an optimizer recommendation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizationAnalysis {
    /// Return on the action's cost.
    pub roi: f64,
    /// Expected loss removed by the action.
    pub expected_loss_reduction: f64,
    /// Expected loss now.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_loss_before: Option<f64>,
    /// Expected loss after the action.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_loss_after: Option<f64>,
    /// Beliefs the action would lead to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_beliefs: Option<BeliefVector>,
    /// Optimizer explanation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rationale: Option<String>,
}

/// Optimize response.
///
/// `best_action_id` is null when no action fits the budget; the service then
/// sends a `message` instead of an analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizeResponse {
    /// Recommended action; must be present, `null` when nothing is affordable.
    #[serde(deserialize_with = "required_nullable")]
    pub best_action_id: Option<String>,
    /// Full definition of the recommended action.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub best_action: Option<Action>,
    /// Numbers behind the recommendation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analysis: Option<OptimizationAnalysis>,
    /// Why nothing was recommended.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Budget the service considered.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub available_budget: Option<f64>,
}

// serde treats a missing `Option` field as `None`; routing it through
// `deserialize_with` makes the key mandatory while still accepting `null`.
fn required_nullable<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer)
}

/// The inference/optimization collaborator.
///
/// Implementations perform exactly one request per call and never retry.
#[async_trait]
pub trait InferenceClient: Send + Sync {
    /// Submits one defensive action with the current beliefs.
    async fn apply_action(
        &self,
        request: &ApplyActionRequest,
    ) -> Result<ApplyActionResponse, TransportError>;

    /// Asks for the best action affordable within a budget.
    async fn optimize(&self, request: &OptimizeRequest) -> Result<OptimizeResponse, TransportError>;
}

pub(crate) fn malformed(reason: impl Into<String>) -> TransportError {
    TransportError::MalformedResponse {
        reason: reason.into(),
    }
}

/// Decodes a JSON response body with a size cap.
///
/// # Errors
/// `MalformedResponse` for empty, oversized or undecodable bodies.
pub fn decode_json<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, TransportError> {
    if bytes.is_empty() {
        return Err(malformed("empty response body"));
    }
    if bytes.len() > MAX_RESPONSE_JSON_BYTES {
        return Err(malformed("response exceeds maximum size"));
    }
    serde_json::from_slice(bytes).map_err(|e| malformed(format!("invalid JSON: {e}")))
}
