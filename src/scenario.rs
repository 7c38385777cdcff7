//! Scenario definition: assets, threats, defensive actions and the attacker profile.
//!
//! A scenario is static input. It is loaded once by the catalog, validated,
//! and then owned read-only by a [`SimulationSession`](crate::SimulationSession).

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::belief::BeliefVector;
use crate::error::ValidationError;
use crate::hypothesis::HypothesisId;

/// An asset the defender protects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Asset {
    /// Unique asset id.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Monetary value at risk.
    pub value: f64,
    /// Known vulnerability, usually a CVE id.
    pub vulnerability: String,
}

/// A threat; its id doubles as the hypothesis id tracked by the belief vector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Threat {
    /// Hypothesis id.
    pub id: HypothesisId,
    /// Display name, used as the hypothesis label.
    pub name: String,
    /// Prior likelihood; normalized when used as a prior.
    pub probability: f64,
    /// Loss if the threat succeeds.
    pub impact: f64,
    /// Free-text description.
    #[serde(default)]
    pub description: String,
}

/// A defensive action the defender can take once per turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    /// Id the defender submits.
    pub id: String,
    /// Display name.
    pub name: String,
    /// What the action costs to take.
    pub cost: f64,
    /// Free-text description.
    #[serde(default)]
    pub description: String,
    /// Per-hypothesis effectiveness in `[0, 1]`.
    #[serde(default)]
    pub effectiveness: BTreeMap<HypothesisId, f64>,
    /// How strongly the action misleads the attacker.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deception_factor: Option<f64>,
    /// Extra detection the action buys.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub monitoring_boost: Option<f64>,
}

/// Qualitative profile of the modeled attacker.
///
/// Every field is optional on the wire; absent values fall back to defaults
/// when the attacker mind snapshot is derived.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AttackerProfile {
    /// Skill level, e.g. "High".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sophistication: Option<String>,
    /// How long the attacker keeps at it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub persistence: Option<String>,
    /// Resources available to the attacker.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resources: Option<String>,
    /// What the attacker is after.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub motivation: Option<String>,
}

/// A complete simulation scenario.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    /// Scenario title.
    pub title: String,
    /// Free-text briefing.
    #[serde(default)]
    pub description: String,
    /// Protected assets.
    #[serde(default)]
    pub assets: Vec<Asset>,
    /// Threats, one per hypothesis.
    #[serde(default)]
    pub threats: Vec<Threat>,
    /// Actions the defender may take; at least one.
    pub actions: Vec<Action>,
    /// Attacker profile; defaults when absent.
    #[serde(default)]
    pub attacker_profile: AttackerProfile,
}

fn check_finite(field: impl Into<String>, value: f64) -> Result<(), ValidationError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(ValidationError::NonFiniteValue {
            field: field.into(),
            value,
        })
    }
}

fn check_non_negative(field: impl Into<String>, value: f64) -> Result<(), ValidationError> {
    let field = field.into();
    check_finite(field.clone(), value)?;
    if value < 0.0 {
        return Err(ValidationError::NegativeValue { field, value });
    }
    Ok(())
}

impl Scenario {
    /// Parses a scenario from JSON bytes.
    pub fn from_json_slice(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }

    /// Checks structural invariants the session relies on.
    ///
    /// # Errors
    /// - `MissingField` if the title is blank
    /// - `NoActions` if the action set is empty
    /// - `DuplicateId` for repeated action, threat or asset ids
    /// - `NonFiniteValue` / `NegativeValue` for bad numbers
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.title.trim().is_empty() {
            return Err(ValidationError::MissingField {
                field: "title".to_string(),
            });
        }
        if self.actions.is_empty() {
            return Err(ValidationError::NoActions);
        }

        let mut seen = HashSet::new();
        for action in &self.actions {
            if action.id.trim().is_empty() {
                return Err(ValidationError::MissingField {
                    field: "actions[].id".to_string(),
                });
            }
            if !seen.insert(action.id.as_str()) {
                return Err(ValidationError::DuplicateId {
                    kind: "action",
                    id: action.id.clone(),
                });
            }
            check_non_negative(format!("actions[{}].cost", action.id), action.cost)?;
            for (h, e) in &action.effectiveness {
                check_finite(format!("actions[{}].effectiveness[{h}]", action.id), *e)?;
            }
        }

        let mut seen = HashSet::new();
        for threat in &self.threats {
            if !seen.insert(threat.id.as_str()) {
                return Err(ValidationError::DuplicateId {
                    kind: "threat",
                    id: threat.id.to_string(),
                });
            }
            check_non_negative(format!("threats[{}].probability", threat.id), threat.probability)?;
            check_non_negative(format!("threats[{}].impact", threat.id), threat.impact)?;
        }

        let mut seen = HashSet::new();
        for asset in &self.assets {
            if !seen.insert(asset.id.as_str()) {
                return Err(ValidationError::DuplicateId {
                    kind: "asset",
                    id: asset.id.clone(),
                });
            }
            check_non_negative(format!("assets[{}].value", asset.id), asset.value)?;
        }

        Ok(())
    }

    /// Looks up an action by id.
    #[must_use]
    pub fn action(&self, id: &str) -> Option<&Action> {
        self.actions.iter().find(|a| a.id == id)
    }

    /// Looks up a threat by hypothesis id.
    #[must_use]
    pub fn threat(&self, id: &str) -> Option<&Threat> {
        self.threats.iter().find(|t| t.id.as_str() == id)
    }

    /// Hypotheses declared by the scenario (one per threat).
    pub fn hypotheses(&self) -> impl Iterator<Item = &HypothesisId> {
        self.threats.iter().map(|t| &t.id)
    }

    /// Raw prior built from the threat probabilities (not normalized).
    #[must_use]
    pub fn threat_prior(&self) -> BeliefVector {
        self.threats
            .iter()
            .map(|t| (t.id.clone(), t.probability))
            .collect()
    }

    /// Display name for a hypothesis, falling back to the raw id.
    #[must_use]
    pub fn hypothesis_label(&self, id: &HypothesisId) -> String {
        self.threat(id.as_str())
            .map_or_else(|| id.to_string(), |t| t.name.clone())
    }
}
