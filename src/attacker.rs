//! Display-only summary of the modeled attacker's state of mind.

use serde::{Deserialize, Serialize};

use crate::belief::BeliefVector;
use crate::scenario::Scenario;

/// Sophistication used when the scenario's attacker profile omits it.
pub const DEFAULT_SOPHISTICATION: &str = "High";

const DEFAULT_FOCUS: &str = "Analyzing targets";
const DEFAULT_STATE: &str = "Calculating optimal attack vector";
const DEFAULT_FACTORS: [&str; 3] = [
    "Asset Value",
    "Detection Difficulty",
    "Success Probability",
];

/// Snapshot shown alongside the belief chart.
///
/// Derived once when the session is initialized and restored verbatim on
/// reset; turn results do not update it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttackerMindState {
    /// Attacker skill level from the scenario profile.
    pub sophistication: String,
    /// Threat the attacker is believed to be pursuing.
    pub current_focus: String,
    /// What drives the attacker's choices.
    pub decision_factors: Vec<String>,
    /// Free-text state shown to the defender.
    pub psychological_state: String,
}

impl AttackerMindState {
    /// Derives the snapshot from the scenario profile and the starting beliefs.
    ///
    /// The focus is the name of the threat the prior weights most heavily.
    #[must_use]
    pub fn derive(scenario: &Scenario, prior: &BeliefVector) -> Self {
        let sophistication = scenario
            .attacker_profile
            .sophistication
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(DEFAULT_SOPHISTICATION)
            .to_string();

        let current_focus = prior
            .most_likely()
            .map_or_else(|| DEFAULT_FOCUS.to_string(), |(id, _)| scenario.hypothesis_label(id));

        Self {
            sophistication,
            current_focus,
            decision_factors: DEFAULT_FACTORS.iter().map(|s| (*s).to_string()).collect(),
            psychological_state: DEFAULT_STATE.to_string(),
        }
    }
}
