//! Session state, snapshots and optimizer results.

use std::collections::VecDeque;
use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::attacker::AttackerMindState;
use crate::belief::BeliefVector;
use crate::error::{SimError, TransportError};
use crate::ledger::TurnLedger;
use crate::scenario::Scenario;
use crate::transport::{malformed, OptimizeResponse};

/// Stable identifier for a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(Uuid);

impl SessionId {
    /// Create a new random session ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Turn-progress state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    /// Fewer than `turn_limit` turns have completed.
    Active,
    /// The turn limit has been reached; only `reset` leaves this state.
    Complete,
}

impl SessionPhase {
    /// Phase for a turn counter under a limit.
    #[must_use]
    pub const fn for_turn(turn_index: u32, turn_limit: u32) -> Self {
        if turn_index >= turn_limit {
            Self::Complete
        } else {
            Self::Active
        }
    }
}

impl fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Active => write!(f, "active"),
            Self::Complete => write!(f, "complete"),
        }
    }
}

/// The optimizer's best pick for a budget.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    /// Recommended action id.
    pub action_id: String,
    /// Its display name.
    pub action_name: String,
    /// Its cost.
    pub cost: f64,
    /// ROI the optimizer expects.
    pub roi: f64,
    /// Loss reduction the optimizer expects.
    pub expected_loss_reduction: f64,
    /// Expected loss now, when reported.
    pub expected_loss_before: Option<f64>,
    /// Expected loss after the action, when reported.
    pub expected_loss_after: Option<f64>,
    /// Optimizer explanation, when given.
    pub rationale: Option<String>,
    /// Budget the recommendation fits in.
    pub budget: f64,
}

/// Last "what-if" answer from the optimizer. Not part of the ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OptimizationResult {
    /// Best affordable action.
    Recommendation(Recommendation),
    /// Nothing fits the budget.
    NoAffordableAction {
        /// Budget the service considered.
        budget: f64,
        /// The service's explanation.
        message: Option<String>,
    },
}

impl OptimizationResult {
    /// Interprets an optimizer response.
    ///
    /// When the response names an action but omits its details, the
    /// scenario's definition of that action is used.
    ///
    /// # Errors
    /// `MalformedResponse` if a recommendation lacks its analysis, names an
    /// unknown action, or carries non-finite numbers, or if no action is
    /// recommended and no message says why.
    pub fn from_response(
        response: OptimizeResponse,
        budget: f64,
        scenario: &Scenario,
    ) -> Result<Self, TransportError> {
        let Some(action_id) = response.best_action_id else {
            if response.message.is_none() {
                return Err(malformed(
                    "best_action_id is null but no message explains why",
                ));
            }
            return Ok(Self::NoAffordableAction {
                budget: response.available_budget.unwrap_or(budget),
                message: response.message,
            });
        };

        let (action_name, cost) = match (&response.best_action, scenario.action(&action_id)) {
            (Some(a), _) => (a.name.clone(), a.cost),
            (None, Some(a)) => (a.name.clone(), a.cost),
            (None, None) => {
                return Err(malformed(format!(
                    "best_action '{action_id}' is not described and unknown to the scenario"
                )))
            }
        };

        let analysis = response
            .analysis
            .ok_or_else(|| malformed("recommendation is missing its analysis"))?;
        for (field, value) in [
            ("analysis.roi", analysis.roi),
            ("analysis.expected_loss_reduction", analysis.expected_loss_reduction),
            ("best_action.cost", cost),
        ] {
            if !value.is_finite() {
                return Err(malformed(format!("{field} is not a finite number")));
            }
        }

        Ok(Self::Recommendation(Recommendation {
            action_id,
            action_name,
            cost,
            roi: analysis.roi,
            expected_loss_reduction: analysis.expected_loss_reduction,
            expected_loss_before: analysis.expected_loss_before,
            expected_loss_after: analysis.expected_loss_after,
            rationale: analysis.rationale,
            budget,
        }))
    }

    /// Line appended to the activity log.
    #[must_use]
    pub fn log_line(&self) -> String {
        match self {
            Self::Recommendation(r) => {
                format!("AI Optimization: Best action is {} (ROI={:.2})", r.action_name, r.roi)
            }
            Self::NoAffordableAction { budget, .. } => {
                format!("AI Optimization: No affordable actions available (budget={budget:.2})")
            }
        }
    }
}

/// Mutable part of a session. Only the session's own operations write it.
#[derive(Debug, Clone)]
pub(crate) struct SessionState {
    pub beliefs: BeliefVector,
    pub turn_index: u32,
    pub ledger: TurnLedger,
    pub expected_loss: f64,
    pub optimization: Option<OptimizationResult>,
    pub attacker_mind: AttackerMindState,
    pub last_error: Option<SimError>,
    /// Human-readable activity log, newest first.
    pub log: VecDeque<String>,
    /// Bumped by every reset; a call only commits into the generation it was dispatched from.
    pub generation: u64,
}

impl SessionState {
    pub fn initial(prior: BeliefVector, attacker_mind: AttackerMindState, generation: u64) -> Self {
        Self {
            beliefs: prior,
            turn_index: 0,
            ledger: TurnLedger::new(),
            expected_loss: 0.0,
            optimization: None,
            attacker_mind,
            last_error: None,
            log: VecDeque::new(),
            generation,
        }
    }

    pub fn push_log(&mut self, line: String) {
        self.log.push_front(line);
    }
}

/// Consistent copy of everything display and export consumers read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    /// Session identifier.
    pub session_id: SessionId,
    /// The scenario being played.
    pub scenario: Scenario,
    /// Scenario came from the fallback source.
    pub degraded: bool,
    /// Current phase.
    pub phase: SessionPhase,
    /// Completed turns.
    pub turn_index: u32,
    /// Turns allowed.
    pub turn_limit: u32,
    /// Current normalized beliefs.
    pub beliefs: BeliefVector,
    /// Expected loss after the last turn.
    pub expected_loss: f64,
    /// Newest first.
    pub ledger: TurnLedger,
    /// Last accepted optimizer answer.
    pub optimization: Option<OptimizationResult>,
    /// Attacker mind snapshot.
    pub attacker_mind: AttackerMindState,
    /// An external call is in flight.
    pub pending: bool,
    /// Message of the most recent external failure.
    pub last_error: Option<String>,
    /// Newest first.
    pub log: Vec<String>,
}
