//! Simulation session: the turn/belief state machine.
//!
//! A session owns one scenario for its lifetime and advances through at most
//! `turn_limit` turns. Each turn hands the current beliefs to the inference
//! collaborator and, only if the answer is usable, replaces the beliefs,
//! advances the turn counter and prepends a ledger record.
//!
//! Single flight: at most one external call per session is in flight. The
//! `pending` flag is claimed with a compare-and-swap before anything is
//! dispatched, and released by a guard when the call resolves (or its future
//! is dropped). A second call while pending is rejected, never queued.

pub mod state;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::Utc;
use tracing::{info, warn};

use crate::attacker::AttackerMindState;
use crate::belief::BeliefVector;
use crate::catalog::{LoadedScenario, ScenarioCatalogLoader, ScenarioOrigin};
use crate::config::SessionConfig;
use crate::error::{ActionRejected, SimError, SimResult, ValidationError};
use crate::ledger::{TurnLedger, TurnRecord};
use crate::scenario::Scenario;
use crate::transport::{ApplyActionRequest, InferenceClient, OptimizeRequest};

pub use state::{
    OptimizationResult, Recommendation, SessionId, SessionPhase, SessionSnapshot,
};
use state::SessionState;

/// Claim on the session's single in-flight slot.
struct PendingGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> PendingGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Result<Self, ActionRejected> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map(|_| Self { flag })
            .map_err(|_| ActionRejected::Busy)
    }
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

/// One running simulation.
///
/// All methods take `&self`; share a session across tasks with `Arc`.
pub struct SimulationSession {
    id: SessionId,
    config: SessionConfig,
    scenario: Scenario,
    origin: ScenarioOrigin,
    prior: BeliefVector,
    initial_mind: AttackerMindState,
    client: Arc<dyn InferenceClient>,
    pending: AtomicBool,
    state: RwLock<SessionState>,
}

impl std::fmt::Debug for SimulationSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimulationSession")
            .field("id", &self.id)
            .field("scenario", &self.scenario.title)
            .field("origin", &self.origin)
            .field("turn_index", &self.turn_index())
            .field("pending", &self.is_pending())
            .finish_non_exhaustive()
    }
}

impl SimulationSession {
    /// Creates a session for a scenario.
    ///
    /// Beliefs start at the configured prior (normalized), the attacker mind
    /// snapshot is derived from the scenario profile, and the turn counter,
    /// ledger, optimization and error are empty.
    ///
    /// # Errors
    /// `Validation` if the config or scenario is invalid or the prior is degenerate.
    pub fn initialize(
        scenario: Scenario,
        client: Arc<dyn InferenceClient>,
        config: SessionConfig,
    ) -> SimResult<Self> {
        Self::initialize_loaded(
            LoadedScenario {
                scenario,
                origin: ScenarioOrigin::Primary,
            },
            client,
            config,
        )
    }

    /// Creates a session from a catalog load result, keeping its origin.
    pub fn initialize_loaded(
        loaded: LoadedScenario,
        client: Arc<dyn InferenceClient>,
        config: SessionConfig,
    ) -> SimResult<Self> {
        config.validate()?;
        let LoadedScenario { scenario, origin } = loaded;
        scenario.validate()?;
        let prior = config.prior.resolve(&scenario)?;

        if !scenario.threats.is_empty() {
            for id in prior.hypotheses() {
                if scenario.threat(id.as_str()).is_none() {
                    warn!(hypothesis = %id, "prior tracks a hypothesis the scenario does not declare");
                }
            }
        }

        let initial_mind = AttackerMindState::derive(&scenario, &prior);
        let id = SessionId::new();
        info!(
            session = %id,
            title = %scenario.title,
            hypotheses = prior.len(),
            turn_limit = config.turn_limit,
            degraded = origin == ScenarioOrigin::Fallback,
            "session initialized"
        );

        Ok(Self {
            id,
            state: RwLock::new(SessionState::initial(prior.clone(), initial_mind.clone(), 0)),
            config,
            scenario,
            origin,
            prior,
            initial_mind,
            client,
            pending: AtomicBool::new(false),
        })
    }

    /// Loads the scenario through the catalog and initializes a session.
    ///
    /// # Errors
    /// `ScenarioUnavailable` if neither catalog source produced a scenario.
    pub async fn from_catalog(
        loader: &ScenarioCatalogLoader,
        client: Arc<dyn InferenceClient>,
        config: SessionConfig,
    ) -> SimResult<Self> {
        let loaded = loader.load().await?;
        Self::initialize_loaded(loaded, client, config)
    }

    // The state is only ever replaced wholesale under the write lock, so a
    // poisoned lock still guards a consistent value.
    fn read(&self) -> RwLockReadGuard<'_, SessionState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, SessionState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Takes the write lock for committing a call dispatched under `dispatched`.
    ///
    /// The generation is compared while the lock is held, so a reset either
    /// lands before the check (and the result is discarded) or after the commit.
    fn write_current(&self, dispatched: u64) -> SimResult<RwLockWriteGuard<'_, SessionState>> {
        let state = self.write();
        if state.generation == dispatched {
            Ok(state)
        } else {
            drop(state);
            warn!(session = %self.id, "session reset during call; discarding result");
            Err(SimError::Superseded)
        }
    }

    /// Applies one defensive action.
    ///
    /// # Errors
    /// - `Rejected(Busy)` if another call is in flight
    /// - `Rejected(TurnLimitReached)` once the session is complete
    /// - `Rejected(UnknownAction)` if the id is not in the scenario
    /// - `ExternalCallFailed` / `MalformedResponse` if the service call fails;
    ///   the error is also stored as `last_error` and logged
    ///
    /// Rejections and failures leave beliefs, turn counter and ledger untouched.
    pub async fn apply_action(&self, action_id: &str) -> SimResult<TurnRecord> {
        let _guard = PendingGuard::acquire(&self.pending).map_err(|e| {
            warn!(session = %self.id, error = %e, "apply_action rejected");
            e
        })?;

        let (generation, turn_index, beliefs_before) = {
            let state = self.read();
            (state.generation, state.turn_index, state.beliefs.clone())
        };
        if turn_index >= self.config.turn_limit {
            warn!(session = %self.id, turn_index, "apply_action rejected: turn limit reached");
            return Err(ActionRejected::TurnLimitReached {
                limit: self.config.turn_limit,
            }
            .into());
        }
        let Some(action) = self.scenario.action(action_id) else {
            warn!(session = %self.id, action_id, "apply_action rejected: unknown action");
            return Err(ActionRejected::UnknownAction {
                action_id: action_id.to_string(),
            }
            .into());
        };

        let request = ApplyActionRequest {
            chosen_action_id: action.id.clone(),
            current_beliefs: beliefs_before.clone(),
        };
        let outcome = self
            .client
            .apply_action(&request)
            .await
            .and_then(|response| response.validate().map(|()| response))
            .map_err(SimError::from);

        let mut state = self.write_current(generation)?;

        let response = match outcome {
            Ok(response) => response,
            Err(err) => {
                warn!(session = %self.id, action_id, error = %err, "action failed");
                state.push_log(format!("Action failed: {err}"));
                state.last_error = Some(err.clone());
                return Err(err);
            }
        };

        if !response.updated_beliefs.is_settled_within(self.config.mass_tolerance) {
            warn!(
                session = %self.id,
                sum = response.updated_beliefs.sum(),
                "service belief mass deviates from 1.0; normalizing"
            );
        }
        let beliefs_after = BeliefVector::normalize(&response.updated_beliefs);
        if !beliefs_after.hypotheses().eq(beliefs_before.hypotheses()) {
            warn!(session = %self.id, "service returned a different hypothesis set");
        }

        let record = TurnRecord {
            turn: turn_index + 1,
            action_id: action.id.clone(),
            action_name: action.name.clone(),
            cost: action.cost,
            beliefs_before,
            beliefs_after: beliefs_after.clone(),
            raw_beliefs_after: response.updated_beliefs,
            expected_loss_before: response.expected_loss_before,
            expected_loss_after: response.expected_loss_after,
            roi: response.roi,
            rationale: response.rationale_summary,
            evidence: response.evidence,
            recorded_at: Utc::now(),
        };

        state.beliefs = beliefs_after;
        state.expected_loss = record.expected_loss_after;
        state.turn_index = record.turn;
        state.last_error = None;
        state.push_log(format!(
            "Turn {}: {} (ROI={:.2})",
            record.turn, record.action_name, record.roi
        ));
        state.ledger.record(record.clone());

        info!(
            session = %self.id,
            turn = record.turn,
            action_id = %record.action_id,
            expected_loss = record.expected_loss_after,
            roi = record.roi,
            "turn applied"
        );
        Ok(record)
    }

    /// Asks the optimizer for the best action within `budget`.
    ///
    /// Does not consult or change the turn counter, beliefs or ledger. On
    /// success the result replaces the previous optimization.
    ///
    /// # Errors
    /// - `Validation` for a negative or non-finite budget
    /// - `Rejected(Busy)` if another call is in flight
    /// - `ExternalCallFailed` / `MalformedResponse` if the optimizer fails
    pub async fn request_optimization(&self, budget: f64) -> SimResult<OptimizationResult> {
        if !budget.is_finite() {
            return Err(ValidationError::NonFiniteValue {
                field: "budget".to_string(),
                value: budget,
            }
            .into());
        }
        if budget < 0.0 {
            return Err(ValidationError::NegativeValue {
                field: "budget".to_string(),
                value: budget,
            }
            .into());
        }

        let _guard = PendingGuard::acquire(&self.pending).map_err(|e| {
            warn!(session = %self.id, error = %e, "request_optimization rejected");
            e
        })?;

        let (generation, current_beliefs) = {
            let state = self.read();
            (state.generation, state.beliefs.clone())
        };
        let request = OptimizeRequest {
            current_beliefs,
            available_budget: budget,
        };
        let outcome = self
            .client
            .optimize(&request)
            .await
            .and_then(|response| OptimizationResult::from_response(response, budget, &self.scenario))
            .map_err(SimError::from);

        let mut state = self.write_current(generation)?;

        match outcome {
            Ok(result) => {
                info!(session = %self.id, budget, line = %result.log_line(), "optimization received");
                state.push_log(result.log_line());
                state.optimization = Some(result.clone());
                state.last_error = None;
                Ok(result)
            }
            Err(err) => {
                warn!(session = %self.id, budget, error = %err, "optimization failed");
                state.push_log(format!("Optimization failed: {err}"));
                state.last_error = Some(err.clone());
                Err(err)
            }
        }
    }

    /// Returns the session to its initial state. Always succeeds.
    ///
    /// A call still in flight keeps the pending slot until it resolves, and
    /// its result is discarded.
    pub fn reset(&self) {
        let mut state = self.write();
        let generation = state.generation.wrapping_add(1);
        *state = SessionState::initial(self.prior.clone(), self.initial_mind.clone(), generation);
        drop(state);
        info!(session = %self.id, "session reset");
    }

    /// Session identifier.
    #[must_use]
    pub fn id(&self) -> SessionId {
        self.id
    }

    /// Rules this session was built with.
    #[must_use]
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// The scenario being played.
    #[must_use]
    pub fn scenario(&self) -> &Scenario {
        &self.scenario
    }

    /// True when the scenario came from the fallback source (offline mode).
    #[must_use]
    pub fn is_degraded(&self) -> bool {
        self.origin == ScenarioOrigin::Fallback
    }

    /// The settled prior the session starts from and resets to.
    #[must_use]
    pub fn prior(&self) -> &BeliefVector {
        &self.prior
    }

    /// Completed turns.
    #[must_use]
    pub fn turn_index(&self) -> u32 {
        self.read().turn_index
    }

    /// Turns left before the session is complete.
    #[must_use]
    pub fn turns_remaining(&self) -> u32 {
        self.config.turn_limit.saturating_sub(self.turn_index())
    }

    /// Current phase.
    #[must_use]
    pub fn phase(&self) -> SessionPhase {
        SessionPhase::for_turn(self.turn_index(), self.config.turn_limit)
    }

    /// True once the turn limit is reached.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.phase() == SessionPhase::Complete
    }

    /// Whether an external call is in flight.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.pending.load(Ordering::Acquire)
    }

    /// Front-end policy: optimization is offered only while the session is
    /// active and idle. [`request_optimization`](Self::request_optimization)
    /// itself does not enforce the turn limit.
    #[must_use]
    pub fn can_optimize(&self) -> bool {
        !self.is_complete() && !self.is_pending()
    }

    /// Current normalized beliefs.
    #[must_use]
    pub fn beliefs(&self) -> BeliefVector {
        self.read().beliefs.clone()
    }

    /// Expected loss after the last turn, zero before the first.
    #[must_use]
    pub fn expected_loss(&self) -> f64 {
        self.read().expected_loss
    }

    /// Copy of the ledger, newest first.
    #[must_use]
    pub fn ledger(&self) -> TurnLedger {
        self.read().ledger.clone()
    }

    /// Last accepted optimizer answer.
    #[must_use]
    pub fn optimization(&self) -> Option<OptimizationResult> {
        self.read().optimization.clone()
    }

    /// Attacker mind snapshot.
    #[must_use]
    pub fn attacker_mind(&self) -> AttackerMindState {
        self.read().attacker_mind.clone()
    }

    /// Most recent external failure, cleared by the next success.
    #[must_use]
    pub fn last_error(&self) -> Option<SimError> {
        self.read().last_error.clone()
    }

    /// Activity log, newest first.
    #[must_use]
    pub fn log(&self) -> Vec<String> {
        self.read().log.iter().cloned().collect()
    }

    /// Consistent copy of all readable state.
    #[must_use]
    pub fn snapshot(&self) -> SessionSnapshot {
        let state = self.read();
        SessionSnapshot {
            session_id: self.id,
            scenario: self.scenario.clone(),
            degraded: self.is_degraded(),
            phase: SessionPhase::for_turn(state.turn_index, self.config.turn_limit),
            turn_index: state.turn_index,
            turn_limit: self.config.turn_limit,
            beliefs: state.beliefs.clone(),
            expected_loss: state.expected_loss,
            ledger: state.ledger.clone(),
            optimization: state.optimization.clone(),
            attacker_mind: state.attacker_mind.clone(),
            pending: self.is_pending(),
            last_error: state.last_error.as_ref().map(ToString::to_string),
            log: state.log.iter().cloned().collect(),
        }
    }
}
