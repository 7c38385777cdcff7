#![allow(dead_code)]

use std::collections::{BTreeMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use tokio::sync::Notify;

use adosim::catalog::sources::BUNDLED_SCENARIO_JSON;
use adosim::{
    ApplyActionRequest, ApplyActionResponse, BeliefVector, InferenceClient, OptimizationAnalysis,
    OptimizeRequest, OptimizeResponse, Scenario, TransportError,
};

/// Lets a test hold a call open until it says so.
#[derive(Default)]
pub struct Gate {
    pub entered: Notify,
    pub release: Notify,
}

/// Inference client that replays canned responses in order.
#[derive(Default)]
pub struct ScriptedClient {
    apply: Mutex<VecDeque<Result<ApplyActionResponse, TransportError>>>,
    optimize: Mutex<VecDeque<Result<OptimizeResponse, TransportError>>>,
    apply_calls: AtomicUsize,
    optimize_calls: AtomicUsize,
    requests: Mutex<Vec<ApplyActionRequest>>,
    gate: Option<Gate>,
    // Answer used once the script runs out.
    repeat: Option<ApplyActionResponse>,
}

impl ScriptedClient {
    pub fn new(apply: Vec<Result<ApplyActionResponse, TransportError>>) -> Self {
        Self {
            apply: Mutex::new(apply.into()),
            ..Self::default()
        }
    }

    pub fn gated(apply: Vec<Result<ApplyActionResponse, TransportError>>) -> Self {
        Self {
            gate: Some(Gate::default()),
            ..Self::new(apply)
        }
    }

    /// Answers every `apply_action` with the same response.
    pub fn repeating(response: ApplyActionResponse) -> Self {
        Self {
            repeat: Some(response),
            ..Self::default()
        }
    }

    pub fn with_optimize(self, optimize: Vec<Result<OptimizeResponse, TransportError>>) -> Self {
        *self.optimize.lock().unwrap() = optimize.into();
        self
    }

    pub fn gate(&self) -> &Gate {
        self.gate.as_ref().expect("client is not gated")
    }

    pub fn apply_calls(&self) -> usize {
        self.apply_calls.load(Ordering::SeqCst)
    }

    pub fn optimize_calls(&self) -> usize {
        self.optimize_calls.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<ApplyActionRequest> {
        self.requests.lock().unwrap().clone()
    }

    async fn hold(&self) {
        if let Some(gate) = &self.gate {
            gate.entered.notify_one();
            gate.release.notified().await;
        }
    }
}

fn exhausted() -> TransportError {
    TransportError::ConnectionFailed {
        message: "script exhausted".to_string(),
    }
}

#[async_trait]
impl InferenceClient for ScriptedClient {
    async fn apply_action(
        &self,
        request: &ApplyActionRequest,
    ) -> Result<ApplyActionResponse, TransportError> {
        self.apply_calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request.clone());
        self.hold().await;
        let next = self.apply.lock().unwrap().pop_front();
        next.or_else(|| self.repeat.clone().map(Ok))
            .unwrap_or_else(|| Err(exhausted()))
    }

    async fn optimize(&self, _request: &OptimizeRequest) -> Result<OptimizeResponse, TransportError> {
        self.optimize_calls.fetch_add(1, Ordering::SeqCst);
        self.hold().await;
        let next = self.optimize.lock().unwrap().pop_front();
        next.unwrap_or_else(|| Err(exhausted()))
    }
}

pub fn scenario() -> Scenario {
    serde_json::from_str(BUNDLED_SCENARIO_JSON).unwrap()
}

/// Service answer with the given posterior and losses.
pub fn response(beliefs: [(&str, f64); 3], before: f64, after: f64, roi: f64) -> ApplyActionResponse {
    ApplyActionResponse {
        updated_beliefs: BeliefVector::from_pairs(beliefs),
        expected_loss_before: before,
        expected_loss_after: after,
        roi,
        rationale_summary: "Defense has hardened the primary target.".to_string(),
        evidence: BTreeMap::new(),
        action_taken: None,
    }
}

/// The reference `patch_db` answer.
pub fn patch_db_response() -> ApplyActionResponse {
    response([("H1", 0.3), ("H2", 0.4), ("H3", 0.3)], 1000.0, 600.0, 1.5)
}

pub fn recommendation(action_id: &str, roi: f64) -> OptimizeResponse {
    OptimizeResponse {
        best_action_id: Some(action_id.to_string()),
        best_action: None,
        analysis: Some(OptimizationAnalysis {
            roi,
            expected_loss_reduction: 40_000.0,
            expected_loss_before: Some(372_500.0),
            expected_loss_after: Some(332_500.0),
            updated_beliefs: None,
            rationale: None,
        }),
        message: None,
        available_budget: None,
    }
}
