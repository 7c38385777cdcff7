//! # adosim - Adaptive Deception Orchestrator simulation core
//!
//! adosim drives a turn-limited, human-in-the-loop security simulation. A
//! defender issues discrete defensive actions against a modeled attacker whose
//! intent is a probability distribution over a small set of hypotheses.
//!
//! ## Core Concepts
//!
//! - **BeliefVector**: Normalized distribution over hypotheses; owns mass conservation
//! - **SimulationSession**: Turn/belief state machine with single-flight external calls
//! - **TurnLedger**: Newest-first audit trail of completed turns
//! - **ScenarioCatalogLoader**: Primary scenario source with a one-shot fallback
//! - **ReportAssembler**: Turns a session snapshot into an exportable document
//!
//! Inference, expected loss and ROI are computed by an external service
//! reached through [`InferenceClient`]; this crate only reconciles its answers.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use adosim::{ClientConfig, HttpInferenceClient, ScenarioCatalogLoader, SessionConfig, SimulationSession};
//!
//! let client = Arc::new(HttpInferenceClient::new(ClientConfig::from_env())?);
//! let session = SimulationSession::from_catalog(
//!     &ScenarioCatalogLoader::bundled_only(),
//!     client,
//!     SessionConfig::default(),
//! )
//! .await?;
//!
//! let record = session.apply_action("patch_db").await?;
//! assert_eq!(record.turn, 1);
//! assert!(session.beliefs().is_settled());
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

// Core types
pub mod attacker;
pub mod belief;
pub mod config;
pub mod error;
pub mod hypothesis;
pub mod ledger;
pub mod scenario;

// Collaborators and orchestration
pub mod catalog;
pub mod export;
pub mod session;
pub mod transport;

// Re-export primary types at crate root for convenience
pub use attacker::AttackerMindState;
pub use belief::{BeliefVector, MASS_TOLERANCE};
pub use catalog::{
    BundledScenarioSource, FileScenarioSource, LoadedScenario, ScenarioCatalogLoader,
    ScenarioOrigin, ScenarioSource,
};
pub use config::{ClientConfig, PriorSource, SessionConfig, DEFAULT_TURN_LIMIT};
pub use error::{
    ActionRejected, ScenarioError, SimError, SimResult, TransportError, ValidationError,
};
pub use export::{ExportReport, JsonReportAssembler, MarkdownReportAssembler, ReportAssembler};
pub use hypothesis::HypothesisId;
pub use ledger::{TurnLedger, TurnRecord};
pub use scenario::{Action, Asset, AttackerProfile, Scenario, Threat};
pub use session::{
    OptimizationResult, Recommendation, SessionId, SessionPhase, SessionSnapshot,
    SimulationSession,
};
pub use transport::{
    ApplyActionRequest, ApplyActionResponse, InferenceClient, OptimizationAnalysis,
    OptimizeRequest, OptimizeResponse,
};

#[cfg(feature = "transport-http")]
pub use catalog::HttpScenarioSource;
#[cfg(feature = "transport-http")]
pub use transport::HttpInferenceClient;
