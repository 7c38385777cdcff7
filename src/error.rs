//! Error types for adosim.
//!
//! All errors are strongly typed using thiserror so callers can match on the
//! failure class (rejected at the boundary, external call failed, malformed
//! payload, scenario unavailable) instead of parsing messages.
//!
//! Every error type is `Clone`: the session keeps the most recent failure as
//! `last_error` for display while also returning it to the caller.

use thiserror::Error;

/// Validation errors for scenario data and configuration.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    /// A required field is absent.
    #[error("Required field '{field}' is missing")]
    MissingField {
        /// Name of the offending field.
        field: String,
    },

    /// Two entries of the same kind share an id.
    #[error("Duplicate {kind} id '{id}'")]
    DuplicateId {
        /// What kind of entry was duplicated.
        kind: &'static str,
        /// The duplicated id.
        id: String,
    },

    /// A numeric field is NaN or infinite.
    #[error("Field '{field}' must be a finite number, got {value}")]
    NonFiniteValue {
        /// Name of the offending field.
        field: String,
        /// The rejected value.
        value: f64,
    },

    /// A numeric field that must be non-negative is negative.
    #[error("Field '{field}' must not be negative, got {value}")]
    NegativeValue {
        /// Name of the offending field.
        field: String,
        /// The rejected value.
        value: f64,
    },

    /// A scenario without actions cannot be played.
    #[error("Scenario declares no actions")]
    NoActions,

    /// A session config value is out of range.
    #[error("Invalid session configuration: {reason}")]
    InvalidConfig {
        /// What was wrong.
        reason: String,
    },

    /// A belief vector has no positive mass.
    #[error("Belief vector is degenerate: total mass {total} cannot be normalized")]
    DegenerateBeliefs {
        /// Sum of the vector before normalization.
        total: f64,
    },
}

/// Reasons an operation is refused at the session boundary.
///
/// A rejection never dispatches an external call and never changes session state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ActionRejected {
    /// The action id is not in the scenario.
    #[error("No such action: '{action_id}'")]
    UnknownAction {
        /// The id that was asked for.
        action_id: String,
    },

    /// Another external call is in flight.
    #[error("Another external call is still pending")]
    Busy,

    /// The session is complete.
    #[error("Turn limit of {limit} reached")]
    TurnLimitReached {
        /// Configured turn limit.
        limit: u32,
    },
}

/// Failures of the request/response collaborators.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TransportError {
    /// The request never got an answer.
    #[error("Connection failed: {message}")]
    ConnectionFailed {
        /// Underlying error text.
        message: String,
    },

    /// The service answered with a non-success status.
    #[error("HTTP error! status: {status}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body, for diagnostics.
        body: String,
    },

    /// The answer could not be decoded or failed validation.
    #[error("Malformed response: {reason}")]
    MalformedResponse {
        /// What was wrong.
        reason: String,
    },

    /// A local file could not be read.
    #[error("Failed to read {path}: {message}")]
    Io {
        /// File that failed.
        path: String,
        /// Underlying error text.
        message: String,
    },
}

/// Failure of a single scenario source.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ScenarioError {
    /// The source could not produce a scenario.
    #[error("Scenario source '{source_name}' failed: {cause}")]
    SourceFailed {
        /// Name of the source.
        source_name: String,
        /// Why the fetch failed.
        cause: TransportError,
    },

    /// The source produced a scenario that failed validation.
    #[error("Scenario from '{source_name}' is invalid: {cause}")]
    Invalid {
        /// Name of the source.
        source_name: String,
        /// Why validation failed.
        cause: ValidationError,
    },
}

/// Top-level error type for adosim.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SimError {
    /// Neither catalog source produced a usable scenario.
    #[error("Scenario unavailable (primary: {primary}; fallback: {fallback})")]
    ScenarioUnavailable {
        /// Failure of the primary source.
        primary: ScenarioError,
        /// Failure of the fallback source.
        fallback: ScenarioError,
    },

    /// Refused before any external call.
    #[error("Action rejected: {0}")]
    Rejected(#[from] ActionRejected),

    /// The external call failed.
    #[error("External call failed: {0}")]
    ExternalCallFailed(TransportError),

    /// The answer could not be decoded or failed validation.
    #[error("Malformed response: {reason}")]
    MalformedResponse {
        /// What was wrong.
        reason: String,
    },

    /// Invalid scenario, config or input.
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// A reset happened while the call was in flight.
    #[error("Session was reset while the call was in flight; result discarded")]
    Superseded,

    /// Bug or unexpected state.
    #[error("Internal error: {message}")]
    Internal {
        /// Underlying error text.
        message: String,
    },
}

impl From<TransportError> for SimError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::MalformedResponse { reason } => Self::MalformedResponse { reason },
            other => Self::ExternalCallFailed(other),
        }
    }
}

impl SimError {
    /// Creates an internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Returns true if the operation was refused before any external call.
    #[must_use]
    pub const fn is_rejection(&self) -> bool {
        matches!(self, Self::Rejected(_))
    }

    /// Returns true if an external call was made and failed (transport or payload).
    #[must_use]
    pub const fn is_external_failure(&self) -> bool {
        matches!(
            self,
            Self::ExternalCallFailed(_) | Self::MalformedResponse { .. }
        )
    }

    /// Returns true if no scenario could be established.
    #[must_use]
    pub const fn is_scenario_unavailable(&self) -> bool {
        matches!(self, Self::ScenarioUnavailable { .. })
    }

    /// Returns true if a caller could reasonably try the same operation again.
    ///
    /// The session never retries on its own; this is advice for the caller.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::Rejected(r) => matches!(r, ActionRejected::Busy),
            Self::ExternalCallFailed(e) => match e {
                TransportError::ConnectionFailed { .. } => true,
                TransportError::Status { status, .. } => *status >= 500,
                _ => false,
            },
            _ => false,
        }
    }
}

/// Result type alias for adosim operations.
pub type SimResult<T> = Result<T, SimError>;
