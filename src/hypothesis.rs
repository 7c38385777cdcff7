//! Hypothesis identifiers.
//!
//! A hypothesis is one candidate attacker intent (attack path). The set is
//! declared by the scenario; identifiers are opaque strings such as `"H1"`.

use std::borrow::Borrow;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque key identifying one attacker hypothesis.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HypothesisId(String);

impl HypothesisId {
    /// Creates a hypothesis ID from any string-like value.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for HypothesisId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for HypothesisId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for HypothesisId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for HypothesisId {
    fn from(s: String) -> Self {
        Self(s)
    }
}
