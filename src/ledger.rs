//! Turn ledger: the audit trail of completed turns.
//!
//! Records are prepended, so iteration order is newest first by
//! construction. Nothing is ever edited or removed; a session reset swaps in
//! a fresh, empty ledger.

use std::collections::BTreeMap;
use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::belief::BeliefVector;
use crate::hypothesis::HypothesisId;

/// One completed turn. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TurnRecord {
    /// 1-based turn index.
    pub turn: u32,
    /// Id of the applied action.
    pub action_id: String,
    /// Display name of the applied action.
    pub action_name: String,
    /// Cost of the action.
    pub cost: f64,
    /// Settled beliefs the action was submitted with.
    pub beliefs_before: BeliefVector,
    /// Settled beliefs after normalizing the service's answer.
    pub beliefs_after: BeliefVector,
    /// The service's beliefs exactly as returned, before normalization.
    pub raw_beliefs_after: BeliefVector,
    /// Expected loss before the action, as reported by the service.
    pub expected_loss_before: f64,
    /// Expected loss after the action, as reported by the service.
    pub expected_loss_after: f64,
    /// ROI as reported by the service.
    pub roi: f64,
    /// The service's explanation of the update.
    pub rationale: String,
    /// Per-hypothesis evidence strength the service reported.
    #[serde(default)]
    pub evidence: BTreeMap<HypothesisId, f64>,
    /// When the turn was committed.
    pub recorded_at: DateTime<Utc>,
}

impl TurnRecord {
    /// Expected loss removed by this turn (may be negative).
    #[must_use]
    pub fn loss_reduction(&self) -> f64 {
        self.expected_loss_before - self.expected_loss_after
    }
}

/// Newest-first sequence of [`TurnRecord`]s.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TurnLedger {
    records: VecDeque<TurnRecord>,
}

impl TurnLedger {
    /// Creates an empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Prepends a record; it becomes the new head.
    pub fn record(&mut self, record: TurnRecord) {
        self.records.push_front(record);
    }

    /// The most recent turn.
    #[must_use]
    pub fn head(&self) -> Option<&TurnRecord> {
        self.records.front()
    }

    /// Newest first.
    pub fn iter(&self) -> impl Iterator<Item = &TurnRecord> {
        self.records.iter()
    }

    /// Oldest first, the order reports print in.
    pub fn chronological(&self) -> impl Iterator<Item = &TurnRecord> {
        self.records.iter().rev()
    }

    /// Number of recorded turns.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// True before the first turn.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Stable blake3 fingerprint of the serialized ledger.
    ///
    /// Exported alongside the records so an audit trail can be checked for
    /// edits after the fact.
    #[must_use]
    pub fn digest(&self) -> String {
        let mut hasher = blake3::Hasher::new();
        for record in self.chronological() {
            // TurnRecord contains only maps, strings and numbers; encoding cannot fail.
            if let Ok(bytes) = serde_json::to_vec(record) {
                hasher.update(&(bytes.len() as u64).to_le_bytes());
                hasher.update(&bytes);
            }
        }
        hasher.finalize().to_hex().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(turn: u32, action: &str) -> TurnRecord {
        TurnRecord {
            turn,
            action_id: action.to_string(),
            action_name: action.to_uppercase(),
            cost: 5.0,
            beliefs_before: BeliefVector::default_prior(),
            beliefs_after: BeliefVector::default_prior(),
            raw_beliefs_after: BeliefVector::default_prior(),
            expected_loss_before: 1000.0,
            expected_loss_after: 600.0,
            roi: 1.5,
            rationale: "pivot".to_string(),
            evidence: BTreeMap::new(),
            recorded_at: Utc::now(),
        }
    }

    #[test]
    fn test_newest_record_is_head() {
        let mut ledger = TurnLedger::new();
        ledger.record(record(1, "patch_db"));
        ledger.record(record(2, "auth_logs"));

        assert_eq!(ledger.len(), 2);
        assert_eq!(ledger.head().unwrap().turn, 2);
        let newest_first: Vec<u32> = ledger.iter().map(|r| r.turn).collect();
        assert_eq!(newest_first, vec![2, 1]);
        let oldest_first: Vec<u32> = ledger.chronological().map(|r| r.turn).collect();
        assert_eq!(oldest_first, vec![1, 2]);
    }

    #[test]
    fn test_digest_is_stable_and_sensitive_to_content() {
        let mut a = TurnLedger::new();
        a.record(record(1, "patch_db"));
        let mut b = a.clone();
        assert_eq!(a.digest(), b.digest());

        b.record(record(2, "auth_logs"));
        assert_ne!(a.digest(), b.digest());
        assert_ne!(TurnLedger::new().digest(), a.digest());
    }

    #[test]
    fn test_loss_reduction() {
        assert!((record(1, "x").loss_reduction() - 400.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_serializes_newest_first() {
        let mut ledger = TurnLedger::new();
        ledger.record(record(1, "patch_db"));
        ledger.record(record(2, "auth_logs"));
        let json = serde_json::to_value(&ledger).unwrap();
        assert_eq!(json[0]["turn"], 2);
        assert_eq!(json[1]["action_id"], "patch_db");
    }
}
