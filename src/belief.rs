//! Belief vectors: the attacker's probability distribution over hypotheses.
//!
//! A settled [`BeliefVector`] always carries unit mass. Raw vectors coming
//! back from the inference service may not; [`BeliefVector::normalize`] is the
//! only way they become settled.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::hypothesis::HypothesisId;

/// Default relative tolerance for the mass-conservation check.
pub const MASS_TOLERANCE: f64 = 1e-6;

/// Probability mass per hypothesis, ordered by hypothesis id.
///
/// # Examples
///
/// ```
/// use adosim::BeliefVector;
///
/// let raw = BeliefVector::from_pairs([("H1", 3.0), ("H2", 1.0)]);
/// let settled = BeliefVector::normalize(&raw);
/// assert!((settled.sum() - 1.0).abs() < 1e-9);
/// assert_eq!(settled.get("H1"), Some(0.75));
/// ```
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BeliefVector(BTreeMap<HypothesisId, f64>);

impl BeliefVector {
    /// Builds a vector from `(id, mass)` pairs without normalizing.
    pub fn from_pairs<I, K>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, f64)>,
        K: Into<HypothesisId>,
    {
        Self(pairs.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    /// The reference prior: `{H1: 0.6, H2: 0.25, H3: 0.15}`, normalized.
    #[must_use]
    pub fn default_prior() -> Self {
        Self::normalize(&Self::from_pairs([("H1", 0.6), ("H2", 0.25), ("H3", 0.15)]))
    }

    /// Clamps every value to `>= 0` and rescales to unit mass.
    ///
    /// Non-finite values clamp to zero. If the clamped mass is not positive,
    /// the input is returned unchanged: there is no reference point to
    /// redistribute mass from.
    #[must_use]
    pub fn normalize(raw: &Self) -> Self {
        let clamped: BTreeMap<HypothesisId, f64> = raw
            .0
            .iter()
            .map(|(k, &v)| (k.clone(), if v.is_finite() { v.max(0.0) } else { 0.0 }))
            .collect();

        let total: f64 = clamped.values().sum();
        if total <= 0.0 || !total.is_finite() {
            return raw.clone();
        }

        Self(clamped.into_iter().map(|(k, v)| (k, v / total)).collect())
    }

    /// Total mass. Used to verify (and display) the conservation invariant.
    #[must_use]
    pub fn sum(&self) -> f64 {
        self.0.values().sum()
    }

    /// Returns true if the total mass is 1.0 within `tolerance`.
    #[must_use]
    pub fn is_settled_within(&self, tolerance: f64) -> bool {
        (self.sum() - 1.0).abs() <= tolerance
    }

    /// Returns true if the total mass is 1.0 within [`MASS_TOLERANCE`].
    #[must_use]
    pub fn is_settled(&self) -> bool {
        self.is_settled_within(MASS_TOLERANCE)
    }

    /// Mass assigned to one hypothesis.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<f64> {
        self.0.get(id).copied()
    }

    /// Iterates hypotheses in id order.
    pub fn iter(&self) -> impl Iterator<Item = (&HypothesisId, f64)> {
        self.0.iter().map(|(k, &v)| (k, v))
    }

    /// Hypothesis ids in this vector.
    pub fn hypotheses(&self) -> impl Iterator<Item = &HypothesisId> {
        self.0.keys()
    }

    /// Number of hypotheses.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if no hypotheses are tracked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The hypothesis carrying the most mass. Ties go to the lowest id.
    #[must_use]
    pub fn most_likely(&self) -> Option<(&HypothesisId, f64)> {
        self.iter().fold(None, |best, (k, v)| match best {
            Some((_, bv)) if bv >= v => best,
            _ => Some((k, v)),
        })
    }
}

impl<K: Into<HypothesisId>> FromIterator<(K, f64)> for BeliefVector {
    fn from_iter<T: IntoIterator<Item = (K, f64)>>(iter: T) -> Self {
        Self::from_pairs(iter)
    }
}
