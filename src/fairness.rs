//! fairness.rs — The fairness side of ranking.
//!
//! Blends sustainability grades, brand ethics and provenance boosts into one
//! number. The total is intentionally not clamped: a verified local product
//! with top grades may exceed 1.0, and ranking consumes that raw value.
//! Missing data is forgiving — absent grades contribute 0 but an absent
//! ethics score falls back to a neutral default rather than punishing the
//! product.

use serde::{Deserialize, Serialize};

use crate::candidate::{Candidate, Provenance};

/// Calibrated weights of the fairness blend.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct FairnessWeights {
    pub eco: f32,
    pub ethics: f32,
    pub nutri: f32,
    pub verified_boost: f32,
    pub local_boost: f32,
    /// Reward for having an eco grade at all, on top of its value.
    pub presence_boost: f32,
    pub default_ethics: f32,
}

impl Default for FairnessWeights {
    fn default() -> Self {
        Self {
            eco: 0.5,
            ethics: 0.3,
            nutri: 0.1,
            verified_boost: 0.05,
            local_boost: 0.03,
            presence_boost: 0.08,
            default_ethics: 0.6,
        }
    }
}

/// Per-component view of one fairness score, for explainability.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FairnessBreakdown {
    pub eco: f32,
    pub nutri: f32,
    pub ethics: f32,
    pub verified_boost: f32,
    pub local_boost: f32,
    pub presence_boost: f32,
    pub total: f32,
}

/// Full fairness breakdown for a candidate.
pub fn breakdown(
    candidate: &Candidate,
    provenance: Provenance,
    weights: &FairnessWeights,
) -> FairnessBreakdown {
    let eco = candidate.eco_grade.map(|g| g.score()).unwrap_or(0.0);
    let nutri = candidate.nutri_grade.map(|g| g.score()).unwrap_or(0.0);
    let ethics = candidate.ethics_score.unwrap_or(weights.default_ethics);

    let verified_boost = if candidate.is_verified() {
        weights.verified_boost
    } else {
        0.0
    };
    let local_boost = if provenance == Provenance::Local {
        weights.local_boost
    } else {
        0.0
    };
    let presence_boost = if candidate.eco_grade.is_some() {
        weights.presence_boost
    } else {
        0.0
    };

    let total = eco * weights.eco
        + ethics * weights.ethics
        + nutri * weights.nutri
        + verified_boost
        + local_boost
        + presence_boost;

    FairnessBreakdown {
        eco,
        nutri,
        ethics,
        verified_boost,
        local_boost,
        presence_boost,
        total,
    }
}

/// Fairness total with the default weights.
pub fn compute_fairness(candidate: &Candidate, provenance: Provenance) -> f32 {
    breakdown(candidate, provenance, &FairnessWeights::default()).total
}
