//! rank.rs — Final ordering of deduplicated candidates.
//!
//! Fairness is computed here, after the duplicate merge, so grades copied in
//! from a losing record still count. The combined score blends relevance and
//! fairness and adds a small bonus for records carrying both grades. Ordering
//! is fully deterministic: combined descending, ties broken by higher
//! relevance, remaining ties by input order (stable sort).

use serde::Deserialize;

use crate::candidate::ScoredCandidate;
use crate::fairness::{self, FairnessWeights};

/// Blend weights for the final score.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct RankingWeights {
    pub relevance: f32,
    pub fairness: f32,
    /// Added when a record carries both an eco and a nutri grade.
    pub completeness_bonus: f32,
}

impl Default for RankingWeights {
    fn default() -> Self {
        Self {
            relevance: 0.6,
            fairness: 0.4,
            completeness_bonus: 0.05,
        }
    }
}

/// Fill fairness and combined scores, then sort.
pub fn rank(
    mut candidates: Vec<ScoredCandidate>,
    ranking: &RankingWeights,
    fairness_weights: &FairnessWeights,
) -> Vec<ScoredCandidate> {
    for scored in &mut candidates {
        scored.fairness =
            fairness::breakdown(&scored.candidate, scored.provenance, fairness_weights).total;
        let mut combined =
            scored.relevance * ranking.relevance + scored.fairness * ranking.fairness;
        if scored.candidate.eco_grade.is_some() && scored.candidate.nutri_grade.is_some() {
            combined += ranking.completeness_bonus;
        }
        scored.combined = combined;
    }

    candidates.sort_by(|a, b| {
        b.combined
            .total_cmp(&a.combined)
            .then(b.relevance.total_cmp(&a.relevance))
    });
    candidates
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::candidate::{Candidate, Grade, Provenance, ScoredCandidate};

    fn scored(c: Candidate, provenance: Provenance, relevance: f32) -> ScoredCandidate {
        ScoredCandidate::new(c, provenance, relevance)
    }

    #[test]
    fn combined_blends_relevance_and_fairness() {
        let c = Candidate::new("Bio Vollmilch")
            .with_grades(Some(Grade::A), Some(Grade::B))
            .with_ethics(0.8, vec![])
            .verified();

        let out = rank(
            vec![scored(c, Provenance::Local, 1.0)],
            &RankingWeights::default(),
            &FairnessWeights::default(),
        );

        assert!((out[0].fairness - 0.98).abs() < 1e-6);
        // 1.0 * 0.6 + 0.98 * 0.4 + 0.05 completeness
        assert!((out[0].combined - 1.042).abs() < 1e-6, "got {}", out[0].combined);
    }

    #[test]
    fn fair_product_can_outrank_a_better_text_match() {
        let fair = Candidate::new("Bio Haferdrink").with_grades(Some(Grade::A), None);
        let plain = Candidate::new("Haferdrink");

        let out = rank(
            vec![
                scored(plain, Provenance::External, 0.9),
                scored(fair, Provenance::External, 0.8),
            ],
            &RankingWeights::default(),
            &FairnessWeights::default(),
        );

        assert_eq!(out[0].candidate.name, "Bio Haferdrink");
        assert!(out[0].combined > out[1].combined);
    }

    #[test]
    fn completeness_bonus_needs_both_grades() {
        let complete = Candidate::new("A").with_grades(Some(Grade::C), Some(Grade::C));
        let eco_only = Candidate::new("B").with_grades(Some(Grade::C), None);

        let out = rank(
            vec![
                scored(complete, Provenance::External, 0.5),
                scored(eco_only, Provenance::External, 0.5),
            ],
            &RankingWeights::default(),
            &FairnessWeights::default(),
        );

        let complete = out.iter().find(|s| s.candidate.name == "A").unwrap();
        let partial = out.iter().find(|s| s.candidate.name == "B").unwrap();
        let gap = complete.combined - partial.combined;
        // 0.05 bonus plus the weighted nutri contribution (0.6 * 0.1 * 0.4).
        assert!((gap - 0.074).abs() < 1e-6, "got {gap}");
    }

    #[test]
    fn equal_combined_breaks_on_relevance() {
        // Fairness-only weights make the combined scores identical.
        let weights = RankingWeights {
            relevance: 0.0,
            fairness: 1.0,
            completeness_bonus: 0.0,
        };
        let out = rank(
            vec![
                scored(Candidate::new("Schwach"), Provenance::External, 0.5),
                scored(Candidate::new("Stark"), Provenance::External, 0.9),
            ],
            &weights,
            &FairnessWeights::default(),
        );
        assert_eq!(out[0].candidate.name, "Stark");
    }

    #[test]
    fn full_ties_preserve_input_order() {
        let out = rank(
            vec![
                scored(Candidate::new("Erster"), Provenance::External, 0.7),
                scored(Candidate::new("Zweiter"), Provenance::External, 0.7),
            ],
            &RankingWeights::default(),
            &FairnessWeights::default(),
        );
        assert_eq!(out[0].candidate.name, "Erster");
        assert_eq!(out[1].candidate.name, "Zweiter");
    }
}
