//! dedup.rs — Canonical identity and duplicate merging.
//!
//! Identity is the barcode when present, otherwise the product name reduced
//! to lowercase ASCII alphanumerics. Within a duplicate group the
//! highest-relevance record survives, but missing descriptive fields (brand,
//! grades, ethics, image) are copied in from the losers so the merged record
//! is at least as informative as any member.

use indexmap::IndexMap;

use crate::candidate::{Candidate, ScoredCandidate};

/// Collapse a product name for identity comparison. Umlauts and punctuation
/// are dropped entirely, matching how catalog names vary between sources.
pub fn normalize_name(name: &str) -> String {
    name.to_lowercase()
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .collect()
}

/// Duplicate-group key: barcode wins, name fallback.
pub fn dedup_key(candidate: &Candidate) -> String {
    match candidate.barcode.as_deref().filter(|b| !b.is_empty()) {
        Some(barcode) => barcode.to_string(),
        None => normalize_name(&candidate.name),
    }
}

/// Copy fields `dst` is missing from `src`. Present values are never
/// overwritten; ethics score and issues travel together. Also used by the
/// barcode enrichment step, not just the duplicate merge.
pub fn merge_missing(dst: &mut Candidate, src: &Candidate) {
    if dst.brand.is_none() {
        dst.brand = src.brand.clone();
    }
    if dst.eco_grade.is_none() {
        dst.eco_grade = src.eco_grade;
    }
    if dst.nutri_grade.is_none() {
        dst.nutri_grade = src.nutri_grade;
    }
    if dst.ethics_score.is_none() {
        if let Some(score) = src.ethics_score {
            dst.ethics_score = Some(score);
            dst.ethics_issues = src.ethics_issues.clone();
        }
    }
    if dst.image_url.is_none() {
        dst.image_url = src.image_url.clone();
    }
}

/// Group by identity, keep the best-scoring member of each group and fill its
/// gaps from the rest. Group order follows first appearance in the input.
pub fn deduplicate(candidates: Vec<ScoredCandidate>) -> Vec<ScoredCandidate> {
    let mut groups: IndexMap<String, Vec<ScoredCandidate>> = IndexMap::new();
    for scored in candidates {
        groups
            .entry(dedup_key(&scored.candidate))
            .or_default()
            .push(scored);
    }

    let mut deduped = Vec::with_capacity(groups.len());
    for (_, mut items) in groups {
        items.sort_by(|a, b| b.relevance.total_cmp(&a.relevance));
        let mut best = items.remove(0);
        for other in &items {
            merge_missing(&mut best.candidate, &other.candidate);
        }
        deduped.push(best);
    }
    deduped
}
