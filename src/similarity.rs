//! similarity.rs — Text similarity between one expanded query term and one
//! candidate identifier.
//!
//! The ladder, tried in order:
//!
//! 1. target contains the whole query → 1.0
//! 2. single-word query equal to a target word → 0.95
//! 3. multi-token overlap ratio, accepted from 0.7 up
//! 4. normalized edit distance plus a prefix bonus, gated at
//!    `max(threshold, 0.6)`; below the gate the term scores 0.0
//!
//! Callers take the maximum over all expanded terms. Boosts for brands and
//! compound patterns are applied on top by the pipeline, capped at 1.0.

use once_cell::sync::Lazy;
use regex::Regex;
use strsim::normalized_levenshtein;

use crate::vocab::Vocabulary;

const EXACT_WORD_SCORE: f32 = 0.95;
const MULTI_TOKEN_CUTOFF: f32 = 0.7;
const PREFIX_BONUS: f32 = 0.18;
const EDIT_DISTANCE_GATE: f32 = 0.6;

/// Similarity of `query` against `target` in 0.0..=1.0. Scores below the
/// effective gate collapse to 0.0 so weak matches never accumulate.
pub fn fuzzy_match(query: &str, target: &str, threshold: f32) -> f32 {
    let q = query.to_lowercase();
    let q = q.trim();
    let t = target.to_lowercase();
    let t = t.trim();

    if t.contains(q) {
        return 1.0;
    }

    let q_words: Vec<&str> = q.split_whitespace().collect();
    let t_words: Vec<&str> = t.split_whitespace().collect();

    if q_words.len() == 1 && t_words.iter().any(|w| *w == q) {
        return EXACT_WORD_SCORE;
    }

    let multi = multi_token_ratio(&q_words, &t_words);
    if multi >= MULTI_TOKEN_CUTOFF {
        return multi;
    }

    let similarity = normalized_levenshtein(q, t) as f32;

    let mut prefix_bonus = 0.0;
    'outer: for qw in &q_words {
        for tw in &t_words {
            if tw.starts_with(qw) && qw.chars().count() >= 2 {
                prefix_bonus = PREFIX_BONUS;
                break 'outer;
            }
        }
    }

    let final_score = (similarity + prefix_bonus).min(1.0);
    if final_score >= threshold.max(EDIT_DISTANCE_GATE) {
        final_score
    } else {
        0.0
    }
}

/// Fraction of query tokens that overlap a target token in either containment
/// direction.
fn multi_token_ratio(q_words: &[&str], t_words: &[&str]) -> f32 {
    if q_words.is_empty() {
        return 0.0;
    }
    let matched = q_words
        .iter()
        .filter(|qt| t_words.iter().any(|tt| tt.contains(*qt) || qt.contains(tt)))
        .count();
    matched as f32 / q_words.len() as f32
}

/// True when the query names a known brand that the target also carries.
pub fn brand_match(query: &str, target: &str, brands: &[String]) -> bool {
    let q = query.to_lowercase();
    let t = target.to_lowercase();
    brands
        .iter()
        .any(|brand| q.contains(brand.as_str()) && t.contains(brand.as_str()))
}

static RE_REGEX_SPECIALS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[.*+?^${}()|\[\]\\]").expect("regex specials class"));

/// Precompiled whole-word and compound patterns for one query token. Built
/// once per search, then run against every candidate haystack.
#[derive(Debug)]
pub struct CompoundMatcher {
    patterns: Vec<Regex>,
}

impl CompoundMatcher {
    /// `None` when the token is empty after sanitizing, or no pattern
    /// compiles.
    pub fn build(token: &str, vocab: &Vocabulary) -> Option<Self> {
        let t = token.to_lowercase();
        let t = RE_REGEX_SPECIALS.replace_all(t.trim(), "");
        if t.is_empty() {
            return None;
        }

        let suffixes: Vec<String> = vocab
            .compound_suffixes
            .iter()
            .filter(|s| !s.contains(char::is_whitespace))
            .map(|s| regex::escape(&s.to_lowercase()))
            .collect();
        let prefixes: Vec<String> = vocab
            .compound_prefixes
            .iter()
            .filter(|p| !p.contains(char::is_whitespace))
            .map(|p| regex::escape(&p.to_lowercase()))
            .collect();

        let mut raw = vec![format!(r"\b{t}\b")];
        if !suffixes.is_empty() {
            raw.push(format!(r"\b{t}[- ]?(?:{})\b", suffixes.join("|")));
        }
        if !prefixes.is_empty() {
            raw.push(format!(r"\b(?:{})\s+{t}\b", prefixes.join("|")));
        }

        let patterns: Vec<Regex> = raw
            .iter()
            .filter_map(|p| Regex::new(p).ok())
            .collect();
        if patterns.is_empty() {
            None
        } else {
            Some(Self { patterns })
        }
    }

    /// Haystack must already be lowercased (see `Candidate::haystack`).
    pub fn matches(&self, haystack: &str) -> bool {
        self.patterns.iter().any(|p| p.is_match(haystack))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-4
    }

    #[test]
    fn containment_is_a_perfect_match() {
        assert!(approx(fuzzy_match("milch", "Frische Vollmilch 1l", 0.6), 1.0));
        assert!(approx(fuzzy_match("Hafermilch", "Oatly Hafermilch Barista", 0.6), 1.0));
    }

    #[test]
    fn multi_token_overlap_counts_both_directions() {
        // "hafer" and "drink" are both contained in "haferdrink".
        assert!(approx(fuzzy_match("hafer drink", "Haferdrink Oatly", 0.6), 1.0));
        // One of three query tokens hits → 0.333, below the 0.7 cutoff, and
        // the edit-distance tier stays under its gate.
        let s = fuzzy_match("apfel birne kirsche", "Apfelmus", 0.6);
        assert!(approx(s, 0.0), "weak overlap must collapse to zero, got {s}");
    }

    #[test]
    fn edit_distance_handles_typos() {
        // One transposition away, no containment anywhere.
        let s = fuzzy_match("joghrut", "Joghurt", 0.6);
        assert!(approx(s, 1.0 - 2.0 / 7.0), "got {s}");
    }

    #[test]
    fn prefix_bonus_lifts_borderline_scores() {
        // Raw similarity 0.6, plus 0.18 for the "milchh" prefix hit.
        let s = fuzzy_match("milchh kuh", "milchhof", 0.6);
        assert!(approx(s, 0.78), "got {s}");
    }

    #[test]
    fn gate_never_drops_below_default() {
        // A permissive threshold still gates the edit-distance tier at 0.6.
        let s = fuzzy_match("apfel birne kirsche", "Apfelmus", 0.3);
        assert!(approx(s, 0.0));
        assert!(approx(fuzzy_match("xyz", "milch", 0.6), 0.0));
    }

    #[test]
    fn brand_match_requires_both_sides() {
        let brands = Vocabulary::default_seed().brands;
        assert!(brand_match("oatly hafermilch", "Oatly Haferdrink 1l", &brands));
        assert!(!brand_match("hafermilch", "Oatly Haferdrink 1l", &brands));
        assert!(!brand_match("oatly hafermilch", "Alpro Haferdrink", &brands));
    }

    #[test]
    fn compound_matcher_hits_whole_words_and_compounds() {
        let vocab = Vocabulary::default_seed();
        let m = CompoundMatcher::build("hafer", &vocab).unwrap();
        assert!(m.matches("bio hafer flocken"));
        assert!(m.matches("oatly hafermilch 1l"));
        assert!(m.matches("hafer-drink klassik"));
        assert!(m.matches("oat hafer blend"));
        assert!(!m.matches("schafskäse"));
        assert!(!m.matches("haferflocken"), "compound must end at a known suffix");
    }

    #[test]
    fn compound_matcher_sanitizes_hostile_tokens() {
        let vocab = Vocabulary::default_seed();
        let m = CompoundMatcher::build("ha.fer*", &vocab).unwrap();
        assert!(m.matches("hafermilch"));
        assert!(CompoundMatcher::build("...", &vocab).is_none());
        assert!(CompoundMatcher::build("  ", &vocab).is_none());
    }
}
