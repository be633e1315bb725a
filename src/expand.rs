//! expand.rs — Query expansion.
//!
//! Core tokens grow into two layered term sets. Anchors are the words that
//! directly denote the product: the tokens themselves plus every synonym hit.
//! Terms add category members on top and drive scoring. Morphological
//! variants stay outside both sets; they are consulted only for single-token
//! queries, by the scorer and by the bounded alternate external fetches.
//! Expansion never loses a core token.

use std::collections::HashSet;

use crate::tokenize::{core_tokens, strip_quantities};
use crate::vocab::Vocabulary;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpandedQuery {
    pub core_tokens: Vec<String>,
    /// Core tokens plus synonym hits; used for anchor-field diagnostics.
    pub anchors: Vec<String>,
    /// Anchors plus category members; every term is scored.
    pub terms: Vec<String>,
    /// Compound variants of the stem. Empty unless exactly one core token.
    pub morphs: Vec<String>,
    /// Canonical text for external search calls.
    pub search_text: String,
}

impl ExpandedQuery {
    pub fn is_single_token(&self) -> bool {
        self.core_tokens.len() == 1
    }
}

/// Expand a raw query. Order is deterministic: core tokens first, then
/// synonyms in table order, then category members. A query whose tokens all
/// fall to the length or stop-word filter ("Öl") degrades to one whole-text
/// term so containment matching still works.
pub fn expand(vocab: &Vocabulary, query: &str) -> ExpandedQuery {
    let core = core_tokens(vocab, query);

    let mut seen: HashSet<String> = HashSet::new();
    let mut anchors: Vec<String> = Vec::new();
    for token in &core {
        if seen.insert(token.clone()) {
            anchors.push(token.clone());
        }
    }
    for token in &core {
        for synonym in vocab.synonym_expansions(token) {
            if seen.insert(synonym.clone()) {
                anchors.push(synonym);
            }
        }
    }

    let mut terms = anchors.clone();
    // Category membership looks at the whole query, not per token.
    for member in vocab.category_expansions(query.trim()) {
        if seen.insert(member.clone()) {
            terms.push(member);
        }
    }

    if terms.is_empty() {
        let stripped = strip_quantities(query);
        let stripped = stripped.trim();
        if !stripped.is_empty() {
            anchors.push(stripped.to_string());
            terms.push(stripped.to_string());
        }
    }

    let morphs = if core.len() == 1 {
        vocab.morphological_expansions(&core[0])
    } else {
        Vec::new()
    };

    let search_text = if core.is_empty() {
        terms.first().cloned().unwrap_or_default()
    } else {
        core.join(" ")
    };

    ExpandedQuery {
        core_tokens: core,
        anchors,
        terms,
        morphs,
        search_text,
    }
}
