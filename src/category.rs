//! category.rs — Category inference and query-scoped exclusion.
//!
//! A product's category is inferred from its name via the vocabulary tables;
//! a query token can then veto whole categories ("milch" never surfaces
//! butter even though dairy terms overlap). Exclusion is enforced: an
//! excluded candidate scores 0.0 relevance and falls to the quality gate.
//! The hit is still reported so vocabulary tuning stays observable.

use crate::vocab::Vocabulary;

/// Why a candidate was vetoed: which query token excluded which category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Exclusion<'a> {
    pub token: &'a str,
    pub category: &'a str,
}

/// Check a product name against the exclusion table for the given query
/// tokens. `None` when the product has no known category or no token vetoes
/// it.
pub fn check_exclusion<'a>(
    vocab: &'a Vocabulary,
    core_tokens: &'a [String],
    product_name: &str,
) -> Option<Exclusion<'a>> {
    let category = vocab.category_of(product_name)?;
    for token in core_tokens {
        if vocab.exclusions_for(token).iter().any(|c| c == category) {
            return Some(Exclusion { token, category });
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(words: &[&str]) -> Vec<String> {
        words.iter().map(|w| w.to_string()).collect()
    }

    #[test]
    fn milk_query_vetoes_butter_products() {
        let vocab = Vocabulary::default_seed();
        let q = tokens(&["milch"]);

        let hit = check_exclusion(&vocab, &q, "Kerrygold Original Butter").unwrap();
        assert_eq!(hit.token, "milch");
        assert_eq!(hit.category, "butter");

        assert!(check_exclusion(&vocab, &q, "Frische Vollmilch 1l").is_none());
    }

    #[test]
    fn yogurt_query_also_vetoes_butter() {
        let vocab = Vocabulary::default_seed();
        let q = tokens(&["joghurt"]);
        assert!(check_exclusion(&vocab, &q, "Süßrahmbutter 250g").is_some());
    }

    #[test]
    fn tokens_without_rules_never_exclude() {
        let vocab = Vocabulary::default_seed();
        let q = tokens(&["brot"]);
        assert!(check_exclusion(&vocab, &q, "Markenbutter").is_none());
    }

    #[test]
    fn unknown_category_cannot_be_excluded() {
        let vocab = Vocabulary::default_seed();
        let q = tokens(&["milch"]);
        assert!(check_exclusion(&vocab, &q, "Zahnpasta").is_none());
    }
}
