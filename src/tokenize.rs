//! tokenize.rs — Query normalization.
//!
//! Turns raw user input like "2x330ml Hafermilch" into the core tokens the
//! matcher works with. Quantity noise goes first (amount+unit pairs, bare
//! multipliers, loose numbers), then everything that is not a German letter
//! becomes a separator. Surviving tokens must be at least three characters
//! and not a stop word; order and duplicates are preserved.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::vocab::Vocabulary;

static RE_AMOUNT_UNIT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\d+[,.]?\d*\s*(?:g|kg|ml|l|liter|st|stk|x)\b").expect("amount-unit regex")
});
static RE_MULTIPLIER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b\d+x\b").expect("multiplier regex"));
static RE_BARE_NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b\d+[,.]?\d*\b").expect("bare number regex"));
static RE_NON_LETTER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^a-zäöüß\s]").expect("non-letter regex"));

/// Lowercase and blank out quantity fragments and non-letter characters.
pub fn strip_quantities(text: &str) -> String {
    let lowered = text.to_lowercase();
    let pass = RE_AMOUNT_UNIT.replace_all(&lowered, " ");
    let pass = RE_MULTIPLIER.replace_all(&pass, " ");
    let pass = RE_BARE_NUMBER.replace_all(&pass, " ");
    RE_NON_LETTER.replace_all(&pass, " ").into_owned()
}

/// Core tokens of a query: normalized words of length >= 3 that are not stop
/// words. An empty result means the query was all noise.
pub fn core_tokens(vocab: &Vocabulary, query: &str) -> Vec<String> {
    strip_quantities(query)
        .split_whitespace()
        .filter(|t| t.chars().count() >= 3 && !vocab.is_stop_word(t))
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vocab() -> Vocabulary {
        Vocabulary::default_seed()
    }

    #[test]
    fn strips_amount_unit_and_multiplier() {
        assert_eq!(core_tokens(&vocab(), "2x330ml Hafermilch"), ["hafermilch"]);
        assert_eq!(core_tokens(&vocab(), "1,5l Wasser"), ["wasser"]);
        assert_eq!(core_tokens(&vocab(), "500 g Mehl"), ["mehl"]);
    }

    #[test]
    fn drops_stop_words_and_short_tokens() {
        assert_eq!(
            core_tokens(&vocab(), "Milch für die Kinder"),
            ["milch", "kinder"]
        );
        assert!(core_tokens(&vocab(), "Öl").is_empty());
        assert!(core_tokens(&vocab(), "und oder mit").is_empty());
    }

    #[test]
    fn punctuation_becomes_a_separator() {
        assert_eq!(
            core_tokens(&vocab(), "Gut&Günstig Joghurt"),
            ["gut", "günstig", "joghurt"]
        );
        // The single letter left of the dash does not survive the length filter.
        assert_eq!(core_tokens(&vocab(), "H-Milch"), ["milch"]);
    }

    #[test]
    fn keeps_order_and_duplicates() {
        assert_eq!(
            core_tokens(&vocab(), "Milch Brot Milch"),
            ["milch", "brot", "milch"]
        );
    }

    #[test]
    fn all_noise_yields_nothing() {
        assert!(core_tokens(&vocab(), "").is_empty());
        assert!(core_tokens(&vocab(), "2x 500g 12").is_empty());
        assert!(core_tokens(&vocab(), "!!! ???").is_empty());
    }
}
