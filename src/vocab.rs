//! # Vocabulary
//!
//! Curated lookup tables driving query expansion and category reasoning:
//!
//! - Synonym groups keyed by a canonical head word ("milch" covers plant
//!   drinks and their English spellings).
//! - Category tables mapping a category name to its member words. Order is
//!   significant: the first matching category wins, so the maps are
//!   insertion-ordered.
//! - Query-token → excluded-category pairs ("milch" must not surface butter).
//! - Morphological compounds for single-token recall ("hafer" → "hafermilch").
//! - Known brands, German stop words, and the affix lists used both for
//!   synthesized compounds and for pattern boosts.
//!
//! Ships with a built-in seed; a JSON file can replace any table wholesale.

use indexmap::IndexMap;
use serde::Deserialize;
use std::{collections::HashSet, fs, path::Path};

#[derive(Debug, Clone, Deserialize)]
pub struct Vocabulary {
    #[serde(default)]
    pub synonyms: IndexMap<String, Vec<String>>,
    #[serde(default)]
    pub categories: IndexMap<String, Vec<String>>,
    /// Query token → category names whose products the token must not match.
    #[serde(default)]
    pub category_exclusions: IndexMap<String, Vec<String>>,
    /// Curated compounds per stem, tried before the generic affix heuristic.
    #[serde(default)]
    pub morphology: IndexMap<String, Vec<String>>,
    #[serde(default)]
    pub brands: Vec<String>,
    #[serde(default)]
    pub stop_words: HashSet<String>,
    #[serde(default)]
    pub compound_suffixes: Vec<String>,
    #[serde(default)]
    pub compound_prefixes: Vec<String>,
}

impl Default for Vocabulary {
    fn default() -> Self {
        Self::default_seed()
    }
}

impl Vocabulary {
    /// Load from a JSON file, falling back to the built-in seed on any error.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Self {
        match fs::read_to_string(path) {
            Ok(s) => serde_json::from_str(&s).unwrap_or_else(|_| Self::default_seed()),
            Err(_) => Self::default_seed(),
        }
    }

    /// Synonyms for a single word: every group the word belongs to
    /// contributes its head word and all members. The word itself is not
    /// returned. Order follows the tables; duplicates are dropped.
    pub fn synonym_expansions(&self, word: &str) -> Vec<String> {
        let w = word.to_lowercase();
        let w = w.trim();
        let mut out: Vec<String> = Vec::new();
        let mut seen: HashSet<&str> = HashSet::new();
        seen.insert(w);

        for (head, members) in &self.synonyms {
            if head == w || members.iter().any(|m| m == w) {
                if seen.insert(head) {
                    out.push(head.clone());
                }
                for m in members {
                    if seen.insert(m) {
                        out.push(m.clone());
                    }
                }
            }
        }
        out
    }

    /// Category members for a query: a category contributes all its members
    /// when the query is one of them, or when the query contains the category
    /// name ("getränke kalt" pulls in the drinks list).
    pub fn category_expansions(&self, query: &str) -> Vec<String> {
        let q = query.to_lowercase();
        let q = q.trim();
        let mut out: Vec<String> = Vec::new();
        let mut seen: HashSet<&str> = HashSet::new();

        for (category, members) in &self.categories {
            if members.iter().any(|m| m == q) || q.contains(category.as_str()) {
                for m in members {
                    if seen.insert(m) {
                        out.push(m.clone());
                    }
                }
            }
        }
        out
    }

    /// First category whose member word occurs in the product name.
    pub fn category_of(&self, product_name: &str) -> Option<&str> {
        let name = product_name.to_lowercase();
        self.categories
            .iter()
            .find(|(_, members)| members.iter().any(|m| name.contains(m.as_str())))
            .map(|(category, _)| category.as_str())
    }

    pub fn exclusions_for(&self, token: &str) -> &[String] {
        self.category_exclusions
            .get(token)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Compound variants of a stem: the curated list first, then the stem
    /// joined with each known suffix and each known prefix. Only used for
    /// single-token queries.
    pub fn morphological_expansions(&self, token: &str) -> Vec<String> {
        let t = token.to_lowercase();
        let t = t.trim();
        if t.is_empty() {
            return Vec::new();
        }

        let mut out: Vec<String> = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();
        let mut push = |s: String, out: &mut Vec<String>| {
            if s.chars().count() > 2 && seen.insert(s.clone()) {
                out.push(s);
            }
        };

        if let Some(curated) = self.morphology.get(t) {
            for variant in curated {
                push(variant.clone(), &mut out);
            }
        }
        for suffix in &self.compound_suffixes {
            push(format!("{t} {suffix}"), &mut out);
        }
        for prefix in &self.compound_prefixes {
            push(format!("{prefix} {t}"), &mut out);
        }
        out
    }

    pub fn is_stop_word(&self, word: &str) -> bool {
        self.stop_words.contains(word)
    }

    /// Built-in German grocery seed. Used whenever no vocabulary file is
    /// provided or it fails to parse.
    pub fn default_seed() -> Self {
        let mut synonyms = IndexMap::new();
        for (head, members) in [
            (
                "milch",
                vec![
                    "milch",
                    "vollmilch",
                    "frischmilch",
                    "h-milch",
                    "hafermilch",
                    "haferdrink",
                    "hafer",
                    "oat",
                    "oatmilk",
                    "oat-milk",
                    "mandelmilch",
                    "mandel",
                    "almond",
                    "almondmilk",
                    "sojamilch",
                    "sojadrink",
                    "soja",
                    "soy",
                    "soy-milk",
                    "kokosmilch",
                    "coconut",
                    "drink",
                    "pflanzenmilch",
                    "plant milk",
                    "plantmilk",
                ],
            ),
            ("joghurt", vec!["joghurt", "jogurt", "yogurt", "yoghurt"]),
            ("käse", vec!["käse", "cheese", "gouda", "emmentaler"]),
            ("brot", vec!["brot", "bread", "vollkornbrot", "toast"]),
        ] {
            synonyms.insert(
                head.to_string(),
                members.into_iter().map(str::to_string).collect(),
            );
        }

        let mut categories = IndexMap::new();
        for (category, members) in [
            ("obst", vec!["apfel", "birne", "banane", "orange", "erdbeere"]),
            (
                "gemüse",
                vec!["tomate", "gurke", "paprika", "salat", "möhre", "kartoffel"],
            ),
            (
                "milchprodukte",
                vec!["milch", "joghurt", "käse", "quark", "sahne"],
            ),
            ("butter", vec!["butter", "margarine"]),
            (
                "fleisch",
                vec!["rind", "schwein", "hähnchen", "huhn", "pute", "wurst"],
            ),
            (
                "getränke",
                vec!["wasser", "saft", "limonade", "cola", "tee", "kaffee", "bier"],
            ),
        ] {
            categories.insert(
                category.to_string(),
                members.into_iter().map(str::to_string).collect(),
            );
        }

        let mut category_exclusions = IndexMap::new();
        for (token, excluded) in [("milch", vec!["butter"]), ("joghurt", vec!["butter"])] {
            category_exclusions.insert(
                token.to_string(),
                excluded.into_iter().map(str::to_string).collect(),
            );
        }

        let mut morphology = IndexMap::new();
        for (stem, compounds) in [
            (
                "hafer",
                vec![
                    "hafermilch",
                    "haferdrink",
                    "oat milk",
                    "oatmilk",
                    "oat-milk",
                    "hafermilch barista",
                ],
            ),
            (
                "mandel",
                vec!["mandelmilch", "mandeldrink", "almond milk", "almondmilk"],
            ),
            (
                "soja",
                vec!["sojamilch", "sojadrink", "soy milk", "soya milk"],
            ),
            ("reis", vec!["reismilch", "reisdrink", "rice milk", "ricemilk"]),
        ] {
            morphology.insert(
                stem.to_string(),
                compounds.into_iter().map(str::to_string).collect(),
            );
        }

        let brands = [
            "danone",
            "müller",
            "arla",
            "weihenstephan",
            "alpro",
            "oatly",
            "nestlé",
            "coca-cola",
        ]
        .into_iter()
        .map(str::to_string)
        .collect();

        let stop_words = [
            "der", "die", "das", "den", "dem", "ein", "eine", "einen", "einem", "und", "oder",
            "mit", "ohne", "für", "zum", "zur", "von", "im", "in", "auf", "an", "am", "zu", "bei",
        ]
        .into_iter()
        .map(str::to_string)
        .collect();

        let compound_suffixes = ["milch", "drink", "drink barista", "barista", "milk"]
            .into_iter()
            .map(str::to_string)
            .collect();

        let compound_prefixes = ["oat", "almond", "soy", "rice"]
            .into_iter()
            .map(str::to_string)
            .collect();

        Self {
            synonyms,
            categories,
            category_exclusions,
            morphology,
            brands,
            stop_words,
            compound_suffixes,
            compound_prefixes,
        }
    }
}
