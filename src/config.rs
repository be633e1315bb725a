//! config.rs — Tunable knobs of the pipeline: thresholds, floors, fetch
//! budgets and blend weights. Loaded from TOML with env overrides; every
//! field has a calibrated default so an absent file means defaults, not an
//! error.

use serde::Deserialize;
use std::{fs, path::PathBuf};

use crate::fairness::FairnessWeights;
use crate::rank::RankingWeights;

pub const DEFAULT_MATCHER_CONFIG_PATH: &str = "config/matcher.toml";
pub const DEFAULT_SCORE_THRESHOLD: f32 = 0.6;

pub const ENV_MATCHER_CONFIG_PATH: &str = "MATCHER_CONFIG_PATH";
pub const ENV_MATCHER_SCORE_THRESHOLD: &str = "MATCHER_SCORE_THRESHOLD";

/// External catalog fetch budgets. Single-token queries fetch wider because
/// one stem ("hafer") fans out into many compound products.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct ExternalFetchConfig {
    pub page_size: usize,
    pub page_size_single_token: usize,
    pub max_results: usize,
    pub max_results_single_token: usize,
    /// Hard cap on morphology-driven alternate fetches per search.
    pub max_alternate_queries: usize,
}

impl Default for ExternalFetchConfig {
    fn default() -> Self {
        Self {
            page_size: 50,
            page_size_single_token: 100,
            max_results: 120,
            max_results_single_token: 400,
            max_alternate_queries: 4,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct MatcherConfig {
    /// Base relevance gate for multi-token queries.
    pub score_threshold: f32,
    /// Acceptance floor for single-token queries.
    pub single_token_floor: f32,
    /// Acceptance floor for alternate-query (recall) passes.
    pub exploratory_floor: f32,
    /// Fewer local matches than this asks the external catalog for help.
    pub min_local_matches: usize,
    /// A best local score below this asks the external catalog for help.
    pub good_local_score: f32,
    /// Flat relevance head start for local candidates, capped at 1.0 overall.
    pub local_relevance_bonus: f32,
    pub brand_boost: f32,
    pub compound_boost: f32,
    pub shortlist: usize,
    /// Below this many usable results a warning is logged.
    pub min_shortlist: usize,
    pub external: ExternalFetchConfig,
    pub ranking: RankingWeights,
    pub fairness: FairnessWeights,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            score_threshold: DEFAULT_SCORE_THRESHOLD,
            single_token_floor: 0.50,
            exploratory_floor: 0.40,
            min_local_matches: 5,
            good_local_score: 0.85,
            local_relevance_bonus: 0.15,
            brand_boost: 0.2,
            compound_boost: 0.20,
            shortlist: 8,
            min_shortlist: 3,
            external: ExternalFetchConfig::default(),
            ranking: RankingWeights::default(),
            fairness: FairnessWeights::default(),
        }
    }
}

impl MatcherConfig {
    /// Parse from a TOML string. Unknown fields are rejected by value, absent
    /// fields keep their defaults.
    pub fn from_toml_str(toml_str: &str) -> anyhow::Result<Self> {
        let mut cfg: MatcherConfig = toml::from_str(toml_str)?;
        cfg.harden();
        Ok(cfg)
    }

    /// Load from `MATCHER_CONFIG_PATH` (default `config/matcher.toml`). A
    /// missing file yields defaults; a present but malformed file is an
    /// error. `MATCHER_SCORE_THRESHOLD` overrides the threshold last.
    pub fn load() -> anyhow::Result<Self> {
        let path = std::env::var(ENV_MATCHER_CONFIG_PATH)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_MATCHER_CONFIG_PATH));

        let mut cfg = if path.exists() {
            let content = fs::read_to_string(&path).map_err(|e| {
                anyhow::anyhow!("Failed to read matcher config at {}: {}", path.display(), e)
            })?;
            Self::from_toml_str(&content)?
        } else {
            Self::default()
        };

        if let Some(t) = parse_threshold_env(std::env::var(ENV_MATCHER_SCORE_THRESHOLD).ok()) {
            cfg.score_threshold = t;
        }
        cfg.harden();
        Ok(cfg)
    }

    /// Acceptance floor for the main candidate pool.
    pub fn pool_floor(&self, single_token: bool) -> f32 {
        if single_token {
            self.single_token_floor
        } else {
            self.score_threshold
        }
    }

    fn harden(&mut self) {
        if !self.score_threshold.is_finite() {
            self.score_threshold = DEFAULT_SCORE_THRESHOLD;
        }
        self.score_threshold = self.score_threshold.clamp(0.0, 1.0);
        self.single_token_floor = self.single_token_floor.clamp(0.0, 1.0);
        self.exploratory_floor = self.exploratory_floor.clamp(0.0, 1.0);
        if self.shortlist == 0 {
            self.shortlist = 1;
        }
    }
}

// parse optional float env and clamp to <0.0..=1.0>
fn parse_threshold_env(raw: Option<String>) -> Option<f32> {
    raw.and_then(|s| s.trim().parse::<f32>().ok())
        .map(|v| v.clamp(0.0, 1.0))
}
