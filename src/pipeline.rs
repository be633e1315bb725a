//! pipeline.rs — The suggestion pipeline: expand the query, score the local
//! pool, decide whether the external catalog is needed, score its results,
//! then dedup, rank and enrich a shortlist.
//!
//! Catalogs are injected as trait objects; the pipeline owns no transport.
//! Every upstream failure degrades (logged, pool stays smaller) except one
//! contract violation: a pipeline configured with no catalog at all. A
//! `SearchSequencer` hands out generation tickets so a stale search can be
//! discarded instead of overwriting a newer one's results.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use metrics::{counter, gauge, histogram};
use tracing::{debug, warn};

use crate::candidate::{Candidate, MatchedField, Provenance, ScoredCandidate};
use crate::catalog::{CommunityStats, ExternalCatalog, LocalCatalog};
use crate::category::check_exclusion;
use crate::config::MatcherConfig;
use crate::dedup::{deduplicate, merge_missing};
use crate::ethics::EthicsTable;
use crate::expand::{expand, ExpandedQuery};
use crate::rank::rank;
use crate::similarity::{brand_match, fuzzy_match, CompoundMatcher};
use crate::telemetry::{dev_log_search, ensure_metrics_described};
use crate::vocab::Vocabulary;

/// One search request. `allow_external` lets the host force local-only mode
/// (offline, privacy setting) regardless of what the pool looks like.
#[derive(Debug, Clone)]
pub struct SuggestionRequest {
    pub query: String,
    pub store: Option<String>,
    pub allow_external: bool,
}

impl SuggestionRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            store: None,
            allow_external: true,
        }
    }

    pub fn with_store(mut self, store: impl Into<String>) -> Self {
        self.store = Some(store.into());
        self
    }

    pub fn local_only(mut self) -> Self {
        self.allow_external = false;
        self
    }
}

/// Issues monotonically increasing search generations. The newest ticket is
/// the only current one; older searches observe that and discard themselves.
#[derive(Clone, Default)]
pub struct SearchSequencer {
    latest: Arc<AtomicU64>,
}

impl SearchSequencer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin(&self) -> SearchTicket {
        let generation = self.latest.fetch_add(1, Ordering::SeqCst) + 1;
        SearchTicket {
            generation,
            latest: Arc::clone(&self.latest),
        }
    }
}

pub struct SearchTicket {
    generation: u64,
    latest: Arc<AtomicU64>,
}

impl SearchTicket {
    pub fn is_current(&self) -> bool {
        self.latest.load(Ordering::SeqCst) == self.generation
    }
}

/// Result of a ticketed search.
#[derive(Debug, Clone, PartialEq)]
pub enum SearchOutcome {
    Ranked(Vec<ScoredCandidate>),
    /// A newer search started while this one was suspended; its results were
    /// discarded unapplied.
    Superseded,
}

/// Why the external catalog was consulted.
#[derive(Debug)]
struct ExternalNeed {
    needed: bool,
    reasons: Vec<&'static str>,
}

fn assess_external_need(locals: &[ScoredCandidate], config: &MatcherConfig) -> ExternalNeed {
    let mut reasons = Vec::new();
    if locals.len() < config.min_local_matches {
        reasons.push("few_local_matches");
    }
    let best = locals.iter().map(|s| s.relevance).fold(0.0f32, f32::max);
    if best < config.good_local_score {
        reasons.push("weak_best_score");
    }
    if locals.iter().any(|s| s.candidate.missing_both_grades()) {
        reasons.push("missing_grades");
    }
    ExternalNeed {
        needed: !reasons.is_empty(),
        reasons,
    }
}

/// First candidate field containing an anchor term. Name is checked before
/// brand, store and category labels.
fn anchor_field(anchors: &[String], candidate: &Candidate) -> Option<MatchedField> {
    let name = candidate.name.to_lowercase();
    if anchors.iter().any(|a| name.contains(a.as_str())) {
        return Some(MatchedField::Name);
    }
    if let Some(brand) = &candidate.brand {
        let brand = brand.to_lowercase();
        if anchors.iter().any(|a| brand.contains(a.as_str())) {
            return Some(MatchedField::Brand);
        }
    }
    if let Some(store) = &candidate.store {
        let store = store.to_lowercase();
        if anchors.iter().any(|a| store.contains(a.as_str())) {
            return Some(MatchedField::Store);
        }
    }
    for category in &candidate.categories {
        let category = category.to_lowercase();
        if anchors.iter().any(|a| category.contains(a.as_str())) {
            return Some(MatchedField::Category);
        }
    }
    None
}

pub struct SuggestionPipeline {
    config: MatcherConfig,
    vocab: Arc<Vocabulary>,
    ethics: Arc<EthicsTable>,
    local: Option<Arc<dyn LocalCatalog>>,
    external: Option<Arc<dyn ExternalCatalog>>,
    community: Option<Arc<dyn CommunityStats>>,
    sequencer: SearchSequencer,
}

impl SuggestionPipeline {
    pub fn new(config: MatcherConfig) -> Self {
        Self {
            config,
            vocab: Arc::new(Vocabulary::default_seed()),
            ethics: Arc::new(EthicsTable::default_seed()),
            local: None,
            external: None,
            community: None,
            sequencer: SearchSequencer::new(),
        }
    }

    pub fn with_vocabulary(mut self, vocab: Vocabulary) -> Self {
        self.vocab = Arc::new(vocab);
        self
    }

    pub fn with_ethics(mut self, table: EthicsTable) -> Self {
        self.ethics = Arc::new(table);
        self
    }

    pub fn with_local_catalog(mut self, catalog: Arc<dyn LocalCatalog>) -> Self {
        self.local = Some(catalog);
        self
    }

    pub fn with_external_catalog(mut self, catalog: Arc<dyn ExternalCatalog>) -> Self {
        self.external = Some(catalog);
        self
    }

    pub fn with_community_stats(mut self, stats: Arc<dyn CommunityStats>) -> Self {
        self.community = Some(stats);
        self
    }

    pub fn config(&self) -> &MatcherConfig {
        &self.config
    }

    pub fn sequencer(&self) -> &SearchSequencer {
        &self.sequencer
    }

    /// Top-level entry point. Begins a fresh generation; if another search
    /// starts while this one is in flight, the stale results come back as an
    /// empty list.
    pub async fn find_suggestions(
        &self,
        request: &SuggestionRequest,
    ) -> Result<Vec<ScoredCandidate>> {
        let ticket = self.sequencer.begin();
        match self.find_suggestions_with_ticket(request, &ticket).await? {
            SearchOutcome::Ranked(list) => Ok(list),
            SearchOutcome::Superseded => Ok(Vec::new()),
        }
    }

    /// Ticketed variant for hosts that drive the sequencer themselves (one
    /// ticket per keystroke, newest wins).
    pub async fn find_suggestions_with_ticket(
        &self,
        request: &SuggestionRequest,
        ticket: &SearchTicket,
    ) -> Result<SearchOutcome> {
        ensure_metrics_described();
        if self.local.is_none() && self.external.is_none() {
            anyhow::bail!("suggestion pipeline has no catalog source configured");
        }

        let t0 = Instant::now();
        counter!("match_searches_total").increment(1);

        let query = request.query.trim();
        if query.is_empty() {
            return Ok(SearchOutcome::Ranked(Vec::new()));
        }

        let expansion = expand(&self.vocab, query);
        if expansion.terms.is_empty() {
            return Ok(SearchOutcome::Ranked(Vec::new()));
        }
        let single = expansion.is_single_token();
        let compound = if single {
            CompoundMatcher::build(&expansion.core_tokens[0], &self.vocab)
        } else {
            None
        };

        let mut excluded = 0u64;

        // Local pool.
        let mut locals_kept: Vec<ScoredCandidate> = Vec::new();
        if let Some(local) = &self.local {
            match local.products(request.store.as_deref()).await {
                Ok(products) => {
                    for mut cand in products {
                        self.ethics.apply_to(&mut cand);
                        let scored = self.score_candidate(
                            cand,
                            Provenance::Local,
                            &expansion,
                            compound.as_ref(),
                            query,
                        );
                        if scored.excluded {
                            excluded += 1;
                            continue;
                        }
                        if scored.relevance >= self.config.pool_floor(single) {
                            locals_kept.push(scored);
                        }
                    }
                }
                Err(e) => {
                    warn!(target: "suggest", error = ?e, provider = local.name(), "local catalog unavailable");
                }
            }
        }
        counter!("match_local_candidates_total").increment(locals_kept.len() as u64);

        if !ticket.is_current() {
            counter!("match_superseded_total").increment(1);
            return Ok(SearchOutcome::Superseded);
        }

        // Fill grade gaps in local records via barcode lookup before deciding
        // whether a full external search is needed.
        if request.allow_external {
            if let Some(external) = &self.external {
                for scored in &mut locals_kept {
                    if scored.candidate.eco_grade.is_some() && scored.candidate.nutri_grade.is_some()
                    {
                        continue;
                    }
                    let Some(barcode) = scored.candidate.barcode.clone() else {
                        continue;
                    };
                    let fetch_t0 = Instant::now();
                    let looked_up = external.by_barcode(&barcode).await;
                    counter!("match_external_fetches_total").increment(1);
                    histogram!("match_external_fetch_ms")
                        .record(fetch_t0.elapsed().as_secs_f64() * 1_000.0);
                    match looked_up {
                        Ok(Some(mut found)) => {
                            self.ethics.apply_to(&mut found);
                            merge_missing(&mut scored.candidate, &found);
                        }
                        Ok(None) => {}
                        Err(e) => {
                            warn!(target: "suggest", error = ?e, provider = external.name(), "barcode enrichment failed");
                            counter!("match_external_errors_total").increment(1);
                        }
                    }
                }

                if !ticket.is_current() {
                    counter!("match_superseded_total").increment(1);
                    return Ok(SearchOutcome::Superseded);
                }
            }
        }

        let need = assess_external_need(&locals_kept, &self.config);

        // External pool.
        let mut externals_kept: Vec<ScoredCandidate> = Vec::new();
        if request.allow_external && need.needed && !expansion.search_text.is_empty() {
            if let Some(external) = &self.external {
                debug!(target: "suggest", reasons = ?need.reasons, "asking external catalog");
                let (page, max) = if single {
                    (
                        self.config.external.page_size_single_token,
                        self.config.external.max_results_single_token,
                    )
                } else {
                    (self.config.external.page_size, self.config.external.max_results)
                };

                let fetch_t0 = Instant::now();
                let fetched = external.search(&expansion.search_text, page, max).await;
                counter!("match_external_fetches_total").increment(1);
                histogram!("match_external_fetch_ms")
                    .record(fetch_t0.elapsed().as_secs_f64() * 1_000.0);
                match fetched {
                    Ok(found) => {
                        for mut cand in found {
                            self.ethics.apply_to(&mut cand);
                            let scored = self.score_candidate(
                                cand,
                                Provenance::External,
                                &expansion,
                                compound.as_ref(),
                                query,
                            );
                            if scored.excluded {
                                excluded += 1;
                                continue;
                            }
                            if scored.relevance >= self.config.pool_floor(single) {
                                externals_kept.push(scored);
                            }
                        }
                    }
                    Err(e) => {
                        warn!(target: "suggest", error = ?e, provider = external.name(), "external search failed");
                        counter!("match_external_errors_total").increment(1);
                    }
                }

                if !ticket.is_current() {
                    counter!("match_superseded_total").increment(1);
                    return Ok(SearchOutcome::Superseded);
                }

                // Alternate fetches widen recall for compound forms a short
                // stem cannot reach. Bounded; accepted at the exploratory
                // floor.
                if single {
                    for variant in expansion
                        .morphs
                        .iter()
                        .take(self.config.external.max_alternate_queries)
                    {
                        let fetch_t0 = Instant::now();
                        let fetched = external.search(variant, page, max).await;
                        counter!("match_external_fetches_total").increment(1);
                        histogram!("match_external_fetch_ms")
                            .record(fetch_t0.elapsed().as_secs_f64() * 1_000.0);
                        match fetched {
                            Ok(found) => {
                                for mut cand in found {
                                    self.ethics.apply_to(&mut cand);
                                    let scored = self.score_candidate(
                                        cand,
                                        Provenance::External,
                                        &expansion,
                                        compound.as_ref(),
                                        query,
                                    );
                                    if scored.excluded {
                                        excluded += 1;
                                        continue;
                                    }
                                    if scored.relevance >= self.config.exploratory_floor {
                                        externals_kept.push(scored);
                                    }
                                }
                            }
                            Err(e) => {
                                warn!(target: "suggest", error = ?e, provider = external.name(), "alternate search failed");
                                counter!("match_external_errors_total").increment(1);
                            }
                        }
                    }

                    if !ticket.is_current() {
                        counter!("match_superseded_total").increment(1);
                        return Ok(SearchOutcome::Superseded);
                    }
                }
            }
        }
        counter!("match_external_candidates_total").increment(externals_kept.len() as u64);
        if excluded > 0 {
            counter!("match_excluded_total").increment(excluded);
            debug!(target: "suggest", excluded, "candidates vetoed by category exclusion");
        }

        // Merge pools, locals first so full ties keep local records in front.
        let mut pool = locals_kept;
        pool.append(&mut externals_kept);
        pool.sort_by(|a, b| b.relevance.total_cmp(&a.relevance));

        let before_dedup = pool.len();
        let deduped = deduplicate(pool);
        let merged_away = before_dedup.saturating_sub(deduped.len()) as u64;
        if merged_away > 0 {
            counter!("match_deduped_total").increment(merged_away);
        }
        let ranked = rank(deduped, &self.config.ranking, &self.config.fairness);
        let mut shortlist: Vec<ScoredCandidate> =
            ranked.into_iter().take(self.config.shortlist).collect();

        if shortlist.len() < self.config.min_shortlist {
            counter!("match_underfilled_total").increment(1);
            warn!(
                target: "suggest",
                have = shortlist.len(),
                min = self.config.min_shortlist,
                "shortlist underfilled"
            );
        }

        self.enrich_shortlist(&mut shortlist).await;

        if !ticket.is_current() {
            counter!("match_superseded_total").increment(1);
            return Ok(SearchOutcome::Superseded);
        }

        let ms = t0.elapsed().as_secs_f64() * 1_000.0;
        histogram!("match_pipeline_ms").record(ms);
        gauge!("match_last_search_ts").set(chrono::Utc::now().timestamp().max(0) as f64);

        let best = shortlist.first().map(|s| s.combined).unwrap_or(0.0);
        dev_log_search(
            "search_done",
            query,
            &expansion.terms,
            shortlist.len(),
            best,
            self.config.score_threshold,
        );

        Ok(SearchOutcome::Ranked(shortlist))
    }

    /// Score one candidate against the expanded query. Exclusion wins over
    /// everything; otherwise relevance is the best term score plus the brand,
    /// compound and local boosts, capped at 1.0.
    fn score_candidate(
        &self,
        candidate: Candidate,
        provenance: Provenance,
        expansion: &ExpandedQuery,
        compound: Option<&CompoundMatcher>,
        raw_query: &str,
    ) -> ScoredCandidate {
        if let Some(hit) = check_exclusion(&self.vocab, &expansion.core_tokens, &candidate.name) {
            debug!(target: "suggest", token = hit.token, category = hit.category, "candidate excluded");
            let mut scored = ScoredCandidate::new(candidate, provenance, 0.0);
            scored.excluded = true;
            return scored;
        }

        let haystack = candidate.haystack();

        let mut relevance: f32 = 0.0;
        for term in &expansion.terms {
            relevance = relevance.max(fuzzy_match(
                term,
                &candidate.name,
                self.config.score_threshold,
            ));
        }
        // Morphs are empty unless the query is a single token.
        for variant in &expansion.morphs {
            relevance = relevance.max(fuzzy_match(
                variant,
                &candidate.name,
                self.config.score_threshold,
            ));
        }

        if brand_match(raw_query, &haystack, &self.vocab.brands) {
            relevance += self.config.brand_boost;
        }
        if let Some(matcher) = compound {
            if matcher.matches(&haystack) {
                relevance += self.config.compound_boost;
            }
        }
        if provenance == Provenance::Local {
            relevance += self.config.local_relevance_bonus;
        }
        let relevance = relevance.min(1.0);

        let matched_field = anchor_field(&expansion.anchors, &candidate);
        let mut scored = ScoredCandidate::new(candidate, provenance, relevance);
        scored.matched_field = matched_field;
        scored
    }

    /// Attach community data to the shortlist. Lookups fan out per candidate
    /// and settle together; failures leave the fields unset.
    async fn enrich_shortlist(&self, shortlist: &mut [ScoredCandidate]) {
        let Some(community) = &self.community else {
            return;
        };

        let mut handles = Vec::with_capacity(shortlist.len());
        for scored in shortlist.iter() {
            let community = Arc::clone(community);
            let key = scored
                .candidate
                .barcode
                .clone()
                .unwrap_or_else(|| scored.candidate.name.clone());
            let store = scored.candidate.store.clone();
            handles.push(tokio::spawn(async move {
                let rating = community.rating_stats(&key, store.as_deref()).await.ok().flatten();
                let price = match store.as_deref() {
                    Some(st) => community.best_price(&key, st).await.ok().flatten(),
                    None => None,
                };
                (rating, price)
            }));
        }

        for (scored, handle) in shortlist.iter_mut().zip(handles) {
            if let Ok((rating, price)) = handle.await {
                scored.rating = rating;
                if let Some(best) = price {
                    if scored.candidate.price.is_none() {
                        scored.candidate.price = Some(best.price);
                    }
                    scored.best_price = Some(best);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::candidate::Grade;
    use crate::catalog::MemoryCatalog;

    fn pipeline() -> SuggestionPipeline {
        SuggestionPipeline::new(MatcherConfig::default())
    }

    fn scored(name: &str, relevance: f32, grades: bool) -> ScoredCandidate {
        let mut c = Candidate::new(name);
        if grades {
            c = c.with_grades(Some(Grade::B), Some(Grade::B));
        }
        ScoredCandidate::new(c, Provenance::Local, relevance)
    }

    #[test]
    fn exclusion_zeroes_and_flags_the_candidate() {
        let p = pipeline();
        let ex = expand(&p.vocab, "milch");
        let out = p.score_candidate(
            Candidate::new("Kerrygold Original Butter"),
            Provenance::Local,
            &ex,
            None,
            "milch",
        );
        assert!(out.excluded);
        assert!((out.relevance - 0.0).abs() < 1e-6);
    }

    #[test]
    fn compound_boost_reaches_category_only_matches() {
        let p = pipeline();
        let ex = expand(&p.vocab, "hafer");
        let compound = CompoundMatcher::build("hafer", &p.vocab).unwrap();
        let candidate = Candidate::new("Barista Edition").with_category("Hafermilch");

        let external = p.score_candidate(
            candidate.clone(),
            Provenance::External,
            &ex,
            Some(&compound),
            "hafer",
        );
        assert!((external.relevance - 0.20).abs() < 1e-4, "got {}", external.relevance);
        assert_eq!(external.matched_field, Some(MatchedField::Category));

        let local = p.score_candidate(candidate, Provenance::Local, &ex, Some(&compound), "hafer");
        assert!((local.relevance - 0.35).abs() < 1e-4, "local head start on top");
    }

    #[test]
    fn brand_boost_needs_the_brand_on_both_sides() {
        let p = pipeline();
        let ex = expand(&p.vocab, "oatly wasser");
        let out = p.score_candidate(
            Candidate::new("Haferdrink").with_brand("Oatly"),
            Provenance::External,
            &ex,
            None,
            "oatly wasser",
        );
        assert!((out.relevance - 0.20).abs() < 1e-4, "got {}", out.relevance);
        assert_eq!(out.matched_field, Some(MatchedField::Brand));
    }

    #[test]
    fn morphs_let_a_stem_reach_compound_products() {
        let vocab: Vocabulary = serde_json::from_str(
            r#"{ "morphology": { "hafer": ["hafermilch", "oatmilk"] } }"#,
        )
        .unwrap();
        let p = pipeline().with_vocabulary(vocab);
        let ex = expand(&p.vocab, "hafer");
        assert_eq!(ex.terms, ["hafer"], "no synonyms in this vocabulary");

        let out = p.score_candidate(
            Candidate::new("Oatmilk Barista"),
            Provenance::External,
            &ex,
            None,
            "hafer",
        );
        assert!((out.relevance - 1.0).abs() < 1e-6);
    }

    #[test]
    fn external_need_lists_every_reason() {
        let cfg = MatcherConfig::default();

        let need = assess_external_need(&[], &cfg);
        assert!(need.needed);
        assert!(need.reasons.contains(&"few_local_matches"));
        assert!(need.reasons.contains(&"weak_best_score"));

        let strong: Vec<ScoredCandidate> =
            (0..5).map(|i| scored(&format!("p{i}"), 0.9, true)).collect();
        let need = assess_external_need(&strong, &cfg);
        assert!(!need.needed);

        let mut with_gap = strong;
        with_gap[2] = scored("p2", 0.9, false);
        let need = assess_external_need(&with_gap, &cfg);
        assert_eq!(need.reasons, ["missing_grades"]);
    }

    #[test]
    fn anchor_field_checks_name_before_brand() {
        let anchors = vec!["milch".to_string()];
        let c = Candidate::new("Vollmilch").with_brand("Milchwerke");
        assert_eq!(anchor_field(&anchors, &c), Some(MatchedField::Name));

        let c = Candidate::new("Barista Drink").with_brand("Milchwerke");
        assert_eq!(anchor_field(&anchors, &c), Some(MatchedField::Brand));

        let c = Candidate::new("Barista Drink").with_store("Milchladen");
        assert_eq!(anchor_field(&anchors, &c), Some(MatchedField::Store));

        let c = Candidate::new("Barista Drink");
        assert_eq!(anchor_field(&anchors, &c), None);
    }

    #[test]
    fn newer_ticket_supersedes_older() {
        let sequencer = SearchSequencer::new();
        let first = sequencer.begin();
        assert!(first.is_current());
        let second = sequencer.begin();
        assert!(!first.is_current());
        assert!(second.is_current());
    }

    #[tokio::test]
    async fn no_catalog_is_a_contract_violation() {
        let p = pipeline();
        let err = p
            .find_suggestions(&SuggestionRequest::new("milch"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("no catalog source"));
    }

    #[tokio::test]
    async fn empty_query_is_no_match_not_an_error() {
        let p = pipeline()
            .with_local_catalog(Arc::new(MemoryCatalog::new(Vec::new())) as Arc<dyn LocalCatalog>);
        let out = p
            .find_suggestions(&SuggestionRequest::new("   "))
            .await
            .unwrap();
        assert!(out.is_empty());

        let noise = p
            .find_suggestions(&SuggestionRequest::new("2x 500g 12"))
            .await
            .unwrap();
        assert!(noise.is_empty());
    }
}
