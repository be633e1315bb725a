//! telemetry.rs — Metrics registration, anonymized dev logging and the
//! tracing bootstrap. Search text is personal data: nothing here ever logs a
//! raw query or product name, only short hashes and counts.

use metrics::{describe_counter, describe_gauge, describe_histogram};
use once_cell::sync::OnceCell;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// One-time metrics registration (so series show up in the exporter).
pub fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("match_searches_total", "Suggestion searches run.");
        describe_counter!(
            "match_local_candidates_total",
            "Local candidates admitted past the acceptance floor."
        );
        describe_counter!(
            "match_external_candidates_total",
            "External candidates admitted past the acceptance floor."
        );
        describe_counter!(
            "match_excluded_total",
            "Candidates dropped by category exclusion."
        );
        describe_counter!(
            "match_external_fetches_total",
            "External catalog calls issued (searches and barcode lookups)."
        );
        describe_counter!(
            "match_external_errors_total",
            "External catalog fetch/parse errors."
        );
        describe_counter!(
            "match_deduped_total",
            "Candidates merged away by barcode/name deduplication."
        );
        describe_counter!(
            "match_superseded_total",
            "Search results discarded because a newer search started."
        );
        describe_counter!(
            "match_underfilled_total",
            "Shortlists that ended up below the minimum size."
        );
        describe_histogram!("match_pipeline_ms", "End-to-end search time in milliseconds.");
        describe_histogram!(
            "match_external_fetch_ms",
            "Latency of individual external catalog calls in milliseconds."
        );
        describe_gauge!("match_last_search_ts", "Unix ts of the last completed search.");
    });
}

// Dev logging gate: MATCHER_DEV_LOG=1 AND dev env (debug or MATCHER_ENV in {local,development,dev})
pub(crate) fn dev_logging_enabled() -> bool {
    let on = std::env::var("MATCHER_DEV_LOG").ok().as_deref() == Some("1");
    if !on {
        return false;
    }
    if cfg!(debug_assertions) {
        return true;
    }
    matches!(
        std::env::var("MATCHER_ENV")
            .unwrap_or_default()
            .to_ascii_lowercase()
            .as_str(),
        "local" | "development" | "dev"
    )
}

/// Short stable hash so related log lines can be correlated without
/// exposing what the user typed.
pub(crate) fn anon_hash(text: &str) -> String {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    let digest = hasher.finalize();
    let mut out = String::with_capacity(12);
    for b in digest.iter().take(6) {
        use std::fmt::Write;
        let _ = write!(&mut out, "{:02x}", b);
    }
    out
}

/// Minimal, anonymized dev logger for search events.
pub(crate) fn dev_log_search(
    event: &str,
    query: &str,
    expanded: &[String],
    results: usize,
    best: f32,
    threshold: f32,
) {
    if !dev_logging_enabled() {
        return;
    }
    let id = anon_hash(query);
    let terms = truncate_vec(expanded, 5).len();
    // Never log raw text. Only hashed id + counts.
    info!(
        target: "suggest",
        %id, %best, %threshold, event,
        terms,
        results
    );
}

pub(crate) fn truncate_vec<T: ToString>(v: &[T], max: usize) -> Vec<String> {
    v.iter().take(max).map(|x| x.to_string()).collect()
}

/// Enable compact tracing logs in development only.
/// Activation requires BOTH:
///   - dev environment (debug build OR MATCHER_ENV in {local, development, dev})
///   - MATCHER_DEV_LOG=1
pub fn enable_dev_tracing() {
    if !dev_logging_enabled() {
        return;
    }

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("suggest=info,warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn anon_hash_is_short_stable_hex() {
        let a = anon_hash("hafermilch");
        let b = anon_hash("hafermilch");
        let c = anon_hash("joghurt");
        assert_eq!(a.len(), 12);
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!(a.chars().all(|ch| ch.is_ascii_hexdigit()));
    }

    #[test]
    fn truncate_vec_caps_and_stringifies() {
        let v = vec!["a", "b", "c", "d"];
        assert_eq!(truncate_vec(&v, 2), vec!["a".to_string(), "b".into()]);
        assert_eq!(truncate_vec(&v, 10).len(), 4);
    }

    #[test]
    fn describe_is_idempotent() {
        ensure_metrics_described();
        ensure_metrics_described();
    }
}
