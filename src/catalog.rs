//! catalog.rs — Provider traits the pipeline pulls candidates through. The
//! host wires real backends (device database, Open Food Facts, community
//! service); tests wire mocks. The pipeline only ever sees these traits.

use anyhow::Result;
use async_trait::async_trait;

use crate::candidate::{BestPrice, Candidate, RatingStats};

/// Device-side product pool. Expected to be small and cheap to scan; the
/// pipeline fetches the whole pool and scores it in-process.
#[async_trait]
pub trait LocalCatalog: Send + Sync {
    /// All locally known products, optionally narrowed to one store.
    async fn products(&self, store: Option<&str>) -> Result<Vec<Candidate>>;
    fn name(&self) -> &'static str;
}

/// Remote product index queried by search term or barcode.
#[async_trait]
pub trait ExternalCatalog: Send + Sync {
    async fn search(
        &self,
        term: &str,
        page_size: usize,
        max_results: usize,
    ) -> Result<Vec<Candidate>>;

    async fn by_barcode(&self, barcode: &str) -> Result<Option<Candidate>>;

    fn name(&self) -> &'static str;
}

/// Community-sourced enrichment: ratings and reported prices. Keys are the
/// candidate's barcode when present, its name otherwise.
#[async_trait]
pub trait CommunityStats: Send + Sync {
    async fn rating_stats(
        &self,
        product_key: &str,
        store: Option<&str>,
    ) -> Result<Option<RatingStats>>;

    async fn best_price(&self, product_key: &str, store: &str) -> Result<Option<BestPrice>>;

    fn name(&self) -> &'static str;
}

/// In-memory `LocalCatalog`, the default device pool and the test fixture.
pub struct MemoryCatalog {
    products: Vec<Candidate>,
}

impl MemoryCatalog {
    pub fn new(products: Vec<Candidate>) -> Self {
        Self { products }
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }
}

#[async_trait]
impl LocalCatalog for MemoryCatalog {
    async fn products(&self, store: Option<&str>) -> Result<Vec<Candidate>> {
        let mut out = self.products.clone();
        if let Some(store) = store {
            out.retain(|c| {
                c.store
                    .as_deref()
                    .is_some_and(|s| s.eq_ignore_ascii_case(store))
            });
        }
        Ok(out)
    }

    fn name(&self) -> &'static str {
        "MemoryCatalog"
    }
}
