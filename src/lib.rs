// src/lib.rs
// Public library surface for host applications and integration tests.

pub mod candidate;
pub mod catalog;
pub mod category;
pub mod config;
pub mod dedup;
pub mod ethics;
pub mod expand;
pub mod fairness;
pub mod pipeline;
pub mod quantity;
pub mod rank;
pub mod similarity;
pub mod telemetry;
pub mod tokenize;
pub mod vocab;

// ---- Re-exports for stable public API ----
pub use crate::candidate::{
    BestPrice, BoundCandidate, Candidate, Grade, MatchedField, Provenance, RatingStats,
    ScoredCandidate, ShoppingListItem, VerificationStatus,
};
pub use crate::catalog::{CommunityStats, ExternalCatalog, LocalCatalog, MemoryCatalog};
pub use crate::config::MatcherConfig;
pub use crate::ethics::EthicsTable;
pub use crate::fairness::{compute_fairness, FairnessBreakdown, FairnessWeights};
pub use crate::pipeline::{
    SearchOutcome, SearchSequencer, SearchTicket, SuggestionPipeline, SuggestionRequest,
};
pub use crate::quantity::{resolve_quantity, PackQuantity, PurchasePlan, QuantityUnit};
pub use crate::rank::RankingWeights;
pub use crate::telemetry::enable_dev_tracing;
pub use crate::vocab::Vocabulary;
