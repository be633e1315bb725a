//! candidate.rs — Core domain model: products entering the pipeline, scored
//! results leaving it, and the shopping-list binding that consumes them.
//!
//! A `Candidate` is one normalized product record regardless of where it came
//! from; provenance travels next to it, never inside it. Scoring never mutates
//! a candidate except for the duplicate merge, which only fills gaps.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::quantity::{PackQuantity, PurchasePlan};

/// Letter grade (eco-score or nutri-score), worst to best E..A.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Grade {
    #[serde(alias = "A")]
    A,
    #[serde(alias = "B")]
    B,
    #[serde(alias = "C")]
    C,
    #[serde(alias = "D")]
    D,
    #[serde(alias = "E")]
    E,
}

impl Grade {
    /// Numeric value used by the fairness blend.
    pub fn score(self) -> f32 {
        match self {
            Grade::A => 1.0,
            Grade::B => 0.8,
            Grade::C => 0.6,
            Grade::D => 0.4,
            Grade::E => 0.2,
        }
    }

    /// Lenient parse from upstream catalog data ("a", " B ", "not-applicable" → None).
    pub fn from_letter(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "a" => Some(Grade::A),
            "b" => Some(Grade::B),
            "c" => Some(Grade::C),
            "d" => Some(Grade::D),
            "e" => Some(Grade::E),
            _ => None,
        }
    }
}

/// Where a candidate was found. Kept separate from the record itself so the
/// same product merged from two pools stays a single `Candidate`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provenance {
    Local,
    External,
}

/// Community verification state of a product record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VerificationStatus {
    #[default]
    Suggested,
    Verified,
}

/// Which candidate field an anchor term landed on. Diagnostic only; ranking
/// ignores it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchedField {
    Name,
    Brand,
    Store,
    Category,
}

/// Aggregated community rating for a product at a store.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RatingStats {
    pub average_rating: f32,
    pub total_ratings: u32,
}

/// Best community-reported price for a product at a store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BestPrice {
    pub price: f32,
    pub verified: bool,
    #[serde(default)]
    pub upvotes: u32,
}

/// One normalized product record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    /// Display identifier, e.g. "Oatly Hafermilch 1l". Matching runs on this.
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub barcode: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brand: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub store: Option<String>,
    /// Free-form category labels from the source catalog.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub categories: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub eco_grade: Option<Grade>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nutri_grade: Option<Grade>,
    /// 0.0..=1.0; absent means "unknown brand", which scores the neutral default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ethics_score: Option<f32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ethics_issues: Vec<String>,
    /// Raw pack-size text as the catalog printed it, e.g. "6x330ml".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quantity_text: Option<String>,
    /// Canonical pack size, parsed at ingestion when possible.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub packaged: Option<PackQuantity>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<f32>,
    /// Rough category-based estimate filled at ingestion when no real price
    /// is known. Display-only fallback, never a ranking input.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_price: Option<f32>,
    #[serde(default)]
    pub status: VerificationStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

impl Candidate {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            barcode: None,
            brand: None,
            store: None,
            categories: Vec::new(),
            eco_grade: None,
            nutri_grade: None,
            ethics_score: None,
            ethics_issues: Vec::new(),
            quantity_text: None,
            packaged: None,
            price: None,
            estimated_price: None,
            status: VerificationStatus::Suggested,
            image_url: None,
        }
    }

    /// Assemble the display identifier external catalogs are ingested under:
    /// "brand name quantity", skipping absent parts.
    pub fn compose_identifier(brand: Option<&str>, name: &str, quantity: Option<&str>) -> String {
        let mut parts: Vec<&str> = Vec::with_capacity(3);
        if let Some(b) = brand {
            if !b.trim().is_empty() {
                parts.push(b.trim());
            }
        }
        if !name.trim().is_empty() {
            parts.push(name.trim());
        }
        if let Some(q) = quantity {
            if !q.trim().is_empty() {
                parts.push(q.trim());
            }
        }
        parts.join(" ")
    }

    /// Lowercased haystack for pattern boosts: name plus brand, store and
    /// category labels.
    pub fn haystack(&self) -> String {
        let mut hay = self.name.clone();
        for part in [self.brand.as_deref(), self.store.as_deref()]
            .into_iter()
            .flatten()
        {
            hay.push(' ');
            hay.push_str(part);
        }
        for cat in &self.categories {
            hay.push(' ');
            hay.push_str(cat);
        }
        hay.to_lowercase()
    }

    pub fn is_verified(&self) -> bool {
        self.status == VerificationStatus::Verified
    }

    /// True when both sustainability grades are absent. Such a record can
    /// trigger an external lookup to fill the gaps.
    pub fn missing_both_grades(&self) -> bool {
        self.eco_grade.is_none() && self.nutri_grade.is_none()
    }

    // Builder-style setters for ingestion code and tests.

    pub fn with_barcode(mut self, barcode: impl Into<String>) -> Self {
        self.barcode = Some(barcode.into());
        self
    }

    pub fn with_brand(mut self, brand: impl Into<String>) -> Self {
        self.brand = Some(brand.into());
        self
    }

    pub fn with_store(mut self, store: impl Into<String>) -> Self {
        self.store = Some(store.into());
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.categories.push(category.into());
        self
    }

    pub fn with_grades(mut self, eco: Option<Grade>, nutri: Option<Grade>) -> Self {
        self.eco_grade = eco;
        self.nutri_grade = nutri;
        self
    }

    pub fn with_ethics(mut self, score: f32, issues: Vec<String>) -> Self {
        self.ethics_score = Some(score);
        self.ethics_issues = issues;
        self
    }

    pub fn with_quantity_text(mut self, raw: impl Into<String>) -> Self {
        let raw = raw.into();
        self.packaged = crate::quantity::parse_packaged(&raw);
        self.quantity_text = Some(raw);
        self
    }

    pub fn with_price(mut self, price: f32) -> Self {
        self.price = Some(price);
        self
    }

    /// Fill the estimated price from the category table if the candidate has
    /// a usable pack size. No-op when a real price is already known.
    pub fn with_estimated_price(mut self) -> Self {
        if self.price.is_none() {
            self.estimated_price =
                crate::quantity::estimate_price(&self.categories, crate::quantity::packaged_quantity(&self));
        }
        self
    }

    pub fn verified(mut self) -> Self {
        self.status = VerificationStatus::Verified;
        self
    }

    pub fn with_image_url(mut self, url: impl Into<String>) -> Self {
        self.image_url = Some(url.into());
        self
    }
}

/// A candidate after scoring, carrying everything ranking and display need.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredCandidate {
    pub candidate: Candidate,
    pub provenance: Provenance,
    /// 0.0..=1.0 text-match strength against the expanded query.
    pub relevance: f32,
    /// Fairness blend total. Deliberately may exceed 1.0.
    pub fairness: f32,
    /// Ranking key: relevance and fairness blended plus the completeness bonus.
    pub combined: f32,
    /// Set when a query token vetoed this candidate's inferred category. Such
    /// a record scores zero relevance and never reaches the ranked output.
    #[serde(default)]
    pub excluded: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub matched_field: Option<MatchedField>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<RatingStats>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub best_price: Option<BestPrice>,
}

impl ScoredCandidate {
    pub fn new(candidate: Candidate, provenance: Provenance, relevance: f32) -> Self {
        Self {
            candidate,
            provenance,
            relevance,
            fairness: 0.0,
            combined: 0.0,
            excluded: false,
            matched_field: None,
            rating: None,
            best_price: None,
        }
    }
}

/// A product bound to a shopping-list entry, with the purchase plan resolved
/// from the entry's quantity when both sides parse.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoundCandidate {
    pub candidate: Candidate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub purchase: Option<PurchasePlan>,
}

/// One entry of the user's shopping list. The list itself lives in the host
/// application; this type is the contract for binding suggestions to entries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShoppingListItem {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quantity: Option<String>,
    pub added_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bound: Option<BoundCandidate>,
}

impl ShoppingListItem {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            quantity: None,
            added_at: Utc::now(),
            bound: None,
        }
    }

    pub fn with_quantity(mut self, quantity: impl Into<String>) -> Self {
        self.quantity = Some(quantity.into());
        self
    }

    /// Attach a chosen candidate. The purchase plan is resolved from the
    /// explicit quantity field, falling back to the free text.
    pub fn bind(&mut self, candidate: Candidate) {
        let needed = self.quantity.as_deref().unwrap_or(&self.text);
        let purchase = crate::quantity::resolve_quantity(needed, &candidate);
        self.bound = Some(BoundCandidate {
            candidate,
            purchase,
        });
    }

    pub fn unbind(&mut self) {
        self.bound = None;
    }
}
