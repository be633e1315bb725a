//! quantity.rs — Quantity parsing and purchase math.
//!
//! Two different parsers on purpose: what the user types ("1kg", "2", "3 st")
//! is anchored and strict, while catalog pack sizes ("6x330ml", "4er Pack
//! 250 g") are scanned for the first size-looking fragment. Everything is
//! canonicalized to grams, millilitres or pieces before any arithmetic.

use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::candidate::Candidate;

/// Canonical unit after normalization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuantityUnit {
    G,
    Ml,
    X,
}

impl fmt::Display for QuantityUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QuantityUnit::G => write!(f, "g"),
            QuantityUnit::Ml => write!(f, "ml"),
            QuantityUnit::X => write!(f, "x"),
        }
    }
}

/// An amount in canonical units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PackQuantity {
    pub amount: f32,
    pub unit: QuantityUnit,
}

impl PackQuantity {
    pub fn grams(amount: f32) -> Self {
        Self {
            amount,
            unit: QuantityUnit::G,
        }
    }

    pub fn millilitres(amount: f32) -> Self {
        Self {
            amount,
            unit: QuantityUnit::Ml,
        }
    }

    pub fn pieces(amount: f32) -> Self {
        Self {
            amount,
            unit: QuantityUnit::X,
        }
    }
}

/// How many packs to buy and what that adds up to.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PurchasePlan {
    pub count: u32,
    pub total_amount: f32,
    pub unit: QuantityUnit,
}

impl PurchasePlan {
    /// Total in display form, e.g. "1.00 kg" for four 250 g packs.
    pub fn total_display(&self) -> String {
        format_amount(self.total_amount, self.unit)
    }
}

// User input: a number with an optional unit and nothing else.
static RE_NEEDED: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^([\d.,]+)\s*(g|kg|ml|l|x|stück|st)?$").expect("needed quantity regex")
});

// Catalog text: first size fragment anywhere in the string.
static RE_PACKAGED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)([\d.,]+)\s*(g|kg|ml|l|cl|dl)").expect("packaged quantity regex"));

fn parse_amount(raw: &str) -> Option<f32> {
    raw.replace(',', ".").parse::<f32>().ok()
}

/// Parse a user-entered desired quantity. A bare number means pieces.
pub fn parse_needed(text: &str) -> Option<PackQuantity> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }
    let caps = RE_NEEDED.captures(trimmed)?;
    let amount = parse_amount(caps.get(1)?.as_str())?;
    let unit = caps
        .get(2)
        .map(|m| m.as_str().to_lowercase())
        .unwrap_or_else(|| "x".to_string());

    let qty = match unit.as_str() {
        "kg" => PackQuantity::grams(amount * 1000.0),
        "g" => PackQuantity::grams(amount),
        "l" => PackQuantity::millilitres(amount * 1000.0),
        "ml" => PackQuantity::millilitres(amount),
        _ => PackQuantity::pieces(amount),
    };
    Some(qty)
}

/// Parse a catalog pack-size string such as "6x330ml" or "4er Pack 250 g".
pub fn parse_packaged(text: &str) -> Option<PackQuantity> {
    let caps = RE_PACKAGED.captures(text)?;
    let amount = parse_amount(caps.get(1)?.as_str())?;
    let qty = match caps.get(2)?.as_str().to_lowercase().as_str() {
        "kg" => PackQuantity::grams(amount * 1000.0),
        "g" => PackQuantity::grams(amount),
        "l" => PackQuantity::millilitres(amount * 1000.0),
        "cl" => PackQuantity::millilitres(amount * 10.0),
        "dl" => PackQuantity::millilitres(amount * 100.0),
        _ => PackQuantity::millilitres(amount),
    };
    Some(qty)
}

/// Pack size of a candidate: the ingested canonical size when present,
/// otherwise a parse of the raw quantity text.
pub fn packaged_quantity(candidate: &Candidate) -> Option<PackQuantity> {
    candidate
        .packaged
        .or_else(|| candidate.quantity_text.as_deref().and_then(parse_packaged))
}

/// Smallest number of packs covering the needed amount. Units must already
/// agree; a non-positive pack size cannot be covered.
pub fn optimal_purchase(needed: PackQuantity, packaged: PackQuantity) -> Option<PurchasePlan> {
    if needed.unit != packaged.unit || packaged.amount <= 0.0 {
        return None;
    }
    let count = (needed.amount / packaged.amount).ceil() as u32;
    Some(PurchasePlan {
        count,
        total_amount: count as f32 * packaged.amount,
        unit: needed.unit,
    })
}

/// End-to-end resolution from a user quantity string to a purchase plan for
/// the given candidate. `None` when either side fails to parse or the units
/// disagree.
pub fn resolve_quantity(needed_text: &str, candidate: &Candidate) -> Option<PurchasePlan> {
    let needed = parse_needed(needed_text)?;
    let packaged = packaged_quantity(candidate)?;
    optimal_purchase(needed, packaged)
}

/// Price basis for weight or volume goods.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PriceBasis {
    Kg,
    Litre,
}

impl fmt::Display for PriceBasis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PriceBasis::Kg => write!(f, "kg"),
            PriceBasis::Litre => write!(f, "L"),
        }
    }
}

/// Comparable price per kilogram or litre.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UnitPrice {
    pub value: f32,
    pub basis: PriceBasis,
}

impl fmt::Display for UnitPrice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2} €/{}", self.value, self.basis)
    }
}

/// Price per kg or L from the candidate's price (estimated price as fallback)
/// and pack size. Piece goods have no unit price.
pub fn unit_price(candidate: &Candidate) -> Option<UnitPrice> {
    let price = candidate
        .price
        .or(candidate.estimated_price)
        .filter(|p| *p > 0.0)?;
    let packaged = packaged_quantity(candidate).filter(|q| q.amount > 0.0)?;

    match packaged.unit {
        QuantityUnit::G => Some(UnitPrice {
            value: price / (packaged.amount / 1000.0),
            basis: PriceBasis::Kg,
        }),
        QuantityUnit::Ml => Some(UnitPrice {
            value: price / (packaged.amount / 1000.0),
            basis: PriceBasis::Litre,
        }),
        QuantityUnit::X => None,
    }
}

// Rough EUR per 100 g/ml by category family; first hit wins, order matters.
const PRICE_PER_100: &[(&str, f32)] = &[
    ("dairy", 0.50),
    ("beverages", 0.15),
    ("bread", 0.40),
    ("fruits", 0.30),
    ("vegetables", 0.25),
    ("snacks", 0.80),
    ("spreads", 1.00),
];

const DEFAULT_PRICE_PER_100: f32 = 0.50;

fn round2(x: f32) -> f32 {
    (x * 100.0).round() / 100.0
}

/// Category-based price estimate for a pack. Only weight and volume goods can
/// be estimated; piece goods and unsized records yield `None`.
pub fn estimate_price(categories: &[String], packaged: Option<PackQuantity>) -> Option<f32> {
    let packaged = packaged.filter(|q| q.unit != QuantityUnit::X)?;

    let base = PRICE_PER_100
        .iter()
        .find(|(family, _)| {
            categories
                .iter()
                .any(|tag| tag.to_lowercase().contains(family))
        })
        .map(|(_, price)| *price)
        .unwrap_or(DEFAULT_PRICE_PER_100);

    Some(round2((packaged.amount / 100.0) * base))
}

/// Human-readable amount; 1000 and up flips to kg/L with two decimals.
pub fn format_amount(amount: f32, unit: QuantityUnit) -> String {
    match unit {
        QuantityUnit::G if amount >= 1000.0 => format!("{:.2} kg", amount / 1000.0),
        QuantityUnit::Ml if amount >= 1000.0 => format!("{:.2} L", amount / 1000.0),
        _ => format!("{} {}", amount, unit),
    }
}
