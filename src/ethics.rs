//! # Brand ethics table
//!
//! Maps brands to an ethics score in `[0.0, 1.0]` plus a list of documented
//! concerns (political funding, labor practices, environmental damage, tax
//! behavior). Unknown brands score a neutral default so missing data never
//! punishes a product.
//!
//! - Loads from JSON config; ships with a built-in seed.
//! - Case-insensitive lookup, aliases for spelling variants ("nestlé").
//! - Brand extraction from free-form product names via substring scan in
//!   table order.

use indexmap::IndexMap;
use serde::Deserialize;
use std::{fmt, fs, path::Path};

use crate::candidate::Candidate;

/// Concern category, mirroring the sourcing research buckets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueCategory {
    Political,
    Labor,
    Environment,
    Tax,
    HumanRights,
}

impl fmt::Display for IssueCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IssueCategory::Political => write!(f, "Politik"),
            IssueCategory::Labor => write!(f, "Arbeit"),
            IssueCategory::Environment => write!(f, "Umwelt"),
            IssueCategory::Tax => write!(f, "Steuern"),
            IssueCategory::HumanRights => write!(f, "Menschenrechte"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IssueSeverity {
    Critical,
    Major,
    Minor,
}

/// One documented concern about a brand.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct EthicsIssue {
    pub category: IssueCategory,
    pub severity: IssueSeverity,
    pub description: String,
    pub year: u16,
}

impl EthicsIssue {
    fn summary(&self) -> String {
        format!("{}: {} ({})", self.category, self.description, self.year)
    }
}

/// Ethics profile of one brand or parent company.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct EthicsProfile {
    pub name: String,
    #[serde(default)]
    pub parent_company: Option<String>,
    #[serde(default)]
    pub issues: Vec<EthicsIssue>,
    pub score: f32,
}

/// The table: canonical profiles plus aliases for alternative spellings.
#[derive(Debug, Clone, Deserialize)]
pub struct EthicsTable {
    #[serde(default = "default_neutral_score")]
    pub default_score: f32,
    #[serde(default)]
    pub profiles: IndexMap<String, EthicsProfile>,
    #[serde(default)]
    pub aliases: IndexMap<String, String>,
}

fn default_neutral_score() -> f32 {
    0.6
}

impl Default for EthicsTable {
    fn default() -> Self {
        Self::default_seed()
    }
}

impl EthicsTable {
    /// Load from a JSON file, falling back to the built-in seed on error.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Self {
        match fs::read_to_string(path) {
            Ok(s) => serde_json::from_str(&s).unwrap_or_else(|_| Self::default_seed()),
            Err(_) => Self::default_seed(),
        }
    }

    /// Profile lookup: alias first, then exact key, both lowercased.
    pub fn profile_for(&self, brand: &str) -> Option<&EthicsProfile> {
        let key = brand.trim().to_lowercase();
        if let Some(canonical) = self.aliases.get(&key) {
            return self.profiles.get(&canonical.to_lowercase());
        }
        self.profiles.get(&key)
    }

    /// Score for a brand; the neutral default when unknown.
    pub fn score_for(&self, brand: &str) -> f32 {
        self.profile_for(brand)
            .map(|p| clamp01(p.score))
            .unwrap_or_else(|| clamp01(self.default_score))
    }

    /// First table brand whose key occurs in the product name. Table order
    /// decides ties.
    pub fn extract_brand<'a>(&'a self, product_name: &str) -> Option<&'a str> {
        let name = product_name.to_lowercase();
        self.profiles
            .keys()
            .find(|key| name.contains(key.as_str()))
            .map(String::as_str)
    }

    pub fn issues_summary(&self, brand: &str) -> Vec<String> {
        self.profile_for(brand)
            .map(|p| p.issues.iter().map(EthicsIssue::summary).collect())
            .unwrap_or_default()
    }

    /// Fill a candidate's ethics fields from its brand, or from a brand found
    /// in the name. A score already present is never overwritten.
    pub fn apply_to(&self, candidate: &mut Candidate) {
        if candidate.ethics_score.is_some() {
            return;
        }
        let brand = candidate
            .brand
            .as_deref()
            .filter(|b| self.profile_for(b).is_some())
            .map(str::to_string)
            .or_else(|| self.extract_brand(&candidate.name).map(str::to_string));

        if let Some(brand) = brand {
            if let Some(profile) = self.profile_for(&brand) {
                candidate.ethics_score = Some(clamp01(profile.score));
                candidate.ethics_issues = profile.issues.iter().map(EthicsIssue::summary).collect();
            }
        }
    }

    /// Built-in seed distilled from public sourcing research.
    pub fn default_seed() -> Self {
        let mut profiles = IndexMap::new();
        let mut insert = |key: &str,
                          name: &str,
                          parent: Option<&str>,
                          score: f32,
                          issues: Vec<(IssueCategory, IssueSeverity, &str, u16)>| {
            profiles.insert(
                key.to_string(),
                EthicsProfile {
                    name: name.to_string(),
                    parent_company: parent.map(str::to_string),
                    issues: issues
                        .into_iter()
                        .map(|(category, severity, description, year)| EthicsIssue {
                            category,
                            severity,
                            description: description.to_string(),
                            year,
                        })
                        .collect(),
                    score,
                },
            );
        };

        insert(
            "müller",
            "Müller",
            Some("Unternehmensgruppe Theo Müller"),
            0.2,
            vec![(
                IssueCategory::Political,
                IssueSeverity::Critical,
                "Parteispenden des Konzernchefs an die AfD",
                2024,
            )],
        );
        insert(
            "weihenstephan",
            "Weihenstephan",
            Some("Unternehmensgruppe Theo Müller"),
            0.2,
            vec![(
                IssueCategory::Political,
                IssueSeverity::Critical,
                "Konzernmarke von Müller, indirekte AfD-Finanzierung",
                2024,
            )],
        );
        insert(
            "nestle",
            "Nestlé",
            None,
            0.3,
            vec![
                (
                    IssueCategory::HumanRights,
                    IssueSeverity::Critical,
                    "Wasserausbeutung in Dürregebieten, aggressive Babynahrungs-Vermarktung",
                    2023,
                ),
                (
                    IssueCategory::Labor,
                    IssueSeverity::Major,
                    "Kinderarbeit in der Kakao-Lieferkette dokumentiert",
                    2022,
                ),
            ],
        );
        insert(
            "maggi",
            "Maggi",
            Some("Nestlé"),
            0.3,
            vec![(
                IssueCategory::HumanRights,
                IssueSeverity::Major,
                "Konzernmarke von Nestlé, erbt dessen Problematik",
                2023,
            )],
        );
        insert(
            "coca-cola",
            "Coca-Cola",
            None,
            0.4,
            vec![
                (
                    IssueCategory::Environment,
                    IssueSeverity::Major,
                    "Größter Plastik-Verschmutzer weltweit, Wasserausbeutung",
                    2023,
                ),
                (
                    IssueCategory::Labor,
                    IssueSeverity::Major,
                    "Dokumentierte Anti-Gewerkschafts-Kampagnen",
                    2023,
                ),
            ],
        );
        insert(
            "amazon",
            "Amazon",
            None,
            0.3,
            vec![
                (
                    IssueCategory::Labor,
                    IssueSeverity::Critical,
                    "Ausbeuterische Arbeitsbedingungen und Überwachung",
                    2024,
                ),
                (
                    IssueCategory::Tax,
                    IssueSeverity::Major,
                    "Aggressive Steuervermeidung trotz Milliardengewinnen",
                    2023,
                ),
            ],
        );
        insert(
            "rewe",
            "REWE",
            Some("REWE Group"),
            0.7,
            vec![(
                IssueCategory::Labor,
                IssueSeverity::Minor,
                "Vereinzelte Kritik an Arbeitsbedingungen, überwiegend tarifgebunden",
                2023,
            )],
        );
        insert(
            "edeka",
            "EDEKA",
            Some("EDEKA-Gruppe"),
            0.7,
            vec![(
                IssueCategory::Labor,
                IssueSeverity::Minor,
                "Teils schlechte Bedingungen bei Zulieferern, Verbesserungen erkennbar",
                2022,
            )],
        );
        insert(
            "aldi",
            "ALDI",
            Some("ALDI Nord / ALDI Süd"),
            0.75,
            vec![(
                IssueCategory::Labor,
                IssueSeverity::Minor,
                "Kritik an Preisdruck auf Zulieferer, verbesserte Standards",
                2023,
            )],
        );
        insert(
            "lidl",
            "LIDL",
            Some("Schwarz-Gruppe"),
            0.72,
            vec![(
                IssueCategory::Labor,
                IssueSeverity::Minor,
                "Teils gewerkschaftsfeindlich, Standards besser als früher",
                2023,
            )],
        );
        insert(
            "danone",
            "Danone",
            None,
            0.75,
            vec![(
                IssueCategory::Environment,
                IssueSeverity::Minor,
                "Nachhaltigkeitsbemühungen, weiterhin Plastikverpackungen",
                2024,
            )],
        );
        insert("arla", "Arla", Some("Arla Foods (Genossenschaft)"), 0.85, vec![]);
        insert(
            "alpro",
            "Alpro",
            Some("Danone"),
            0.78,
            vec![(
                IssueCategory::Environment,
                IssueSeverity::Minor,
                "Konzernmarke von Danone, gute pflanzliche Alternative",
                2024,
            )],
        );
        insert(
            "oatly",
            "Oatly",
            None,
            0.68,
            vec![(
                IssueCategory::Political,
                IssueSeverity::Minor,
                "Kontroverse um Blackstone-Investment",
                2020,
            )],
        );

        let mut aliases = IndexMap::new();
        for (alias, canonical) in [
            ("nestlé", "nestle"),
            ("coca cola", "coca-cola"),
            ("cocacola", "coca-cola"),
            ("theo müller", "müller"),
        ] {
            aliases.insert(alias.to_string(), canonical.to_string());
        }

        Self {
            default_score: 0.6,
            profiles,
            aliases,
        }
    }
}

fn clamp01(x: f32) -> f32 {
    if x < 0.0 {
        0.0
    } else if x > 1.0 {
        1.0
    } else {
        x
    }
}
