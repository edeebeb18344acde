//! Sensitivity policy
//!
//! The built-in policy is deliberately over-inclusive: the 6+ digit catch-all
//! and the keyword fallback flag labels as well as values. Both are plain data
//! here so a deployment can narrow them without touching the classifier.

use serde::{Deserialize, Serialize};

/// Built-in pattern identifiers
pub const PATTERN_SSN: &str = "ssn";
pub const PATTERN_EMAIL: &str = "email";
pub const PATTERN_PHONE: &str = "phone";
pub const PATTERN_ZIP: &str = "zip";
pub const PATTERN_LONG_NUMBER: &str = "long_number";

/// Keywords matched by case-insensitive containment
pub const DEFAULT_KEYWORDS: [&str; 10] = [
    "name", "dob", "birth", "address", "city", "state", "country", "passport", "license", "id",
];

/// A single regex rule
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatternRule {
    /// Identifier reported when this rule matches
    pub id: String,
    /// Regular expression, `regex` crate syntax
    pub pattern: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

impl PatternRule {
    pub fn new(id: &str, pattern: &str) -> Self {
        Self {
            id: id.to_string(),
            pattern: pattern.to_string(),
            enabled: true,
        }
    }
}

/// Classification policy: ordered patterns, then keyword fallback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SensitivityPolicy {
    /// Checked in order, first match wins
    pub patterns: Vec<PatternRule>,
    /// Containment keywords, compared lowercased
    pub keywords: Vec<String>,
    /// Run the keyword check when no pattern matched
    pub keyword_fallback: bool,
}

impl Default for SensitivityPolicy {
    fn default() -> Self {
        Self {
            patterns: vec![
                PatternRule::new(PATTERN_SSN, r"\b\d{3}-\d{2}-\d{4}\b"),
                PatternRule::new(PATTERN_EMAIL, r"(?i)\b[A-Z0-9._%+-]+@[A-Z0-9.-]+\.[A-Z]{2,}\b"),
                PatternRule::new(PATTERN_PHONE, r"\b\d{3}[-.\s]?\d{3}[-.\s]?\d{4}\b"),
                PatternRule::new(PATTERN_ZIP, r"\b\d{5}(?:-\d{4})?\b"),
                PatternRule::new(PATTERN_LONG_NUMBER, r"\b\d{6,}\b"),
            ],
            keywords: DEFAULT_KEYWORDS.iter().map(|k| k.to_string()).collect(),
            keyword_fallback: true,
        }
    }
}

impl SensitivityPolicy {
    /// Disable a pattern by id. Returns false if no such pattern exists.
    pub fn disable_pattern(&mut self, id: &str) -> bool {
        match self.patterns.iter_mut().find(|p| p.id == id) {
            Some(rule) => {
                rule.enabled = false;
                true
            }
            None => false,
        }
    }
}
