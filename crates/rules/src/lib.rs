//! Sensitivity classification for OCR tokens.
//!
//! A token is sensitive when any enabled pattern matches it, or, failing
//! that, when it contains one of the policy keywords (case-insensitive).

pub mod policy;

pub use policy::{PatternRule, SensitivityPolicy, DEFAULT_KEYWORDS};

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum RulesError {
    #[error("invalid pattern '{id}': {source}")]
    InvalidPattern {
        id: String,
        #[source]
        source: regex::Error,
    },
}

/// Why a token was flagged
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Verdict {
    /// A regex rule matched
    Pattern { id: String },
    /// A keyword was contained in the token
    Keyword { keyword: String },
}

/// Anything that can decide whether a token is sensitive
pub trait TokenClassifier {
    /// Returns the reason the token is sensitive, or `None`
    fn explain(&self, text: &str) -> Option<Verdict>;

    fn classify(&self, text: &str) -> bool {
        self.explain(text).is_some()
    }
}

impl<T: TokenClassifier + ?Sized> TokenClassifier for &T {
    fn explain(&self, text: &str) -> Option<Verdict> {
        (**self).explain(text)
    }
}

struct CompiledPattern {
    id: String,
    regex: Regex,
}

/// Compiled form of a [`SensitivityPolicy`]
pub struct Classifier {
    patterns: Vec<CompiledPattern>,
    keywords: Vec<String>,
    keyword_fallback: bool,
}

static BUILTIN: Lazy<Classifier> = Lazy::new(|| {
    Classifier::new(&SensitivityPolicy::default()).expect("built-in patterns are valid")
});

impl Classifier {
    /// Compile a policy. Disabled patterns are dropped here.
    pub fn new(policy: &SensitivityPolicy) -> Result<Self, RulesError> {
        let mut patterns = Vec::with_capacity(policy.patterns.len());
        for rule in policy.patterns.iter().filter(|r| r.enabled) {
            let regex = Regex::new(&rule.pattern).map_err(|source| RulesError::InvalidPattern {
                id: rule.id.clone(),
                source,
            })?;
            patterns.push(CompiledPattern {
                id: rule.id.clone(),
                regex,
            });
        }

        let keywords = policy
            .keywords
            .iter()
            .map(|k| k.trim().to_lowercase())
            .filter(|k| !k.is_empty())
            .collect();

        log::debug!(
            "[Rules] compiled {} patterns, keyword fallback: {}",
            patterns.len(),
            policy.keyword_fallback
        );

        Ok(Self {
            patterns,
            keywords,
            keyword_fallback: policy.keyword_fallback,
        })
    }

    /// Classifier for the default policy
    pub fn builtin() -> &'static Classifier {
        &BUILTIN
    }

    pub fn pattern_ids(&self) -> impl Iterator<Item = &str> {
        self.patterns.iter().map(|p| p.id.as_str())
    }
}

impl TokenClassifier for Classifier {
    fn explain(&self, text: &str) -> Option<Verdict> {
        if text.trim().is_empty() {
            return None;
        }

        if let Some(p) = self.patterns.iter().find(|p| p.regex.is_match(text)) {
            return Some(Verdict::Pattern { id: p.id.clone() });
        }

        if !self.keyword_fallback {
            return None;
        }

        let lowered = text.to_lowercase();
        self.keywords
            .iter()
            .find(|k| lowered.contains(k.as_str()))
            .map(|k| Verdict::Keyword { keyword: k.clone() })
    }
}

/// Shorthand for the default policy
pub fn classify(text: &str) -> bool {
    Classifier::builtin().classify(text)
}

/// Masks the middle of a token so it can be logged.
pub fn mask_snippet(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let len = chars.len();

    if len <= 4 {
        "*".repeat(len)
    } else {
        let visible = 4.min(len / 3);
        let prefix: String = chars[..visible].iter().collect();
        let suffix: String = chars[len - visible..].iter().collect();
        format!("{}****{}", prefix, suffix)
    }
}
