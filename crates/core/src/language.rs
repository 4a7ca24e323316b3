//! Negotiated conversation languages

use serde::{Deserialize, Serialize};

/// Languages the assistant speaks
///
/// Negotiated at session start and may change per turn. Wire formats use
/// either the bare code (`en`, `hi`) or a region-tagged locale
/// (`en-US`, `hi-IN`); both parse here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    En,
    Hi,
}

impl Language {
    /// Parse a language tag, tolerating region suffixes and case
    pub fn parse(tag: &str) -> Option<Self> {
        let lower = tag.trim().to_ascii_lowercase();
        if lower == "en" || lower.starts_with("en-") {
            Some(Language::En)
        } else if lower == "hi" || lower.starts_with("hi-") {
            Some(Language::Hi)
        } else {
            None
        }
    }

    /// Bare language code used to index prompt tables
    pub fn code(&self) -> &'static str {
        match self {
            Language::En => "en",
            Language::Hi => "hi",
        }
    }

    /// Region-tagged locale for speech adapters
    pub fn locale(&self) -> &'static str {
        match self {
            Language::En => "en-US",
            Language::Hi => "hi-IN",
        }
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}
