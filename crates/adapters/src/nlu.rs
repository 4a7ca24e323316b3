//! Keyword-based language understanding
//!
//! Bilingual (English/Hindi, including romanized Hindi) keyword matcher.
//! Serves as the no-dependency fallback understander; an LLM- or
//! provider-backed implementation replaces it behind the same contract.

use async_trait::async_trait;

use driver_assist_core::{IntentType, Language, NluResult, Result, Sentiment, Understander};

const STATION_KEYWORDS: &[&str] = &["station", "sthan", "kendra", "स्टेशन"];
const SWAP_KEYWORDS: &[&str] = &["swap", "swaps", "history", "itihas", "इतिहास", "बदलाव"];
const SUBSCRIPTION_KEYWORDS: &[&str] = &["subscription", "plan", "membership", "सदस्यता"];
const PRICING_KEYWORDS: &[&str] = &["price", "pricing", "cost", "costs", "charge", "कीमत", "दाम"];
const GREETING_KEYWORDS: &[&str] = &[
    "hello",
    "hi",
    "hey",
    "namaste",
    "namaskar",
    "नमस्ते",
    "नमस्कार",
    "हैलो",
];
const ANGRY_KEYWORDS: &[&str] = &["angry", "bad", "terrible", "useless", "गुस्सा", "बेकार"];
const YESTERDAY_KEYWORDS: &[&str] = &["yesterday", "kal", "कल"];

/// Known areas the station lookup understands, with their canonical names
const LOCATIONS: &[(&str, &str)] = &[
    ("noida", "Noida"),
    ("delhi", "Delhi"),
    ("dilli", "Delhi"),
    ("gurgaon", "Gurgaon"),
    ("नोएडा", "Noida"),
    ("दिल्ली", "Delhi"),
    ("गुरुग्राम", "Gurgaon"),
];

/// Keyword understander for English and Hindi
#[derive(Debug, Default)]
pub struct KeywordUnderstander;

impl KeywordUnderstander {
    pub fn new() -> Self {
        Self
    }

    fn extract_location(lower: &str) -> Option<&'static str> {
        LOCATIONS
            .iter()
            .find(|(keyword, _)| lower.contains(keyword))
            .map(|(_, canonical)| *canonical)
    }
}

/// Token-wise containment so `hi` does not match inside `this`
///
/// Phrases and Devanagari keywords match by substring: matras at word edges
/// are combining marks, which token trimming would eat.
fn contains_word(lower: &str, keyword: &str) -> bool {
    if keyword.contains(' ') || !keyword.is_ascii() {
        return lower.contains(keyword);
    }
    lower
        .split_whitespace()
        .map(|token| token.trim_matches(|c: char| !c.is_alphanumeric()))
        .any(|token| token == keyword)
}

fn contains_any(lower: &str, keywords: &[&str]) -> bool {
    keywords.iter().any(|k| contains_word(lower, k))
}

#[async_trait]
impl Understander for KeywordUnderstander {
    async fn analyze(&self, text: &str, _language: Language) -> Result<NluResult> {
        let lower = text.to_lowercase();

        // Anger first: "this is bad" must not be swallowed by other matches
        if contains_any(&lower, ANGRY_KEYWORDS) {
            return Ok(NluResult::new(IntentType::Unknown, 0.5).with_sentiment(Sentiment::Angry));
        }

        if contains_any(&lower, STATION_KEYWORDS) {
            let mut result = NluResult::new(IntentType::FindNearestStation, 0.9);
            if let Some(location) = Self::extract_location(&lower) {
                result = result.with_entity("location", location);
            }
            return Ok(result);
        }

        // A bare area name: no intent of its own, but worth carrying as an
        // entity for whatever intent is already latched
        if let Some(location) = Self::extract_location(&lower) {
            return Ok(NluResult::new(IntentType::Unknown, 0.4).with_entity("location", location));
        }

        if contains_any(&lower, SWAP_KEYWORDS) {
            let mut result = NluResult::new(IntentType::GetSwapHistory, 0.85);
            if contains_any(&lower, YESTERDAY_KEYWORDS) {
                result = result.with_entity("date_range", "yesterday");
            }
            return Ok(result);
        }

        if contains_any(&lower, SUBSCRIPTION_KEYWORDS) {
            return Ok(NluResult::new(IntentType::CheckSubscription, 0.8));
        }

        if contains_any(&lower, PRICING_KEYWORDS) {
            return Ok(NluResult::new(IntentType::PricingInfo, 0.8));
        }

        if contains_any(&lower, GREETING_KEYWORDS) {
            return Ok(NluResult::new(IntentType::Unknown, 0.7).with_sentiment(Sentiment::Positive));
        }

        Ok(NluResult::new(IntentType::Unknown, 0.3))
    }

    fn name(&self) -> &str {
        "keyword-nlu"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn analyze(text: &str) -> NluResult {
        KeywordUnderstander::new()
            .analyze(text, Language::En)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_station_with_location() {
        let result = analyze("find a station near Noida").await;
        assert_eq!(result.intent, IntentType::FindNearestStation);
        assert_eq!(result.confidence, 0.9);
        assert_eq!(result.entities["location"], "Noida");
    }

    #[tokio::test]
    async fn test_station_without_location() {
        let result = analyze("find station").await;
        assert_eq!(result.intent, IntentType::FindNearestStation);
        assert!(result.entities.is_empty());
    }

    #[tokio::test]
    async fn test_bare_location_is_low_confidence_entity() {
        let result = analyze("Noida").await;
        assert_eq!(result.intent, IntentType::Unknown);
        assert_eq!(result.confidence, 0.4);
        assert_eq!(result.entities["location"], "Noida");
    }

    #[tokio::test]
    async fn test_swap_history_yesterday() {
        let result = analyze("swap history yesterday").await;
        assert_eq!(result.intent, IntentType::GetSwapHistory);
        assert_eq!(result.confidence, 0.85);
        assert_eq!(result.entities["date_range"], "yesterday");
    }

    #[tokio::test]
    async fn test_hindi_station_keyword() {
        let result = KeywordUnderstander::new()
            .analyze("स्टेशन कहाँ है दिल्ली में", Language::Hi)
            .await
            .unwrap();
        assert_eq!(result.intent, IntentType::FindNearestStation);
        assert_eq!(result.entities["location"], "Delhi");
    }

    #[tokio::test]
    async fn test_angry_text() {
        let result = analyze("this is bad, I want an agent").await;
        assert_eq!(result.sentiment, Sentiment::Angry);
        assert_eq!(result.intent, IntentType::Unknown);
    }

    #[tokio::test]
    async fn test_greeting_is_positive_unknown() {
        let result = analyze("hello there").await;
        assert_eq!(result.intent, IntentType::Unknown);
        assert_eq!(result.sentiment, Sentiment::Positive);
        assert_eq!(result.confidence, 0.7);
    }

    #[tokio::test]
    async fn test_hi_does_not_match_inside_this() {
        let result = analyze("this costs nothing").await;
        // "this" must not read as the greeting "hi"; pricing keyword wins
        assert_eq!(result.intent, IntentType::PricingInfo);
    }

    #[tokio::test]
    async fn test_gibberish_is_low_confidence() {
        let result = analyze("zxqv wrble").await;
        assert_eq!(result.intent, IntentType::Unknown);
        assert_eq!(result.confidence, 0.3);
        assert_eq!(result.sentiment, Sentiment::Neutral);
    }
}
