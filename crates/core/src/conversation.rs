//! Conversation types: intents, sentiment, per-session state and turn results

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::language::Language;

/// Closed set of intents the assistant understands
///
/// Dispatch matches exhaustively; adding a variant forces every handler
/// table to be revisited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IntentType {
    GetSwapHistory,
    ExplainInvoice,
    FindNearestStation,
    CheckAvailability,
    CheckSubscription,
    RenewSubscription,
    PricingInfo,
    LeaveInfo,
    #[serde(rename = "FindDSK")]
    FindDsk,
    Unknown,
}

impl std::fmt::Display for IntentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            IntentType::GetSwapHistory => "GetSwapHistory",
            IntentType::ExplainInvoice => "ExplainInvoice",
            IntentType::FindNearestStation => "FindNearestStation",
            IntentType::CheckAvailability => "CheckAvailability",
            IntentType::CheckSubscription => "CheckSubscription",
            IntentType::RenewSubscription => "RenewSubscription",
            IntentType::PricingInfo => "PricingInfo",
            IntentType::LeaveInfo => "LeaveInfo",
            IntentType::FindDsk => "FindDSK",
            IntentType::Unknown => "Unknown",
        };
        write!(f, "{name}")
    }
}

/// Caller sentiment as classified by the understander
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Positive,
    #[default]
    Neutral,
    Negative,
    Angry,
}

/// Session lifecycle status
///
/// `Completed` and `Escalated` are terminal; further turns on the session
/// fail with `Error::SessionTerminal`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ConversationStatus {
    #[default]
    Active,
    Completed,
    Escalated,
}

/// Role in a conversation turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnRole {
    User,
    Bot,
}

impl TurnRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            TurnRole::User => "user",
            TurnRole::Bot => "bot",
        }
    }
}

/// One utterance in the dialogue history
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub role: TurnRole,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

impl HistoryEntry {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: TurnRole::User,
            text: text.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn bot(text: impl Into<String>) -> Self {
        Self {
            role: TurnRole::Bot,
            text: text.into(),
            timestamp: Utc::now(),
        }
    }
}

/// Result of language understanding on a single utterance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NluResult {
    pub intent: IntentType,
    /// Confidence in [0, 1]
    pub confidence: f32,
    #[serde(default)]
    pub entities: HashMap<String, serde_json::Value>,
    #[serde(default)]
    pub sentiment: Sentiment,
}

impl NluResult {
    pub fn new(intent: IntentType, confidence: f32) -> Self {
        Self {
            intent,
            confidence,
            entities: HashMap::new(),
            sentiment: Sentiment::Neutral,
        }
    }

    pub fn with_entity(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.entities.insert(key.into(), value.into());
        self
    }

    pub fn with_sentiment(mut self, sentiment: Sentiment) -> Self {
        self.sentiment = sentiment;
        self
    }
}

/// Outcome of one dialogue turn
///
/// `needs_escalation` is the only channel by which the orchestrator signals
/// handoff to a human agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnResult {
    pub reply_text: String,
    pub should_end: bool,
    pub needs_escalation: bool,
    pub proactive_prompt: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl TurnResult {
    /// Mid-dialogue reply; the session stays active
    pub fn reply(text: impl Into<String>) -> Self {
        Self {
            reply_text: text.into(),
            should_end: false,
            needs_escalation: false,
            proactive_prompt: false,
            data: None,
        }
    }

    /// Final reply; the session completes
    pub fn ending(text: impl Into<String>) -> Self {
        Self {
            should_end: true,
            ..Self::reply(text)
        }
    }

    /// Prompt emitted because the caller stayed silent
    pub fn proactive(text: impl Into<String>) -> Self {
        Self {
            proactive_prompt: true,
            ..Self::reply(text)
        }
    }

    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = Some(data);
        self
    }
}

/// Per-session dialogue state, keyed by conversation id
///
/// Mutated only by the turn that currently holds the session lock. Serde
/// field-for-field so a durable store can persist it unchanged; `history`
/// is append-only for the lifetime of the session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationState {
    pub conversation_id: String,
    #[serde(default)]
    pub driver_id: Option<String>,
    #[serde(default)]
    pub language: Language,
    #[serde(default)]
    pub current_intent: Option<IntentType>,
    #[serde(default)]
    pub slots: HashMap<String, serde_json::Value>,
    #[serde(default)]
    pub status: ConversationStatus,
    #[serde(default)]
    pub history: Vec<HistoryEntry>,
    /// Consecutive low-confidence user turns
    #[serde(default)]
    pub retry_count: u32,
    /// Consecutive silence-only turns in the audio loop
    #[serde(default)]
    pub no_response_count: u32,
    pub last_activity: DateTime<Utc>,
    /// Audio chunks discarded under backpressure
    #[serde(default)]
    pub dropped_chunks: u64,
}

impl ConversationState {
    pub fn new(conversation_id: impl Into<String>, language: Language) -> Self {
        Self {
            conversation_id: conversation_id.into(),
            driver_id: None,
            language,
            current_intent: None,
            slots: HashMap::new(),
            status: ConversationStatus::Active,
            history: Vec::new(),
            retry_count: 0,
            no_response_count: 0,
            last_activity: Utc::now(),
            dropped_chunks: 0,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self.status,
            ConversationStatus::Completed | ConversationStatus::Escalated
        )
    }

    pub fn push_user(&mut self, text: impl Into<String>) {
        self.history.push(HistoryEntry::user(text));
    }

    pub fn push_bot(&mut self, text: impl Into<String>) {
        self.history.push(HistoryEntry::bot(text));
    }

    /// Merge extracted entities into slots, later values overwriting earlier
    /// ones for the same key
    pub fn merge_entities(&mut self, entities: HashMap<String, serde_json::Value>) {
        self.slots.extend(entities);
    }

    pub fn slot_str(&self, key: &str) -> Option<&str> {
        self.slots.get(key).and_then(|v| v.as_str())
    }

    /// Advance `last_activity`, keeping it strictly increasing even when two
    /// turns commit within clock resolution
    pub fn touch(&mut self) {
        let now = Utc::now();
        self.last_activity = if now > self.last_activity {
            now
        } else {
            self.last_activity + Duration::milliseconds(1)
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_states() {
        let mut state = ConversationState::new("c1", Language::En);
        assert!(!state.is_terminal());

        state.status = ConversationStatus::Completed;
        assert!(state.is_terminal());

        state.status = ConversationStatus::Escalated;
        assert!(state.is_terminal());
    }

    #[test]
    fn test_entity_merge_overwrites() {
        let mut state = ConversationState::new("c1", Language::En);
        state
            .slots
            .insert("location".into(), serde_json::json!("Delhi"));

        let mut entities = HashMap::new();
        entities.insert("location".to_string(), serde_json::json!("Noida"));
        entities.insert("date_range".to_string(), serde_json::json!("yesterday"));
        state.merge_entities(entities);

        assert_eq!(state.slot_str("location"), Some("Noida"));
        assert_eq!(state.slot_str("date_range"), Some("yesterday"));
    }

    #[test]
    fn test_touch_strictly_increases() {
        let mut state = ConversationState::new("c1", Language::En);
        let mut previous = state.last_activity;
        for _ in 0..5 {
            state.touch();
            assert!(state.last_activity > previous);
            previous = state.last_activity;
        }
    }

    #[test]
    fn test_state_serde_round_trip() {
        let mut state = ConversationState::new("c1", Language::Hi);
        state.current_intent = Some(IntentType::FindNearestStation);
        state.push_user("station");
        state.push_bot("Which area are you in?");

        let json = serde_json::to_string(&state).unwrap();
        let back: ConversationState = serde_json::from_str(&json).unwrap();

        assert_eq!(back.conversation_id, "c1");
        assert_eq!(back.language, Language::Hi);
        assert_eq!(back.current_intent, Some(IntentType::FindNearestStation));
        assert_eq!(back.history.len(), 2);
        assert_eq!(back.history[0].role, TurnRole::User);
    }

    #[test]
    fn test_intent_wire_names() {
        assert_eq!(
            serde_json::to_string(&IntentType::FindDsk).unwrap(),
            "\"FindDSK\""
        );
        assert_eq!(
            serde_json::to_string(&IntentType::GetSwapHistory).unwrap(),
            "\"GetSwapHistory\""
        );
    }
}
