//! Core types and contracts for the driver-assist voice support service
//!
//! This crate provides the foundation used by every other crate:
//! - Capability contracts for pluggable adapters (recognition, understanding,
//!   data lookups, synthesis, handoff, session storage)
//! - Conversation types (state, history, intents, sentiment, turn results)
//! - Audio clip type and PCM conversion
//! - Error taxonomy

pub mod audio;
pub mod conversation;
pub mod error;
pub mod language;
pub mod records;
pub mod traits;

pub use audio::AudioClip;
pub use conversation::{
    ConversationState, ConversationStatus, HistoryEntry, IntentType, NluResult, Sentiment,
    TurnResult, TurnRole,
};
pub use error::{AdapterKind, Error, Result};
pub use language::Language;
pub use records::{EscalationSummary, Station, Subscription, SubscriptionStatus, SwapRecord};
pub use traits::{
    DataClient, Handoff, Recognizer, SessionLease, SessionStore, Synthesizer, Understander,
};
