//! Capability contracts
//!
//! The dialogue core depends only on these six narrow interfaces.
//! Implementations are injected at construction; nothing in the core names a
//! concrete provider. Every adapter exposes a `name()` for logging.

use async_trait::async_trait;

use crate::audio::AudioClip;
use crate::conversation::{ConversationState, NluResult};
use crate::error::Result;
use crate::language::Language;
use crate::records::{EscalationSummary, Station, Subscription, SwapRecord};

/// Speech-to-text
#[async_trait]
pub trait Recognizer: Send + Sync {
    /// Transcribe a speech-bearing clip
    ///
    /// Callers gate on voice activity first; a silence-classified buffer is
    /// never handed to the recognizer.
    async fn transcribe(&self, audio: &AudioClip, language: Language) -> Result<String>;

    fn name(&self) -> &str;
}

/// Text to intent, entities, sentiment and confidence
#[async_trait]
pub trait Understander: Send + Sync {
    async fn analyze(&self, text: &str, language: Language) -> Result<NluResult>;

    fn name(&self) -> &str;
}

/// Domain data lookups
#[async_trait]
pub trait DataClient: Send + Sync {
    async fn get_swap_history(&self, driver_id: &str, date_range: &str)
        -> Result<Vec<SwapRecord>>;

    async fn find_nearest_station(&self, location: &str) -> Result<Station>;

    async fn check_subscription(&self, driver_id: &str) -> Result<Subscription>;

    fn name(&self) -> &str;
}

/// Text-to-speech
#[async_trait]
pub trait Synthesizer: Send + Sync {
    async fn synthesize(&self, text: &str, language: Language) -> Result<AudioClip>;

    fn name(&self) -> &str;
}

/// Escalation to a human agent
#[async_trait]
pub trait Handoff: Send + Sync {
    async fn escalate(&self, conversation_id: &str, summary: &EscalationSummary) -> Result<()>;

    fn name(&self) -> &str;
}

/// Exclusive per-session access for the duration of one turn
///
/// Dropping the lease releases the session. A networked store substitutes a
/// lease or transaction of its own; the exclusion guarantee is part of the
/// contract, not an implementation detail.
pub struct SessionLease {
    _guard: tokio::sync::OwnedMutexGuard<()>,
}

impl SessionLease {
    pub fn new(guard: tokio::sync::OwnedMutexGuard<()>) -> Self {
        Self { _guard: guard }
    }
}

impl std::fmt::Debug for SessionLease {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionLease").finish_non_exhaustive()
    }
}

/// Session storage keyed by conversation id
///
/// `lock` is the mutual-exclusion contract: at most one turn may run per
/// conversation id, and callers hold the returned lease across the whole
/// turn (load, mutate, save). The in-memory default hands out fair FIFO
/// leases; replacements must provide equivalent per-key exclusion.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Load the session, creating a fresh `Active` state on first contact
    async fn get_or_create(
        &self,
        conversation_id: &str,
        language: Language,
    ) -> Result<ConversationState>;

    /// Load without creating
    async fn get(&self, conversation_id: &str) -> Option<ConversationState>;

    /// Persist the session
    async fn save(&self, state: ConversationState);

    /// Acquire exclusive access to the session for one turn
    async fn lock(&self, conversation_id: &str) -> Result<SessionLease>;

    /// Drop the session outright (used by retention sweeps)
    async fn remove(&self, conversation_id: &str);
}
