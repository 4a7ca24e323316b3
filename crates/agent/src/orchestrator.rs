//! Conversation orchestrator
//!
//! Drives one dialogue turn at a time: understand the utterance, apply the
//! escalation and confidence gates, latch intents, merge slots, dispatch to
//! the intent handler, and commit the session. Silence turns arrive through
//! `handle_no_speech` from the voice loop.
//!
//! Every adapter call runs under a per-class timeout and a per-session
//! cancellation flag. Adapter trouble never surfaces to the caller as an
//! error: the turn recovers with a localized apology and the session stays
//! active.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

use driver_assist_config::{PromptCatalog, PromptKind, Settings};
use driver_assist_core::{
    AdapterKind, ConversationState, ConversationStatus, DataClient, Error, EscalationSummary,
    Handoff, IntentType, Language, Result, Sentiment, SessionStore, Station, Subscription,
    SwapRecord, TurnResult, Understander,
};

use crate::health::AdapterHealth;
use crate::intents::{self, HandlerOutcome};

pub const REASON_AGENT_OR_ANGRY: &str = "user requested agent or is angry";
pub const REASON_LOW_CONFIDENCE: &str = "low confidence after multiple attempts";
pub const REASON_NO_RESPONSE: &str = "no response";
pub const REASON_INTERNAL: &str = "internal error";

/// Per-adapter-class timeout budgets
#[derive(Debug, Clone, Copy)]
pub struct AdapterTimeouts {
    pub understand: Duration,
    pub data: Duration,
    pub recognize: Duration,
    pub synthesize: Duration,
    pub handoff: Duration,
}

impl Default for AdapterTimeouts {
    fn default() -> Self {
        use driver_assist_config::constants::timeouts::{
            DATA_MS, HANDOFF_MS, RECOGNIZE_MS, SYNTHESIZE_MS, UNDERSTAND_MS,
        };

        Self {
            understand: Duration::from_millis(UNDERSTAND_MS),
            data: Duration::from_millis(DATA_MS),
            recognize: Duration::from_millis(RECOGNIZE_MS),
            synthesize: Duration::from_millis(SYNTHESIZE_MS),
            handoff: Duration::from_millis(HANDOFF_MS),
        }
    }
}

impl AdapterTimeouts {
    pub fn from_settings(settings: &driver_assist_config::TimeoutConfig) -> Self {
        Self {
            understand: Duration::from_millis(settings.understand_ms),
            data: Duration::from_millis(settings.data_ms),
            recognize: Duration::from_millis(settings.recognize_ms),
            synthesize: Duration::from_millis(settings.synthesize_ms),
            handoff: Duration::from_millis(settings.handoff_ms),
        }
    }
}

/// Dialogue policy knobs
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    pub confidence_threshold: f32,
    pub max_retry: u32,
    pub max_no_response: u32,
    /// Lowercased at construction for case-insensitive matching
    pub agent_triggers: Vec<String>,
    pub degraded_threshold: u32,
    pub timeouts: AdapterTimeouts,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        use driver_assist_config::constants::dialogue::{
            AGENT_TRIGGERS, CONFIDENCE_THRESHOLD, DEGRADED_THRESHOLD, MAX_NO_RESPONSE, MAX_RETRY,
        };

        Self {
            confidence_threshold: CONFIDENCE_THRESHOLD,
            max_retry: MAX_RETRY,
            max_no_response: MAX_NO_RESPONSE,
            agent_triggers: AGENT_TRIGGERS.iter().map(|t| t.to_lowercase()).collect(),
            degraded_threshold: DEGRADED_THRESHOLD,
            timeouts: AdapterTimeouts::default(),
        }
    }
}

impl OrchestratorConfig {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            confidence_threshold: settings.dialogue.confidence_threshold,
            max_retry: settings.dialogue.max_retry,
            max_no_response: settings.dialogue.max_no_response,
            agent_triggers: settings
                .dialogue
                .agent_triggers
                .iter()
                .map(|t| t.to_lowercase())
                .collect(),
            degraded_threshold: settings.dialogue.degraded_threshold,
            timeouts: AdapterTimeouts::from_settings(&settings.timeouts),
        }
    }
}

/// Run an adapter call under its timeout budget and the session's
/// cancellation flag, keeping the failure counters current.
pub(crate) async fn guard_call<T, F>(
    kind: AdapterKind,
    budget: Duration,
    health: &AdapterHealth,
    cancel: &mut watch::Receiver<bool>,
    fut: F,
) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    if *cancel.borrow() {
        return Err(Error::Cancelled);
    }

    tokio::select! {
        _ = cancel.changed() => Err(Error::Cancelled),
        outcome = tokio::time::timeout(budget, fut) => match outcome {
            Ok(Ok(value)) => {
                health.record_success(kind);
                Ok(value)
            }
            Ok(Err(e)) => {
                health.record_failure(kind);
                Err(Error::AdapterUnavailable {
                    adapter: kind,
                    message: e.to_string(),
                })
            }
            Err(_) => {
                health.record_failure(kind);
                Err(Error::AdapterTimeout { adapter: kind })
            }
        }
    }
}

/// Data client wrapper that applies the data-class guard to every lookup,
/// so intent handlers stay a plain function of (state, data).
struct GuardedData {
    inner: Arc<dyn DataClient>,
    budget: Duration,
    health: Arc<AdapterHealth>,
    cancel: watch::Receiver<bool>,
}

#[async_trait]
impl DataClient for GuardedData {
    async fn get_swap_history(
        &self,
        driver_id: &str,
        date_range: &str,
    ) -> Result<Vec<SwapRecord>> {
        let mut cancel = self.cancel.clone();
        guard_call(
            AdapterKind::Data,
            self.budget,
            &self.health,
            &mut cancel,
            self.inner.get_swap_history(driver_id, date_range),
        )
        .await
    }

    async fn find_nearest_station(&self, location: &str) -> Result<Station> {
        let mut cancel = self.cancel.clone();
        guard_call(
            AdapterKind::Data,
            self.budget,
            &self.health,
            &mut cancel,
            self.inner.find_nearest_station(location),
        )
        .await
    }

    async fn check_subscription(&self, driver_id: &str) -> Result<Subscription> {
        let mut cancel = self.cancel.clone();
        guard_call(
            AdapterKind::Data,
            self.budget,
            &self.health,
            &mut cancel,
            self.inner.check_subscription(driver_id),
        )
        .await
    }

    fn name(&self) -> &str {
        self.inner.name()
    }
}

/// The dialogue brain for all sessions
pub struct ConversationOrchestrator {
    understander: Arc<dyn Understander>,
    data: Arc<dyn DataClient>,
    handoff: Arc<dyn Handoff>,
    store: Arc<dyn SessionStore>,
    prompts: Arc<PromptCatalog>,
    config: OrchestratorConfig,
    health: Arc<AdapterHealth>,
    cancellations: Mutex<HashMap<String, watch::Sender<bool>>>,
}

impl ConversationOrchestrator {
    pub fn new(
        understander: Arc<dyn Understander>,
        data: Arc<dyn DataClient>,
        handoff: Arc<dyn Handoff>,
        store: Arc<dyn SessionStore>,
        prompts: Arc<PromptCatalog>,
        config: OrchestratorConfig,
    ) -> Self {
        let health = Arc::new(AdapterHealth::new(config.degraded_threshold));
        Self {
            understander,
            data,
            handoff,
            store,
            prompts,
            config,
            health,
            cancellations: Mutex::new(HashMap::new()),
        }
    }

    pub fn health(&self) -> &AdapterHealth {
        &self.health
    }

    pub fn store(&self) -> &Arc<dyn SessionStore> {
        &self.store
    }

    pub fn timeouts(&self) -> AdapterTimeouts {
        self.config.timeouts
    }

    /// Drive one text turn
    pub async fn handle_text(
        &self,
        conversation_id: &str,
        text: &str,
        language: Option<Language>,
    ) -> Result<TurnResult> {
        if conversation_id.trim().is_empty() {
            return Err(Error::InvalidInput(
                "conversation_id must not be empty".to_string(),
            ));
        }
        if text.trim().is_empty() {
            return Err(Error::InvalidInput("text must not be empty".to_string()));
        }

        let _lease = self.store.lock(conversation_id).await?;
        let mut state = self
            .store
            .get_or_create(conversation_id, language.unwrap_or_default())
            .await?;
        if state.is_terminal() {
            return Err(Error::SessionTerminal {
                conversation_id: conversation_id.to_string(),
            });
        }
        if let Some(language) = language {
            state.language = language;
        }
        let lang = state.language.code();

        state.push_user(text);
        state.no_response_count = 0;

        let mut cancel = self.cancel_flag(conversation_id);
        let nlu = match guard_call(
            AdapterKind::Understander,
            self.config.timeouts.understand,
            &self.health,
            &mut cancel,
            self.understander.analyze(text, state.language),
        )
        .await
        {
            Ok(nlu) => nlu,
            Err(Error::Cancelled) => return self.finish_cancelled(state).await,
            Err(e) if e.is_recoverable() => return self.recover_with_apology(state, e).await,
            Err(e) => return self.fail_internal(state, e).await,
        };

        tracing::debug!(
            session_id = %conversation_id,
            intent = %nlu.intent,
            confidence = nlu.confidence,
            sentiment = ?nlu.sentiment,
            "turn understood"
        );

        // Immediate escalation precedes the confidence gate
        if nlu.sentiment == Sentiment::Angry || self.matches_agent_trigger(text) {
            let result = self
                .escalate_with(&mut state, REASON_AGENT_OR_ANGRY, PromptKind::Handoff)
                .await;
            return self.commit(state, result).await;
        }

        // Confidence gate; bypassed when entities can merge into a latched
        // intent (the entities apply to that intent, low confidence or not)
        let bypass = state.current_intent.is_some() && !nlu.entities.is_empty();
        if nlu.confidence < self.config.confidence_threshold && !bypass {
            state.retry_count += 1;
            if state.retry_count > self.config.max_retry {
                let result = self
                    .escalate_with(&mut state, REASON_LOW_CONFIDENCE, PromptKind::Handoff)
                    .await;
                return self.commit(state, result).await;
            }
            let prompt =
                self.prompts
                    .pick(PromptKind::Clarification, lang, conversation_id, state.retry_count);
            state.push_bot(&prompt);
            return self.commit(state, TurnResult::reply(prompt)).await;
        }

        // The intent latches before entities merge
        if nlu.intent != IntentType::Unknown {
            state.current_intent = Some(nlu.intent);
        }
        state.merge_entities(nlu.entities);

        let Some(intent) = state.current_intent else {
            let prompt = self.prompts.pick(
                PromptKind::Rephrase,
                lang,
                conversation_id,
                state.history.len() as u32,
            );
            state.push_bot(&prompt);
            return self.commit(state, TurnResult::reply(prompt)).await;
        };

        let data = GuardedData {
            inner: Arc::clone(&self.data),
            budget: self.config.timeouts.data,
            health: Arc::clone(&self.health),
            cancel: cancel.clone(),
        };
        let outcome = match intents::dispatch(intent, &mut state, &data, &self.prompts).await {
            Ok(outcome) => outcome,
            Err(Error::Cancelled) => return self.finish_cancelled(state).await,
            Err(e) if e.is_recoverable() => return self.recover_with_apology(state, e).await,
            Err(e) => return self.fail_internal(state, e).await,
        };

        match outcome {
            HandlerOutcome::Reply(result) => {
                state.push_bot(&result.reply_text);
                if result.should_end {
                    state.status = ConversationStatus::Completed;
                }
                state.retry_count = 0;
                self.commit(state, result).await
            }
            HandlerOutcome::Escalate { reason } => {
                let result = self
                    .escalate_with(&mut state, &reason, PromptKind::Handoff)
                    .await;
                self.commit(state, result).await
            }
        }
    }

    /// Drive a turn where the caller did not speak
    ///
    /// Called by the turn controller on silence windows and empty
    /// transcriptions.
    pub async fn handle_no_speech(
        &self,
        conversation_id: &str,
        language: Language,
    ) -> Result<TurnResult> {
        if conversation_id.trim().is_empty() {
            return Err(Error::InvalidInput(
                "conversation_id must not be empty".to_string(),
            ));
        }

        let _lease = self.store.lock(conversation_id).await?;
        let mut state = self.store.get_or_create(conversation_id, language).await?;
        if state.is_terminal() {
            return Err(Error::SessionTerminal {
                conversation_id: conversation_id.to_string(),
            });
        }
        state.language = language;
        state.no_response_count += 1;

        if state.no_response_count > self.config.max_no_response {
            let result = self
                .escalate_with(&mut state, REASON_NO_RESPONSE, PromptKind::NoResponseFarewell)
                .await;
            return self.commit(state, result).await;
        }

        let prompt = self.prompts.pick(
            PromptKind::Proactive,
            state.language.code(),
            conversation_id,
            state.no_response_count,
        );
        state.push_bot(&prompt);
        tracing::debug!(
            session_id = %conversation_id,
            count = state.no_response_count,
            "proactive prompt"
        );
        self.commit(state, TurnResult::proactive(prompt)).await
    }

    /// Fold audio chunks discarded under backpressure into the session
    ///
    /// Called by the voice loop at turn boundaries, so the counter moves
    /// under the same lock discipline as every other mutation.
    pub async fn record_dropped_chunks(&self, conversation_id: &str, dropped: u64) {
        if dropped == 0 {
            return;
        }
        let Ok(_lease) = self.store.lock(conversation_id).await else {
            return;
        };
        if let Some(mut state) = self.store.get(conversation_id).await {
            state.dropped_chunks += dropped;
            tracing::debug!(
                session_id = %conversation_id,
                dropped,
                total = state.dropped_chunks,
                "audio chunks dropped under backpressure"
            );
            self.store.save(state).await;
        }
    }

    /// Cancel a session externally (caller hung up)
    ///
    /// Idempotent. Any in-flight adapter call aborts at its next suspension
    /// point; the session completes with reason `cancelled`.
    pub async fn cancel(&self, conversation_id: &str) {
        {
            let mut map = self.cancellations.lock();
            let tx = map
                .entry(conversation_id.to_string())
                .or_insert_with(|| watch::channel(false).0);
            tx.send_replace(true);
        }

        if self.store.get(conversation_id).await.is_none() {
            self.cancellations.lock().remove(conversation_id);
            return;
        }
        let Ok(_lease) = self.store.lock(conversation_id).await else {
            // reject policy: the in-flight turn observes the flag and unwinds
            return;
        };
        if let Some(mut state) = self.store.get(conversation_id).await {
            if !state.is_terminal() {
                state.status = ConversationStatus::Completed;
                state.touch();
                tracing::info!(session_id = %conversation_id, reason = "cancelled", "session cancelled");
                self.store.save(state).await;
            }
        }
        self.cancellations.lock().remove(conversation_id);
    }

    fn matches_agent_trigger(&self, text: &str) -> bool {
        let lower = text.to_lowercase();
        self.config
            .agent_triggers
            .iter()
            .any(|trigger| lower.contains(trigger))
    }

    fn cancel_flag(&self, conversation_id: &str) -> watch::Receiver<bool> {
        self.cancellations
            .lock()
            .entry(conversation_id.to_string())
            .or_insert_with(|| watch::channel(false).0)
            .subscribe()
    }

    /// Mark escalated, notify the handoff adapter once, and build the reply
    async fn escalate_with(
        &self,
        state: &mut ConversationState,
        reason: &str,
        prompt_kind: PromptKind,
    ) -> TurnResult {
        state.status = ConversationStatus::Escalated;
        let summary = EscalationSummary {
            reason: reason.to_string(),
            intent: state.current_intent,
            slots: state.slots.clone(),
            history: state.history.clone(),
        };

        let mut cancel = self.cancel_flag(&state.conversation_id);
        let outcome = guard_call(
            AdapterKind::Handoff,
            self.config.timeouts.handoff,
            &self.health,
            &mut cancel,
            self.handoff.escalate(&state.conversation_id, &summary),
        )
        .await;
        if let Err(e) = outcome {
            tracing::warn!(
                session_id = %state.conversation_id,
                error = %e,
                "handoff adapter failed; session stays escalated"
            );
        }

        let text = self.prompts.pick(
            prompt_kind,
            state.language.code(),
            &state.conversation_id,
            0,
        );
        state.push_bot(&text);
        tracing::info!(session_id = %state.conversation_id, reason, "session escalated");

        TurnResult {
            reply_text: text,
            should_end: true,
            needs_escalation: true,
            proactive_prompt: false,
            data: None,
        }
    }

    /// Adapter trouble: apologize, bump the retry counter, stay active
    async fn recover_with_apology(
        &self,
        mut state: ConversationState,
        err: Error,
    ) -> Result<TurnResult> {
        state.retry_count += 1;
        tracing::warn!(
            session_id = %state.conversation_id,
            error = %err,
            "adapter failure recovered with apology"
        );
        let text = self.prompts.pick(
            PromptKind::Apology,
            state.language.code(),
            &state.conversation_id,
            state.retry_count,
        );
        state.push_bot(&text);
        self.commit(state, TurnResult::reply(text)).await
    }

    /// Invariant violation: escalate the session and surface the error
    async fn fail_internal(&self, mut state: ConversationState, err: Error) -> Result<TurnResult> {
        tracing::error!(
            session_id = %state.conversation_id,
            error = %err,
            "internal failure; escalating session"
        );
        let _ = self
            .escalate_with(&mut state, REASON_INTERNAL, PromptKind::Handoff)
            .await;
        state.touch();
        self.cancellations.lock().remove(&state.conversation_id);
        self.store.save(state).await;
        Err(err)
    }

    async fn finish_cancelled(&self, mut state: ConversationState) -> Result<TurnResult> {
        if !state.is_terminal() {
            state.status = ConversationStatus::Completed;
            tracing::info!(
                session_id = %state.conversation_id,
                reason = "cancelled",
                "session completed"
            );
        }
        state.touch();
        self.cancellations.lock().remove(&state.conversation_id);
        self.store.save(state).await;
        Err(Error::Cancelled)
    }

    async fn commit(&self, mut state: ConversationState, result: TurnResult) -> Result<TurnResult> {
        state.touch();
        if state.is_terminal() {
            // no further turns can run; the cancellation channel is done
            self.cancellations.lock().remove(&state.conversation_id);
        }
        self.store.save(state).await;
        Ok(result)
    }
}
