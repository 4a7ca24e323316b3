//! Shared fixtures for the dialogue and voice-loop tests

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use driver_assist_adapters::{ScriptedRecognizer, SilentSynthesizer, StaticDataClient};
use driver_assist_agent::{
    ConversationOrchestrator, InMemorySessionStore, OrchestratorConfig, VoiceGateway,
};
use driver_assist_config::PromptCatalog;
use driver_assist_core::{
    AudioClip, Error, EscalationSummary, Handoff, Language, NluResult, Recognizer, Result,
    SessionStore, Understander,
};

/// Understander that replays a scripted sequence of NLU results
pub struct ScriptedUnderstander {
    script: Mutex<VecDeque<NluResult>>,
}

impl ScriptedUnderstander {
    pub fn new<I>(results: I) -> Self
    where
        I: IntoIterator<Item = NluResult>,
    {
        Self {
            script: Mutex::new(results.into_iter().collect()),
        }
    }
}

#[async_trait]
impl Understander for ScriptedUnderstander {
    async fn analyze(&self, _text: &str, _language: Language) -> Result<NluResult> {
        Ok(self
            .script
            .lock()
            .pop_front()
            .unwrap_or_else(|| NluResult::new(driver_assist_core::IntentType::Unknown, 0.3)))
    }

    fn name(&self) -> &str {
        "scripted-nlu"
    }
}

/// Understander that always fails, for the recovery paths
pub struct FailingUnderstander;

#[async_trait]
impl Understander for FailingUnderstander {
    async fn analyze(&self, _text: &str, _language: Language) -> Result<NluResult> {
        Err(Error::Internal("upstream 503".to_string()))
    }

    fn name(&self) -> &str {
        "failing-nlu"
    }
}

/// Understander that never answers inside the budget
pub struct StallingUnderstander;

#[async_trait]
impl Understander for StallingUnderstander {
    async fn analyze(&self, _text: &str, _language: Language) -> Result<NluResult> {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Err(Error::Internal("unreachable".to_string()))
    }

    fn name(&self) -> &str {
        "stalling-nlu"
    }
}

/// Handoff that records every summary it receives
#[derive(Default)]
pub struct RecordingHandoff {
    pub summaries: Mutex<Vec<EscalationSummary>>,
}

impl RecordingHandoff {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self) -> usize {
        self.summaries.lock().len()
    }

    pub fn last_reason(&self) -> Option<String> {
        self.summaries.lock().last().map(|s| s.reason.clone())
    }
}

#[async_trait]
impl Handoff for RecordingHandoff {
    async fn escalate(&self, _conversation_id: &str, summary: &EscalationSummary) -> Result<()> {
        self.summaries.lock().push(summary.clone());
        Ok(())
    }

    fn name(&self) -> &str {
        "recording-handoff"
    }
}

/// Recognizer wrapper that counts transcriptions
pub struct CountingRecognizer {
    inner: ScriptedRecognizer,
    pub calls: AtomicUsize,
}

impl CountingRecognizer {
    pub fn new(inner: ScriptedRecognizer) -> Self {
        Self {
            inner,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Recognizer for CountingRecognizer {
    async fn transcribe(&self, audio: &AudioClip, language: Language) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.transcribe(audio, language).await
    }

    fn name(&self) -> &str {
        "counting-asr"
    }
}

/// Everything a scenario needs, wired with an in-memory store
pub struct Harness {
    pub orchestrator: Arc<ConversationOrchestrator>,
    pub handoff: Arc<RecordingHandoff>,
    pub store: Arc<InMemorySessionStore>,
}

pub fn harness(understander: Arc<dyn Understander>) -> Harness {
    harness_with_config(understander, OrchestratorConfig::default())
}

pub fn harness_with_config(
    understander: Arc<dyn Understander>,
    config: OrchestratorConfig,
) -> Harness {
    let handoff = Arc::new(RecordingHandoff::new());
    let store = Arc::new(InMemorySessionStore::new());
    let handoff_contract: Arc<dyn Handoff> = handoff.clone();
    let store_contract: Arc<dyn SessionStore> = store.clone();
    let orchestrator = Arc::new(ConversationOrchestrator::new(
        understander,
        Arc::new(StaticDataClient::new()),
        handoff_contract,
        store_contract,
        Arc::new(PromptCatalog::builtin()),
        config,
    ));
    Harness {
        orchestrator,
        handoff,
        store,
    }
}

/// Voice gateway over a harness, with a scripted recognizer
pub fn gateway(harness: &Harness, recognizer: Arc<dyn Recognizer>) -> VoiceGateway {
    VoiceGateway::new(
        harness.orchestrator.clone(),
        recognizer,
        Arc::new(SilentSynthesizer::new()),
        Arc::new(PromptCatalog::builtin()),
        driver_assist_pipeline::VadConfig::default(),
        16000,
    )
}

/// Half a second of a 440 Hz tone: classified as speech by the default VAD
pub fn voiced_clip(seconds: f32) -> Vec<f32> {
    let rate = 16000.0f32;
    let count = (rate * seconds) as usize;
    (0..count)
        .map(|i| (i as f32 * 440.0 * 2.0 * std::f32::consts::PI / rate).sin() * 0.5)
        .collect()
}

pub fn silent_clip(seconds: f32) -> Vec<f32> {
    vec![0.0; (16000.0 * seconds) as usize]
}
