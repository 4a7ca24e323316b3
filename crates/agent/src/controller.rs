//! Voice turn controller
//!
//! Per-session audio loop:
//! `Idle -> Greeting -> Listening -> Processing -> Speaking -> {Listening | Terminal}`.
//!
//! The transport owns the controller and drives it from a single task:
//! `push_chunk` for inbound audio, `poll` on a timer for silence boundaries.
//! Timestamps are passed in explicitly, which keeps every transition
//! unit-testable without sleeping.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::broadcast;

use driver_assist_config::{Backpressure, PromptCatalog, PromptKind};
use driver_assist_core::{
    AdapterKind, AudioClip, Error, Language, Recognizer, Result, Synthesizer, TurnResult,
};
use driver_assist_pipeline::{vad, TimingConfig, TurnSignal, UtteranceDetector, VadConfig};

use crate::orchestrator::ConversationOrchestrator;

/// Voice loop configuration
#[derive(Debug, Clone)]
pub struct TurnControllerConfig {
    pub language: Language,
    pub timing: TimingConfig,
    pub vad: VadConfig,
    pub sample_rate: u32,
    pub backpressure: Backpressure,
    pub recognize_budget: Duration,
    pub synthesize_budget: Duration,
}

impl Default for TurnControllerConfig {
    fn default() -> Self {
        use driver_assist_config::constants::timeouts::{RECOGNIZE_MS, SYNTHESIZE_MS};
        use driver_assist_config::constants::turn::SAMPLE_RATE;

        Self {
            language: Language::default(),
            timing: TimingConfig::default(),
            vad: VadConfig::default(),
            sample_rate: SAMPLE_RATE,
            backpressure: Backpressure::Drop,
            recognize_budget: Duration::from_millis(RECOGNIZE_MS),
            synthesize_budget: Duration::from_millis(SYNTHESIZE_MS),
        }
    }
}

/// Loop phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnPhase {
    Idle,
    Greeting,
    Listening,
    Processing,
    Speaking,
    Terminal,
}

/// Events emitted toward the transport
#[derive(Debug, Clone)]
pub enum VoiceEvent {
    Greeting {
        text: String,
        audio: AudioClip,
    },
    /// Final transcript of a recognized utterance
    Transcript {
        text: String,
    },
    Reply {
        text: String,
        audio: Option<AudioClip>,
        proactive: bool,
    },
    Ended {
        reason: String,
    },
}

/// The per-session voice loop state machine
pub struct TurnController {
    conversation_id: String,
    config: TurnControllerConfig,
    orchestrator: Arc<ConversationOrchestrator>,
    recognizer: Arc<dyn Recognizer>,
    synthesizer: Arc<dyn Synthesizer>,
    prompts: Arc<PromptCatalog>,
    phase: TurnPhase,
    buffer: Vec<f32>,
    detector: UtteranceDetector,
    queued: VecDeque<Vec<f32>>,
    dropped_chunks: u64,
    unsynced_drops: u64,
    events: broadcast::Sender<VoiceEvent>,
}

impl TurnController {
    pub fn new(
        conversation_id: impl Into<String>,
        config: TurnControllerConfig,
        orchestrator: Arc<ConversationOrchestrator>,
        recognizer: Arc<dyn Recognizer>,
        synthesizer: Arc<dyn Synthesizer>,
        prompts: Arc<PromptCatalog>,
        now: Instant,
    ) -> Self {
        let (events, _) = broadcast::channel(64);
        let detector = UtteranceDetector::new(config.timing, now);
        Self {
            conversation_id: conversation_id.into(),
            config,
            orchestrator,
            recognizer,
            synthesizer,
            prompts,
            phase: TurnPhase::Idle,
            buffer: Vec::new(),
            detector,
            queued: VecDeque::new(),
            dropped_chunks: 0,
            unsynced_drops: 0,
            events,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<VoiceEvent> {
        self.events.subscribe()
    }

    pub fn phase(&self) -> TurnPhase {
        self.phase
    }

    pub fn conversation_id(&self) -> &str {
        &self.conversation_id
    }

    /// Chunks discarded (or overflowed from the queue) while not listening
    pub fn dropped_chunks(&self) -> u64 {
        self.dropped_chunks
    }

    /// Greet the caller and start listening
    pub async fn start(&mut self, now: Instant) -> Result<()> {
        if self.phase != TurnPhase::Idle {
            return Err(Error::Internal("voice loop already started".to_string()));
        }
        self.phase = TurnPhase::Greeting;

        let text = self.prompts.pick(
            PromptKind::Greeting,
            self.config.language.code(),
            &self.conversation_id,
            0,
        );
        let audio = self
            .synthesize(&text)
            .await
            .unwrap_or_else(|| AudioClip::empty(self.config.sample_rate));
        let _ = self.events.send(VoiceEvent::Greeting { text, audio });

        self.enter_listening(now);
        Ok(())
    }

    /// Ingest one inbound audio chunk
    ///
    /// Only `Listening` consumes audio; other phases apply the backpressure
    /// policy. Chunks are consumed strictly in arrival order.
    pub fn push_chunk(&mut self, samples: &[f32], now: Instant) {
        match self.phase {
            TurnPhase::Listening => self.ingest(samples, now),
            TurnPhase::Greeting | TurnPhase::Processing | TurnPhase::Speaking => {
                match self.config.backpressure {
                    Backpressure::Drop => self.drop_chunk(),
                    Backpressure::Queue { max_chunks } => {
                        if self.queued.len() < max_chunks {
                            self.queued.push_back(samples.to_vec());
                        } else {
                            self.drop_chunk();
                        }
                    }
                }
            }
            TurnPhase::Idle | TurnPhase::Terminal => self.drop_chunk(),
        }
    }

    /// Check silence boundaries and run a turn when one is reached
    pub async fn poll(&mut self, now: Instant) -> Result<()> {
        if self.phase != TurnPhase::Listening {
            return Ok(());
        }
        match self.detector.poll(now) {
            TurnSignal::None => Ok(()),
            TurnSignal::SilenceTimeout => self.run_no_speech_turn(now).await,
            TurnSignal::EndOfUtterance => self.run_speech_turn(now).await,
        }
    }

    fn ingest(&mut self, samples: &[f32], now: Instant) {
        self.buffer.extend_from_slice(samples);
        let report = vad::analyze(&self.buffer, self.config.sample_rate, &self.config.vad);
        self.detector.observe(report.has_speech, now);
    }

    fn drop_chunk(&mut self) {
        self.dropped_chunks += 1;
        self.unsynced_drops += 1;
    }

    /// Push accumulated drop counts onto the session at a turn boundary
    async fn sync_drops(&mut self) {
        let drops = std::mem::take(&mut self.unsynced_drops);
        self.orchestrator
            .record_dropped_chunks(&self.conversation_id, drops)
            .await;
    }

    fn enter_listening(&mut self, now: Instant) {
        self.phase = TurnPhase::Listening;
        self.buffer.clear();
        self.detector.reset(now);
        // replay anything held back while we were speaking
        while let Some(chunk) = self.queued.pop_front() {
            self.ingest(&chunk, now);
        }
    }

    async fn run_no_speech_turn(&mut self, now: Instant) -> Result<()> {
        self.phase = TurnPhase::Processing;
        self.sync_drops().await;
        match self
            .orchestrator
            .handle_no_speech(&self.conversation_id, self.config.language)
            .await
        {
            Ok(result) => self.deliver(result, now).await,
            Err(e) => self.handle_turn_error(e, now).await,
        }
    }

    async fn run_speech_turn(&mut self, now: Instant) -> Result<()> {
        self.phase = TurnPhase::Processing;
        self.sync_drops().await;
        // the detector heard speech in this buffer, so the VAD invariant
        // (never recognize silence) holds by construction
        let clip = AudioClip::new(std::mem::take(&mut self.buffer), self.config.sample_rate);

        let health = self.orchestrator.health();
        let transcript = match tokio::time::timeout(
            self.config.recognize_budget,
            self.recognizer.transcribe(&clip, self.config.language),
        )
        .await
        {
            Ok(Ok(text)) => {
                health.record_success(AdapterKind::Recognizer);
                text
            }
            Ok(Err(e)) => {
                health.record_failure(AdapterKind::Recognizer);
                tracing::warn!(session_id = %self.conversation_id, error = %e, "recognizer failed");
                return self.apologize(now).await;
            }
            Err(_) => {
                health.record_failure(AdapterKind::Recognizer);
                tracing::warn!(session_id = %self.conversation_id, "recognizer timed out");
                return self.apologize(now).await;
            }
        };

        if transcript.trim().chars().count() < 2 {
            // empty or near-empty recognition: same path as silence
            return match self
                .orchestrator
                .handle_no_speech(&self.conversation_id, self.config.language)
                .await
            {
                Ok(result) => self.deliver(result, now).await,
                Err(e) => self.handle_turn_error(e, now).await,
            };
        }

        let _ = self.events.send(VoiceEvent::Transcript {
            text: transcript.clone(),
        });

        match self
            .orchestrator
            .handle_text(&self.conversation_id, &transcript, Some(self.config.language))
            .await
        {
            Ok(result) => self.deliver(result, now).await,
            Err(e) => self.handle_turn_error(e, now).await,
        }
    }

    /// Speak the reply, then either keep listening or terminate
    async fn deliver(&mut self, result: TurnResult, now: Instant) -> Result<()> {
        self.phase = TurnPhase::Speaking;
        let audio = self.synthesize(&result.reply_text).await;
        let _ = self.events.send(VoiceEvent::Reply {
            text: result.reply_text.clone(),
            audio,
            proactive: result.proactive_prompt,
        });

        if result.should_end || result.needs_escalation {
            // escalations already carry their own closing line; a normal
            // completion gets the farewell before the line drops
            if !result.needs_escalation {
                let farewell = self.prompts.pick(
                    PromptKind::Farewell,
                    self.config.language.code(),
                    &self.conversation_id,
                    0,
                );
                let audio = self.synthesize(&farewell).await;
                let _ = self.events.send(VoiceEvent::Reply {
                    text: farewell,
                    audio,
                    proactive: false,
                });
            }
            self.phase = TurnPhase::Terminal;
            let reason = if result.needs_escalation {
                "escalated"
            } else {
                "completed"
            };
            let _ = self.events.send(VoiceEvent::Ended {
                reason: reason.to_string(),
            });
        } else {
            self.enter_listening(now);
        }
        Ok(())
    }

    /// Adapter trouble outside the orchestrator: apologize and keep listening
    async fn apologize(&mut self, now: Instant) -> Result<()> {
        let text = self.prompts.pick(
            PromptKind::Apology,
            self.config.language.code(),
            &self.conversation_id,
            0,
        );
        let audio = self.synthesize(&text).await;
        let _ = self.events.send(VoiceEvent::Reply {
            text,
            audio,
            proactive: false,
        });
        self.enter_listening(now);
        Ok(())
    }

    async fn handle_turn_error(&mut self, err: Error, now: Instant) -> Result<()> {
        match &err {
            Error::SessionTerminal { .. } | Error::Cancelled => {
                self.phase = TurnPhase::Terminal;
                let _ = self.events.send(VoiceEvent::Ended {
                    reason: err.to_string(),
                });
                Ok(())
            }
            _ => {
                tracing::error!(
                    session_id = %self.conversation_id,
                    error = %err,
                    "turn failed"
                );
                self.apologize(now).await
            }
        }
    }

    async fn synthesize(&self, text: &str) -> Option<AudioClip> {
        let health = self.orchestrator.health();
        match tokio::time::timeout(
            self.config.synthesize_budget,
            self.synthesizer.synthesize(text, self.config.language),
        )
        .await
        {
            Ok(Ok(clip)) => {
                health.record_success(AdapterKind::Synthesizer);
                Some(clip)
            }
            Ok(Err(e)) => {
                health.record_failure(AdapterKind::Synthesizer);
                tracing::warn!(session_id = %self.conversation_id, error = %e, "synthesis failed");
                None
            }
            Err(_) => {
                health.record_failure(AdapterKind::Synthesizer);
                tracing::warn!(session_id = %self.conversation_id, "synthesis timed out");
                None
            }
        }
    }
}
