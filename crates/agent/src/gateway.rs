//! Single-shot voice turns
//!
//! The HTTP voice endpoint sends one complete audio clip per request. The
//! gateway runs the same pipeline as the streaming loop (VAD, recognition,
//! dialogue, synthesis) but without timing state: silence in the clip means
//! a proactive prompt, speech means a full turn.

use std::sync::Arc;

use driver_assist_config::{PromptCatalog, PromptKind};
use driver_assist_core::{
    AdapterKind, AudioClip, Language, Recognizer, Result, Synthesizer, TurnResult,
};
use driver_assist_pipeline::{vad, VadConfig};

use crate::orchestrator::ConversationOrchestrator;

/// Response of one single-shot voice turn
#[derive(Debug, Clone)]
pub struct VoiceTurnOutput {
    pub transcribed_text: Option<String>,
    pub response_text: String,
    pub audio: Option<AudioClip>,
    pub proactive_prompt: bool,
    pub should_end: bool,
    pub needs_escalation: bool,
}

impl VoiceTurnOutput {
    fn from_result(result: TurnResult, transcribed: Option<String>, audio: Option<AudioClip>) -> Self {
        Self {
            transcribed_text: transcribed,
            response_text: result.reply_text,
            audio,
            proactive_prompt: result.proactive_prompt,
            should_end: result.should_end,
            needs_escalation: result.needs_escalation,
        }
    }
}

/// Clip-at-a-time voice front end over the orchestrator
pub struct VoiceGateway {
    orchestrator: Arc<ConversationOrchestrator>,
    recognizer: Arc<dyn Recognizer>,
    synthesizer: Arc<dyn Synthesizer>,
    prompts: Arc<PromptCatalog>,
    vad: VadConfig,
    sample_rate: u32,
}

impl VoiceGateway {
    pub fn new(
        orchestrator: Arc<ConversationOrchestrator>,
        recognizer: Arc<dyn Recognizer>,
        synthesizer: Arc<dyn Synthesizer>,
        prompts: Arc<PromptCatalog>,
        vad: VadConfig,
        sample_rate: u32,
    ) -> Self {
        Self {
            orchestrator,
            recognizer,
            synthesizer,
            prompts,
            vad,
            sample_rate,
        }
    }

    /// Process one PCM16 clip for a session
    pub async fn process_clip(
        &self,
        conversation_id: &str,
        pcm: &[u8],
        language: Language,
    ) -> Result<VoiceTurnOutput> {
        let clip = AudioClip::from_pcm16(pcm, self.sample_rate);
        let report = vad::analyze(&clip.samples, self.sample_rate, &self.vad);
        tracing::debug!(
            session_id = %conversation_id,
            has_speech = report.has_speech,
            rms = report.rms,
            reason = report.reason,
            "voice clip classified"
        );

        if !report.has_speech {
            // no recognition for silence; prompt the caller to speak.
            // audio stays empty: the client's own voice handles prompts
            let result = self
                .orchestrator
                .handle_no_speech(conversation_id, language)
                .await?;
            return Ok(VoiceTurnOutput::from_result(result, None, None));
        }

        let timeouts = self.orchestrator.timeouts();
        let health = self.orchestrator.health();
        let transcript = match tokio::time::timeout(
            timeouts.recognize,
            self.recognizer.transcribe(&clip, language),
        )
        .await
        {
            Ok(Ok(text)) => {
                health.record_success(AdapterKind::Recognizer);
                text
            }
            Ok(Err(e)) => {
                health.record_failure(AdapterKind::Recognizer);
                tracing::warn!(session_id = %conversation_id, error = %e, "recognizer failed");
                return Ok(self.apology(conversation_id, language));
            }
            Err(_) => {
                health.record_failure(AdapterKind::Recognizer);
                tracing::warn!(session_id = %conversation_id, "recognizer timed out");
                return Ok(self.apology(conversation_id, language));
            }
        };

        if transcript.trim().chars().count() < 2 {
            let result = self
                .orchestrator
                .handle_no_speech(conversation_id, language)
                .await?;
            return Ok(VoiceTurnOutput::from_result(result, None, None));
        }

        let result = self
            .orchestrator
            .handle_text(conversation_id, &transcript, Some(language))
            .await?;

        let audio = match tokio::time::timeout(
            timeouts.synthesize,
            self.synthesizer.synthesize(&result.reply_text, language),
        )
        .await
        {
            Ok(Ok(clip)) => {
                health.record_success(AdapterKind::Synthesizer);
                if clip.is_empty() {
                    None
                } else {
                    Some(clip)
                }
            }
            Ok(Err(e)) => {
                health.record_failure(AdapterKind::Synthesizer);
                tracing::warn!(session_id = %conversation_id, error = %e, "synthesis failed");
                None
            }
            Err(_) => {
                health.record_failure(AdapterKind::Synthesizer);
                tracing::warn!(session_id = %conversation_id, "synthesis timed out");
                None
            }
        };

        Ok(VoiceTurnOutput::from_result(
            result,
            Some(transcript),
            audio,
        ))
    }

    fn apology(&self, conversation_id: &str, language: Language) -> VoiceTurnOutput {
        let text = self
            .prompts
            .pick(PromptKind::Apology, language.code(), conversation_id, 0);
        VoiceTurnOutput {
            transcribed_text: None,
            response_text: text,
            audio: None,
            proactive_prompt: false,
            should_end: false,
            needs_escalation: false,
        }
    }
}
