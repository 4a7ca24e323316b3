//! Recognition and synthesis stand-ins
//!
//! `ScriptedRecognizer` pops lines from a queue (falling back to a canned
//! per-language phrase), which is enough to drive the whole voice loop in
//! development. `SilentSynthesizer` and `ToneSynthesizer` are the two ends
//! of the no-provider TTS spectrum: nothing, or an audible placeholder.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;

use driver_assist_core::{AudioClip, Language, Recognizer, Result, Synthesizer};

const SAMPLE_RATE: u32 = 16000;

/// Recognizer that replays a scripted queue of transcripts
pub struct ScriptedRecognizer {
    script: Mutex<VecDeque<String>>,
}

impl ScriptedRecognizer {
    pub fn new() -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
        }
    }

    pub fn with_script<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            script: Mutex::new(lines.into_iter().map(Into::into).collect()),
        }
    }

    /// Queue another transcript
    pub fn push_line(&self, line: impl Into<String>) {
        self.script.lock().push_back(line.into());
    }

    fn canned(language: Language) -> &'static str {
        match language {
            Language::En => "Hello, I need help finding a station",
            Language::Hi => "नमस्ते, मुझे स्टेशन ढूंढने में मदद चाहिए",
        }
    }
}

impl Default for ScriptedRecognizer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Recognizer for ScriptedRecognizer {
    async fn transcribe(&self, _audio: &AudioClip, language: Language) -> Result<String> {
        let scripted = self.script.lock().pop_front();
        Ok(scripted.unwrap_or_else(|| Self::canned(language).to_string()))
    }

    fn name(&self) -> &str {
        "scripted-asr"
    }
}

/// Synthesizer that produces no audio
///
/// The reply text still reaches the caller over the text channel; browser
/// or carrier TTS takes over on the audio side.
#[derive(Debug, Default)]
pub struct SilentSynthesizer;

impl SilentSynthesizer {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Synthesizer for SilentSynthesizer {
    async fn synthesize(&self, text: &str, _language: Language) -> Result<AudioClip> {
        tracing::debug!(chars = text.chars().count(), "silent synthesis");
        Ok(AudioClip::empty(SAMPLE_RATE))
    }

    fn name(&self) -> &str {
        "silent-tts"
    }
}

/// Synthesizer that emits a quiet tone sized to the text
///
/// Keeps the audio path exercised end-to-end: frames really flow, durations
/// scale with reply length, and output is deterministic.
#[derive(Debug, Default)]
pub struct ToneSynthesizer;

impl ToneSynthesizer {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Synthesizer for ToneSynthesizer {
    async fn synthesize(&self, text: &str, _language: Language) -> Result<AudioClip> {
        // ~60 ms per word, clamped to keep test turns short
        let words = text.split_whitespace().count().max(1);
        let seconds = (words as f32 * 0.06).min(2.0);
        let count = (SAMPLE_RATE as f32 * seconds) as usize;

        let samples = (0..count)
            .map(|i| {
                (i as f32 * 440.0 * 2.0 * std::f32::consts::PI / SAMPLE_RATE as f32).sin() * 0.2
            })
            .collect();

        Ok(AudioClip::new(samples, SAMPLE_RATE))
    }

    fn name(&self) -> &str {
        "tone-tts"
    }
}
