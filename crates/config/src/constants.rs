//! Centralized defaults for the driver-assist service
//!
//! Single source of truth for operational parameters. Business content
//! (prompt texts) lives in `prompts`; everything here is a tuning knob.

/// Dialogue policy defaults
pub mod dialogue {
    /// Below this NLU confidence the clarification branch runs
    pub const CONFIDENCE_THRESHOLD: f32 = 0.6;

    /// Max consecutive low-confidence turns before escalation
    pub const MAX_RETRY: u32 = 2;

    /// Max consecutive silences before terminal escalation
    pub const MAX_NO_RESPONSE: u32 = 3;

    /// Adapter failures in a row before the adapter is flagged degraded
    pub const DEGRADED_THRESHOLD: u32 = 3;

    /// Phrases that force immediate escalation, matched case-insensitively
    pub const AGENT_TRIGGERS: &[&str] = &["agent", "executive", "human", "एजेंट"];
}

/// Audio turn-taking defaults
pub mod turn {
    /// Silence from listening start before a proactive prompt (ms)
    pub const SILENCE_WINDOW_MS: u64 = 1500;

    /// Non-speech after a speech-bearing prefix before recognition (ms)
    pub const END_OF_UTTERANCE_SILENCE_MS: u64 = 1500;

    /// Working sample rate for the voice loop
    pub const SAMPLE_RATE: u32 = 16000;
}

/// Voice activity detection defaults
pub mod vad {
    /// RMS below this is silence
    pub const SILENCE_THRESHOLD_RMS: f32 = 0.01;

    /// Shorter buffers never count as speech (s)
    pub const MIN_SPEECH_SECONDS: f32 = 0.3;

    /// Longest silence tracked inside an utterance (s)
    pub const MAX_SILENCE_SECONDS: f32 = 1.5;

    /// Zero-crossing band for 8-16 kHz voice. Hum sits below, broadband
    /// noise above.
    pub const ZCR_SPEECH_MIN: f32 = 0.01;
    pub const ZCR_SPEECH_MAX: f32 = 0.45;
}

/// Per-adapter-class timeout budgets (ms)
pub mod timeouts {
    pub const UNDERSTAND_MS: u64 = 5_000;
    pub const DATA_MS: u64 = 5_000;
    pub const RECOGNIZE_MS: u64 = 10_000;
    pub const SYNTHESIZE_MS: u64 = 10_000;
    pub const HANDOFF_MS: u64 = 5_000;
}

/// Session store defaults
pub mod session {
    pub const MAX_SESSIONS: usize = 100;

    /// How long terminal sessions are kept for auditing (s)
    pub const RETENTION_SECS: u64 = 3_600;

    /// Sweep interval for the retention task (s)
    pub const SWEEP_INTERVAL_SECS: u64 = 300;
}
