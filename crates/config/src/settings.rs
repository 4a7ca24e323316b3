//! Main settings module

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

use crate::constants::{dialogue, session, timeouts, turn, vad};
use crate::ConfigError;

/// Main application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub dialogue: DialogueConfig,

    #[serde(default)]
    pub turn: TurnConfig,

    #[serde(default)]
    pub vad: VadSettings,

    #[serde(default)]
    pub timeouts: TimeoutConfig,

    #[serde(default)]
    pub adapters: AdapterSelection,

    #[serde(default)]
    pub session: SessionConfig,

    #[serde(default)]
    pub observability: ObservabilityConfig,

    /// Prompt-catalog overlay (YAML). Buckets found in the file replace the
    /// builtin texts; a missing file means the builtin voice.
    #[serde(default = "default_prompts_path")]
    pub prompts_path: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            dialogue: DialogueConfig::default(),
            turn: TurnConfig::default(),
            vad: VadSettings::default(),
            timeouts: TimeoutConfig::default(),
            adapters: AdapterSelection::default(),
            session: SessionConfig::default(),
            observability: ObservabilityConfig::default(),
            prompts_path: default_prompts_path(),
        }
    }
}

fn default_prompts_path() -> String {
    "config/prompts.yaml".to_string()
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_true")]
    pub cors_enabled: bool,
    #[serde(default)]
    pub cors_origins: Vec<String>,
    /// Public base URL handed to the telephony carrier for media streaming
    #[serde(default = "default_public_url")]
    pub public_url: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_enabled: true,
            cors_origins: Vec::new(),
            public_url: default_public_url(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_public_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_true() -> bool {
    true
}

/// Dialogue policy: confidence gating, retry budgets, escalation triggers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DialogueConfig {
    #[serde(default = "default_confidence_threshold")]
    pub confidence_threshold: f32,
    #[serde(default = "default_max_retry")]
    pub max_retry: u32,
    #[serde(default = "default_max_no_response")]
    pub max_no_response: u32,
    /// Case-insensitive phrases that force immediate escalation
    #[serde(default = "default_agent_triggers")]
    pub agent_triggers: Vec<String>,
    #[serde(default = "default_degraded_threshold")]
    pub degraded_threshold: u32,
}

impl Default for DialogueConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: default_confidence_threshold(),
            max_retry: default_max_retry(),
            max_no_response: default_max_no_response(),
            agent_triggers: default_agent_triggers(),
            degraded_threshold: default_degraded_threshold(),
        }
    }
}

fn default_confidence_threshold() -> f32 {
    dialogue::CONFIDENCE_THRESHOLD
}

fn default_max_retry() -> u32 {
    dialogue::MAX_RETRY
}

fn default_max_no_response() -> u32 {
    dialogue::MAX_NO_RESPONSE
}

fn default_agent_triggers() -> Vec<String> {
    dialogue::AGENT_TRIGGERS
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_degraded_threshold() -> u32 {
    dialogue::DEGRADED_THRESHOLD
}

/// What to do with audio that arrives while the loop is not listening
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "policy", rename_all = "lowercase")]
pub enum Backpressure {
    /// Discard and count
    #[default]
    Drop,
    /// Hold up to `max_chunks`, then discard and count
    Queue { max_chunks: usize },
}

/// Audio turn-taking configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnConfig {
    #[serde(default = "default_silence_window_ms")]
    pub silence_window_ms: u64,
    #[serde(default = "default_end_of_utterance_ms")]
    pub end_of_utterance_silence_ms: u64,
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,
    #[serde(default)]
    pub backpressure: Backpressure,
}

impl Default for TurnConfig {
    fn default() -> Self {
        Self {
            silence_window_ms: default_silence_window_ms(),
            end_of_utterance_silence_ms: default_end_of_utterance_ms(),
            sample_rate: default_sample_rate(),
            backpressure: Backpressure::Drop,
        }
    }
}

fn default_silence_window_ms() -> u64 {
    turn::SILENCE_WINDOW_MS
}

fn default_end_of_utterance_ms() -> u64 {
    turn::END_OF_UTTERANCE_SILENCE_MS
}

fn default_sample_rate() -> u32 {
    turn::SAMPLE_RATE
}

/// Voice activity detection thresholds
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VadSettings {
    #[serde(default = "default_silence_threshold_rms")]
    pub silence_threshold_rms: f32,
    #[serde(default = "default_min_speech_seconds")]
    pub min_speech_seconds: f32,
    #[serde(default = "default_max_silence_seconds")]
    pub max_silence_seconds: f32,
    #[serde(default = "default_zcr_speech_min")]
    pub zcr_speech_min: f32,
    #[serde(default = "default_zcr_speech_max")]
    pub zcr_speech_max: f32,
}

impl Default for VadSettings {
    fn default() -> Self {
        Self {
            silence_threshold_rms: default_silence_threshold_rms(),
            min_speech_seconds: default_min_speech_seconds(),
            max_silence_seconds: default_max_silence_seconds(),
            zcr_speech_min: default_zcr_speech_min(),
            zcr_speech_max: default_zcr_speech_max(),
        }
    }
}

fn default_silence_threshold_rms() -> f32 {
    vad::SILENCE_THRESHOLD_RMS
}

fn default_min_speech_seconds() -> f32 {
    vad::MIN_SPEECH_SECONDS
}

fn default_max_silence_seconds() -> f32 {
    vad::MAX_SILENCE_SECONDS
}

fn default_zcr_speech_min() -> f32 {
    vad::ZCR_SPEECH_MIN
}

fn default_zcr_speech_max() -> f32 {
    vad::ZCR_SPEECH_MAX
}

/// Per-adapter-class timeout budgets in milliseconds
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeoutConfig {
    #[serde(default = "default_understand_ms")]
    pub understand_ms: u64,
    #[serde(default = "default_data_ms")]
    pub data_ms: u64,
    #[serde(default = "default_recognize_ms")]
    pub recognize_ms: u64,
    #[serde(default = "default_synthesize_ms")]
    pub synthesize_ms: u64,
    #[serde(default = "default_handoff_ms")]
    pub handoff_ms: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            understand_ms: default_understand_ms(),
            data_ms: default_data_ms(),
            recognize_ms: default_recognize_ms(),
            synthesize_ms: default_synthesize_ms(),
            handoff_ms: default_handoff_ms(),
        }
    }
}

fn default_understand_ms() -> u64 {
    timeouts::UNDERSTAND_MS
}

fn default_data_ms() -> u64 {
    timeouts::DATA_MS
}

fn default_recognize_ms() -> u64 {
    timeouts::RECOGNIZE_MS
}

fn default_synthesize_ms() -> u64 {
    timeouts::SYNTHESIZE_MS
}

fn default_handoff_ms() -> u64 {
    timeouts::HANDOFF_MS
}

/// Adapter selection by name
///
/// Names resolve in the adapters crate factory; unknown names fail startup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdapterSelection {
    #[serde(default = "default_understander")]
    pub understander: String,
    #[serde(default = "default_recognizer")]
    pub recognizer: String,
    #[serde(default = "default_synthesizer")]
    pub synthesizer: String,
    #[serde(default = "default_data")]
    pub data: String,
    #[serde(default = "default_handoff")]
    pub handoff: String,
}

impl Default for AdapterSelection {
    fn default() -> Self {
        Self {
            understander: default_understander(),
            recognizer: default_recognizer(),
            synthesizer: default_synthesizer(),
            data: default_data(),
            handoff: default_handoff(),
        }
    }
}

fn default_understander() -> String {
    "keyword".to_string()
}

fn default_recognizer() -> String {
    "scripted".to_string()
}

fn default_synthesizer() -> String {
    "silent".to_string()
}

fn default_data() -> String {
    "static".to_string()
}

fn default_handoff() -> String {
    "logging".to_string()
}

/// Concurrent-turn policy for a single conversation id
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ConcurrencyPolicy {
    /// Queue turns FIFO on the session lock
    #[default]
    Serialize,
    /// Reject a turn while another is in flight
    Reject,
}

/// Session store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    #[serde(default = "default_max_sessions")]
    pub max_sessions: usize,
    /// Audit retention for terminal sessions (s)
    #[serde(default = "default_retention_secs")]
    pub retention_secs: u64,
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
    #[serde(default)]
    pub concurrency: ConcurrencyPolicy,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_sessions: default_max_sessions(),
            retention_secs: default_retention_secs(),
            sweep_interval_secs: default_sweep_interval_secs(),
            concurrency: ConcurrencyPolicy::Serialize,
        }
    }
}

fn default_max_sessions() -> usize {
    session::MAX_SESSIONS
}

fn default_retention_secs() -> u64 {
    session::RETENTION_SECS
}

fn default_sweep_interval_secs() -> u64 {
    session::SWEEP_INTERVAL_SECS
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub log_json: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_json: false,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Settings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate ranges that would otherwise fail silently at runtime
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.dialogue.confidence_threshold) {
            return Err(ConfigError::InvalidValue {
                field: "dialogue.confidence_threshold".to_string(),
                message: format!(
                    "must be between 0.0 and 1.0, got {}",
                    self.dialogue.confidence_threshold
                ),
            });
        }

        if self.vad.zcr_speech_min > self.vad.zcr_speech_max {
            return Err(ConfigError::InvalidValue {
                field: "vad.zcr_speech_min".to_string(),
                message: "lower bound exceeds upper bound".to_string(),
            });
        }

        if self.vad.silence_threshold_rms < 0.0 {
            return Err(ConfigError::InvalidValue {
                field: "vad.silence_threshold_rms".to_string(),
                message: "must be non-negative".to_string(),
            });
        }

        if self.turn.silence_window_ms == 0 || self.turn.end_of_utterance_silence_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "turn".to_string(),
                message: "silence windows must be positive".to_string(),
            });
        }

        if self.session.max_sessions == 0 {
            return Err(ConfigError::InvalidValue {
                field: "session.max_sessions".to_string(),
                message: "must allow at least one session".to_string(),
            });
        }

        Ok(())
    }
}

/// Load settings from files and environment
///
/// Priority: env vars > `config/{env}.yaml` > `config/default.yaml` > defaults.
pub fn load_settings(env: Option<&str>) -> Result<Settings, ConfigError> {
    let mut builder =
        Config::builder().add_source(File::with_name("config/default").required(false));

    if let Some(env) = env {
        builder =
            builder.add_source(File::with_name(&format!("config/{env}")).required(false));
    }

    let raw = builder
        .add_source(Environment::with_prefix("DRIVER_ASSIST").separator("__"))
        .build()?;

    let settings: Settings = raw.try_deserialize()?;
    settings.validate()?;
    Ok(settings)
}
