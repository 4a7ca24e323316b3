//! Configuration for the driver-assist service
//!
//! Supports loading configuration from:
//! - YAML files (`config/default.yaml`, then `config/{env}.yaml`)
//! - Environment variables (`DRIVER_ASSIST_` prefix, `__` separator)
//!
//! Prompt tables live here too: every localized utterance the assistant can
//! produce without the dialogue layer (greetings, clarifications, proactive
//! prompts, farewells) is a config concern.

pub mod constants;
pub mod prompts;
pub mod settings;

pub use prompts::{PromptCatalog, PromptKind};
pub use settings::{
    load_settings, AdapterSelection, Backpressure, ConcurrencyPolicy, DialogueConfig,
    ObservabilityConfig, ServerConfig, SessionConfig, Settings, TimeoutConfig, TurnConfig,
    VadSettings,
};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("configuration file not found: {0}")]
    FileNotFound(String),

    #[error("failed to parse configuration: {0}")]
    ParseError(String),

    #[error("invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },
}

impl From<config::ConfigError> for ConfigError {
    fn from(err: config::ConfigError) -> Self {
        ConfigError::ParseError(err.to_string())
    }
}
