//! Adapter construction by configured name
//!
//! Startup resolves each adapter slot from `Settings.adapters`; an unknown
//! name fails boot rather than silently degrading.

use std::sync::Arc;
use thiserror::Error;

use driver_assist_core::{DataClient, Handoff, Recognizer, Synthesizer, Understander};

use crate::data::StaticDataClient;
use crate::handoff::LoggingHandoff;
use crate::nlu::KeywordUnderstander;
use crate::speech::{ScriptedRecognizer, SilentSynthesizer, ToneSynthesizer};

#[derive(Debug, Error)]
pub enum AdapterBuildError {
    #[error("unknown {slot} adapter: {name}")]
    Unknown { slot: &'static str, name: String },
}

pub fn build_understander(name: &str) -> Result<Arc<dyn Understander>, AdapterBuildError> {
    match name {
        "keyword" => Ok(Arc::new(KeywordUnderstander::new())),
        other => Err(AdapterBuildError::Unknown {
            slot: "understander",
            name: other.to_string(),
        }),
    }
}

pub fn build_recognizer(name: &str) -> Result<Arc<dyn Recognizer>, AdapterBuildError> {
    match name {
        "scripted" => Ok(Arc::new(ScriptedRecognizer::new())),
        other => Err(AdapterBuildError::Unknown {
            slot: "recognizer",
            name: other.to_string(),
        }),
    }
}

pub fn build_synthesizer(name: &str) -> Result<Arc<dyn Synthesizer>, AdapterBuildError> {
    match name {
        "silent" => Ok(Arc::new(SilentSynthesizer::new())),
        "tone" => Ok(Arc::new(ToneSynthesizer::new())),
        other => Err(AdapterBuildError::Unknown {
            slot: "synthesizer",
            name: other.to_string(),
        }),
    }
}

pub fn build_data_client(name: &str) -> Result<Arc<dyn DataClient>, AdapterBuildError> {
    match name {
        "static" => Ok(Arc::new(StaticDataClient::new())),
        other => Err(AdapterBuildError::Unknown {
            slot: "data",
            name: other.to_string(),
        }),
    }
}

pub fn build_handoff(name: &str) -> Result<Arc<dyn Handoff>, AdapterBuildError> {
    match name {
        "logging" => Ok(Arc::new(LoggingHandoff::new())),
        other => Err(AdapterBuildError::Unknown {
            slot: "handoff",
            name: other.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_names_resolve() {
        assert!(build_understander("keyword").is_ok());
        assert!(build_recognizer("scripted").is_ok());
        assert!(build_synthesizer("silent").is_ok());
        assert!(build_synthesizer("tone").is_ok());
        assert!(build_data_client("static").is_ok());
        assert!(build_handoff("logging").is_ok());
    }

    #[test]
    fn test_unknown_name_is_an_error() {
        let err = match build_understander("gpt-nlu") {
            Err(e) => e,
            Ok(_) => panic!("expected an error"),
        };
        assert!(err.to_string().contains("understander"));
        assert!(err.to_string().contains("gpt-nlu"));
    }
}
