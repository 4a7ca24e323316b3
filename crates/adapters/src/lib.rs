//! Default adapter implementations
//!
//! Concrete providers live behind the core contracts; everything here works
//! without network access so the service runs end-to-end out of the box.
//! Cloud-backed implementations slot in through the same factory without
//! touching the dialogue core.

pub mod data;
pub mod factory;
pub mod handoff;
pub mod nlu;
pub mod speech;
pub mod telephony;

pub use data::StaticDataClient;
pub use factory::{
    build_data_client, build_handoff, build_recognizer, build_synthesizer, build_understander,
    AdapterBuildError,
};
pub use handoff::LoggingHandoff;
pub use nlu::KeywordUnderstander;
pub use speech::{ScriptedRecognizer, SilentSynthesizer, ToneSynthesizer};
pub use telephony::carrier_answer_document;
