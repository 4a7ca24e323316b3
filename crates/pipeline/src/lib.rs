//! Audio-side processing for the voice loop
//!
//! Two pieces, both deterministic and free of I/O:
//! - `vad`: classifies a buffer as speech-bearing or silence
//! - `turn`: times silence windows and end-of-utterance boundaries

pub mod turn;
pub mod vad;

pub use turn::{TimingConfig, TurnSignal, UtteranceDetector};
pub use vad::{analyze, analyze_pcm16, VadConfig, VadReport};
