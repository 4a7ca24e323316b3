//! Error taxonomy
//!
//! Adapter failures are recovered inside the orchestrator (callers see a
//! `TurnResult`); transport-level problems surface to the caller. Escalation
//! is never signalled through errors — `TurnResult::needs_escalation` is the
//! only handoff channel.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Adapter classes, used for timeout budgets and failure accounting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AdapterKind {
    Recognizer,
    Understander,
    Data,
    Synthesizer,
    Handoff,
}

impl std::fmt::Display for AdapterKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            AdapterKind::Recognizer => "recognizer",
            AdapterKind::Understander => "understander",
            AdapterKind::Data => "data",
            AdapterKind::Synthesizer => "synthesizer",
            AdapterKind::Handoff => "handoff",
        };
        write!(f, "{name}")
    }
}

#[derive(Debug, Error)]
pub enum Error {
    /// A turn arrived for a completed or escalated session. State is not
    /// mutated.
    #[error("session {conversation_id} is terminal")]
    SessionTerminal { conversation_id: String },

    /// An adapter call exceeded its per-turn deadline.
    #[error("{adapter} adapter timed out")]
    AdapterTimeout { adapter: AdapterKind },

    /// An adapter reported a non-recoverable error.
    #[error("{adapter} adapter unavailable: {message}")]
    AdapterUnavailable {
        adapter: AdapterKind,
        message: String,
    },

    /// Recognition produced no usable text; treated as a no-speech turn.
    #[error("recognizer returned empty text")]
    RecognizerEmpty,

    /// Malformed request; no session is created.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The session was cancelled externally (caller hung up). Never crosses
    /// the HTTP boundary as a failure.
    #[error("session cancelled")]
    Cancelled,

    /// Unexpected invariant violation. Surfaces to the caller and escalates
    /// the session.
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Errors the dialogue layer recovers from with an apology reply
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::AdapterTimeout { .. } | Error::AdapterUnavailable { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_names_stay_out_of_spoken_text() {
        // These strings go to logs and HTTP error bodies, never into replies.
        let err = Error::AdapterTimeout {
            adapter: AdapterKind::Understander,
        };
        assert_eq!(err.to_string(), "understander adapter timed out");
        assert!(err.is_recoverable());
    }

    #[test]
    fn test_terminal_is_not_recoverable() {
        let err = Error::SessionTerminal {
            conversation_id: "c1".into(),
        };
        assert!(!err.is_recoverable());
    }
}
