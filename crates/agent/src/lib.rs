//! Dialogue core: orchestrator, intent handlers, session store and voice loop
//!
//! The `ConversationOrchestrator` drives text turns (intent handling, slot
//! filling, confidence gating, escalation). The `TurnController` wraps it in
//! the real-time audio loop; the `VoiceGateway` does the same for single-shot
//! audio clips arriving over HTTP.

pub mod controller;
pub mod gateway;
pub mod health;
pub mod intents;
pub mod orchestrator;
pub mod session;

pub use controller::{TurnController, TurnControllerConfig, TurnPhase, VoiceEvent};
pub use gateway::{VoiceGateway, VoiceTurnOutput};
pub use health::AdapterHealth;
pub use orchestrator::{AdapterTimeouts, ConversationOrchestrator, OrchestratorConfig};
pub use session::InMemorySessionStore;
