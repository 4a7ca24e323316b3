//! Application state
//!
//! Shared across all handlers. Adapters are resolved by name from the
//! settings at startup and injected into the orchestrator; handlers only
//! ever see the contracts.

use std::sync::Arc;

use driver_assist_adapters::factory;
use driver_assist_agent::{
    ConversationOrchestrator, InMemorySessionStore, OrchestratorConfig, TurnControllerConfig,
    VoiceGateway,
};
use driver_assist_config::{PromptCatalog, Settings};
use driver_assist_core::{Language, Recognizer, SessionStore, Synthesizer};
use driver_assist_pipeline::{TimingConfig, VadConfig};

use crate::ServerError;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub orchestrator: Arc<ConversationOrchestrator>,
    pub gateway: Arc<VoiceGateway>,
    pub prompts: Arc<PromptCatalog>,
    pub recognizer: Arc<dyn Recognizer>,
    pub synthesizer: Arc<dyn Synthesizer>,
    pub store: Arc<InMemorySessionStore>,
}

impl AppState {
    /// Wire the full stack from settings
    pub fn from_settings(settings: Settings) -> Result<Self, ServerError> {
        let wiring = |e: factory::AdapterBuildError| ServerError::Adapters(e.to_string());

        let understander = factory::build_understander(&settings.adapters.understander)
            .map_err(wiring)?;
        let recognizer = factory::build_recognizer(&settings.adapters.recognizer).map_err(wiring)?;
        let synthesizer =
            factory::build_synthesizer(&settings.adapters.synthesizer).map_err(wiring)?;
        let data = factory::build_data_client(&settings.adapters.data).map_err(wiring)?;
        let handoff = factory::build_handoff(&settings.adapters.handoff).map_err(wiring)?;

        let prompts = Arc::new(load_prompts(&settings.prompts_path));
        let store = Arc::new(InMemorySessionStore::with_config(&settings.session));

        let orchestrator = Arc::new(ConversationOrchestrator::new(
            understander,
            data,
            handoff,
            store.clone() as Arc<dyn SessionStore>,
            prompts.clone(),
            OrchestratorConfig::from_settings(&settings),
        ));

        let gateway = Arc::new(VoiceGateway::new(
            orchestrator.clone(),
            recognizer.clone(),
            synthesizer.clone(),
            prompts.clone(),
            VadConfig::from_settings(&settings.vad),
            settings.turn.sample_rate,
        ));

        Ok(Self {
            settings: Arc::new(settings),
            orchestrator,
            gateway,
            prompts,
            recognizer,
            synthesizer,
            store,
        })
    }

    /// Voice-loop configuration for a new streaming session
    pub fn controller_config(&self, language: Language) -> TurnControllerConfig {
        TurnControllerConfig {
            language,
            timing: TimingConfig::from_settings(&self.settings.turn),
            vad: VadConfig::from_settings(&self.settings.vad),
            sample_rate: self.settings.turn.sample_rate,
            backpressure: self.settings.turn.backpressure,
            recognize_budget: self.orchestrator.timeouts().recognize,
            synthesize_budget: self.orchestrator.timeouts().synthesize,
        }
    }
}

/// Load the prompt-catalog overlay, falling back to the builtin voice
///
/// A missing file is the normal case; a file that fails to parse is logged
/// and ignored rather than taking the service down.
fn load_prompts(path: &str) -> PromptCatalog {
    match std::fs::read_to_string(path) {
        Ok(yaml) => match PromptCatalog::from_yaml(&yaml) {
            Ok(catalog) => {
                tracing::info!(path, "prompt catalog loaded");
                catalog
            }
            Err(e) => {
                tracing::warn!(path, error = %e, "failed to parse prompt catalog, using builtin");
                PromptCatalog::builtin()
            }
        },
        Err(_) => {
            tracing::debug!(path, "no prompt catalog overlay, using builtin");
            PromptCatalog::builtin()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_wires_from_default_settings() {
        let state = AppState::from_settings(Settings::default()).unwrap();
        assert_eq!(state.settings.server.port, 8000);
    }

    #[test]
    fn test_missing_prompts_overlay_falls_back_to_builtin() {
        let catalog = load_prompts("does/not/exist.yaml");
        let greeting = catalog.pick(
            driver_assist_config::PromptKind::Greeting,
            "en",
            "conv",
            0,
        );
        assert!(greeting.contains("driver support"));
    }

    #[test]
    fn test_unknown_adapter_name_fails_wiring() {
        let mut settings = Settings::default();
        settings.adapters.understander = "nonexistent".to_string();
        assert!(AppState::from_settings(settings).is_err());
    }
}
