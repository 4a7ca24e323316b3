//! Logging handoff
//!
//! Records escalations and counts them. The production counterpart posts to
//! the agent-desk queue; the count is also what the tests assert on.

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};

use driver_assist_core::{EscalationSummary, Handoff, Result};

#[derive(Debug, Default)]
pub struct LoggingHandoff {
    escalations: AtomicUsize,
}

impl LoggingHandoff {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of escalations handed off so far
    pub fn count(&self) -> usize {
        self.escalations.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Handoff for LoggingHandoff {
    async fn escalate(&self, conversation_id: &str, summary: &EscalationSummary) -> Result<()> {
        self.escalations.fetch_add(1, Ordering::SeqCst);
        tracing::info!(
            session_id = %conversation_id,
            reason = %summary.reason,
            intent = ?summary.intent,
            turns = summary.history.len(),
            "escalated to human agent"
        );
        Ok(())
    }

    fn name(&self) -> &str {
        "logging-handoff"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[tokio::test]
    async fn test_escalations_are_counted() {
        let handoff = LoggingHandoff::new();
        let summary = EscalationSummary {
            reason: "user requested agent or is angry".to_string(),
            intent: None,
            slots: HashMap::new(),
            history: Vec::new(),
        };

        handoff.escalate("c1", &summary).await.unwrap();
        handoff.escalate("c2", &summary).await.unwrap();
        assert_eq!(handoff.count(), 2);
    }
}
