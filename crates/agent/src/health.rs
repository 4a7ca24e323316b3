//! Adapter failure accounting
//!
//! Tracks consecutive failures per adapter class. Crossing the threshold
//! flags the adapter degraded and logs a warning; nothing is auto-disabled.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use driver_assist_core::AdapterKind;

#[derive(Debug, Default)]
struct HealthEntry {
    failures: AtomicU32,
    degraded: AtomicBool,
}

/// Per-adapter consecutive-failure counters
#[derive(Debug)]
pub struct AdapterHealth {
    threshold: u32,
    entries: [HealthEntry; 5],
}

fn index(kind: AdapterKind) -> usize {
    match kind {
        AdapterKind::Recognizer => 0,
        AdapterKind::Understander => 1,
        AdapterKind::Data => 2,
        AdapterKind::Synthesizer => 3,
        AdapterKind::Handoff => 4,
    }
}

impl AdapterHealth {
    pub fn new(threshold: u32) -> Self {
        Self {
            threshold,
            entries: Default::default(),
        }
    }

    pub fn record_failure(&self, kind: AdapterKind) {
        let entry = &self.entries[index(kind)];
        let failures = entry.failures.fetch_add(1, Ordering::SeqCst) + 1;
        if failures >= self.threshold && !entry.degraded.swap(true, Ordering::SeqCst) {
            tracing::warn!(adapter = %kind, failures, "adapter marked degraded");
        }
    }

    pub fn record_success(&self, kind: AdapterKind) {
        let entry = &self.entries[index(kind)];
        entry.failures.store(0, Ordering::SeqCst);
        if entry.degraded.swap(false, Ordering::SeqCst) {
            tracing::info!(adapter = %kind, "adapter recovered");
        }
    }

    pub fn failures(&self, kind: AdapterKind) -> u32 {
        self.entries[index(kind)].failures.load(Ordering::SeqCst)
    }

    pub fn is_degraded(&self, kind: AdapterKind) -> bool {
        self.entries[index(kind)].degraded.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_degrades_at_threshold() {
        let health = AdapterHealth::new(3);
        let kind = AdapterKind::Understander;

        health.record_failure(kind);
        health.record_failure(kind);
        assert!(!health.is_degraded(kind));

        health.record_failure(kind);
        assert!(health.is_degraded(kind));
        assert_eq!(health.failures(kind), 3);
    }

    #[test]
    fn test_success_resets() {
        let health = AdapterHealth::new(2);
        let kind = AdapterKind::Data;

        health.record_failure(kind);
        health.record_failure(kind);
        assert!(health.is_degraded(kind));

        health.record_success(kind);
        assert!(!health.is_degraded(kind));
        assert_eq!(health.failures(kind), 0);
    }

    #[test]
    fn test_kinds_are_independent() {
        let health = AdapterHealth::new(1);
        health.record_failure(AdapterKind::Recognizer);
        assert!(health.is_degraded(AdapterKind::Recognizer));
        assert!(!health.is_degraded(AdapterKind::Synthesizer));
    }
}
