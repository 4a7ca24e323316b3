//! Typed records for backend lookups and handoff payloads

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::conversation::{HistoryEntry, IntentType};

/// One battery swap from the driver's history
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwapRecord {
    pub occurred_at: NaiveDateTime,
    pub station: String,
    pub battery_id: String,
}

impl SwapRecord {
    /// Timestamp in the format spoken back to the driver
    pub fn spoken_time(&self) -> String {
        self.occurred_at.format("%Y-%m-%d %H:%M").to_string()
    }
}

/// A swap station returned by the nearest-station lookup
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Station {
    pub name: String,
    pub address: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionStatus {
    Active,
    Expired,
}

impl std::fmt::Display for SubscriptionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SubscriptionStatus::Active => write!(f, "active"),
            SubscriptionStatus::Expired => write!(f, "expired"),
        }
    }
}

/// Subscription standing for a driver
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subscription {
    pub status: SubscriptionStatus,
    pub expires_on: NaiveDate,
}

/// Payload handed to a human agent on escalation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EscalationSummary {
    pub reason: String,
    pub intent: Option<IntentType>,
    pub slots: HashMap<String, serde_json::Value>,
    pub history: Vec<HistoryEntry>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spoken_time_format() {
        let record = SwapRecord {
            occurred_at: NaiveDate::from_ymd_opt(2026, 1, 22)
                .unwrap()
                .and_hms_opt(14, 30, 0)
                .unwrap(),
            station: "Station A".into(),
            battery_id: "B123".into(),
        };
        assert_eq!(record.spoken_time(), "2026-01-22 14:30");
    }
}
