//! Fixture-backed data client
//!
//! Deterministic lookups for development and tests. A real deployment wires
//! a fleet-backend client behind the same contract.

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};

use driver_assist_core::{
    DataClient, Error, Result, Station, Subscription, SubscriptionStatus, SwapRecord,
};

/// Static fixtures for every lookup
#[derive(Debug, Default)]
pub struct StaticDataClient;

impl StaticDataClient {
    pub fn new() -> Self {
        Self
    }

    fn fixture_swap() -> Result<SwapRecord> {
        let occurred_at: NaiveDateTime = NaiveDate::from_ymd_opt(2026, 1, 22)
            .and_then(|d| d.and_hms_opt(14, 30, 0))
            .ok_or_else(|| Error::Internal("invalid fixture timestamp".to_string()))?;
        Ok(SwapRecord {
            occurred_at,
            station: "Station A".to_string(),
            battery_id: "B123".to_string(),
        })
    }
}

#[async_trait]
impl DataClient for StaticDataClient {
    async fn get_swap_history(
        &self,
        _driver_id: &str,
        _date_range: &str,
    ) -> Result<Vec<SwapRecord>> {
        Ok(vec![Self::fixture_swap()?])
    }

    async fn find_nearest_station(&self, location: &str) -> Result<Station> {
        Ok(Station {
            name: format!("Station {location}"),
            address: format!("Main Road, {location}"),
        })
    }

    async fn check_subscription(&self, _driver_id: &str) -> Result<Subscription> {
        let expires_on = NaiveDate::from_ymd_opt(2026, 12, 31)
            .ok_or_else(|| Error::Internal("invalid fixture date".to_string()))?;
        Ok(Subscription {
            status: SubscriptionStatus::Active,
            expires_on,
        })
    }

    fn name(&self) -> &str {
        "static-data"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_swap_history_fixture() {
        let client = StaticDataClient::new();
        let history = client.get_swap_history("driver-1", "yesterday").await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].spoken_time(), "2026-01-22 14:30");
        assert_eq!(history[0].battery_id, "B123");
    }

    #[tokio::test]
    async fn test_station_echoes_location() {
        let client = StaticDataClient::new();
        let station = client.find_nearest_station("Noida").await.unwrap();
        assert_eq!(station.name, "Station Noida");
        assert_eq!(station.address, "Main Road, Noida");
    }

    #[tokio::test]
    async fn test_subscription_is_active() {
        let client = StaticDataClient::new();
        let sub = client.check_subscription("driver-1").await.unwrap();
        assert_eq!(sub.status, SubscriptionStatus::Active);
        assert_eq!(sub.expires_on.to_string(), "2026-12-31");
    }
}
