//! Event ingestion coordinator
//!
//! Resolves attribution for one inbound event and persists it with a single
//! insert. There is no dedup and no retry: identical payloads produce
//! separate rows, and a failed insert surfaces as a persistence failure.

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;
use ts_rs::TS;

use super::attribution::AttributionResolver;
use crate::errors::{AttributorError, Result};
use crate::storage::models::TS_EXPORT_PATH;
use crate::storage::{EventType, EventWriter, NewCustomerEvent};

fn default_currency() -> String {
    "USD".to_string()
}

/// Inbound conversion event
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export, export_to = TS_EXPORT_PATH)]
pub struct EventInput {
    pub action: EventType,
    /// Monetary value (revenue for purchases)
    #[serde(default)]
    #[ts(optional)]
    pub value: Option<f64>,
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default)]
    #[ts(optional)]
    pub coupon_code: Option<String>,
    #[serde(default)]
    #[ts(optional)]
    pub ref_code: Option<String>,
    #[serde(default)]
    #[ts(optional)]
    pub landing_url: Option<String>,
    #[serde(default)]
    #[ts(optional)]
    pub referrer: Option<String>,
    /// Arbitrary metadata (items, SKU, ...), stored verbatim
    #[serde(default)]
    #[ts(type = "Record<string, unknown> | null")]
    pub properties: Option<serde_json::Map<String, serde_json::Value>>,
}

impl EventInput {
    pub fn new(action: EventType) -> Self {
        Self {
            action,
            value: None,
            currency: default_currency(),
            coupon_code: None,
            ref_code: None,
            landing_url: None,
            referrer: None,
            properties: None,
        }
    }
}

/// Result of a successful ingestion
#[derive(Debug, Clone, PartialEq, Serialize, TS)]
#[ts(export, export_to = TS_EXPORT_PATH)]
pub struct IngestedEvent {
    pub id: i64,
    pub status: String,
    pub attributed_influencer: Option<String>,
}

pub struct IngestionCoordinator {
    resolver: AttributionResolver,
    writer: Arc<dyn EventWriter>,
}

impl IngestionCoordinator {
    pub fn new(resolver: AttributionResolver, writer: Arc<dyn EventWriter>) -> Self {
        Self { resolver, writer }
    }

    pub async fn ingest(&self, input: EventInput, advertiser_id: i64) -> Result<IngestedEvent> {
        let attribution = self
            .resolver
            .resolve(
                input.coupon_code.as_deref(),
                input.ref_code.as_deref(),
                input.landing_url.as_deref(),
                advertiser_id,
            )
            .await;

        let raw_payload = serde_json::to_string(&input).map_err(|e| {
            AttributorError::serialization(format!("Failed to serialize event payload: {}", e))
        })?;
        let properties = input
            .properties
            .as_ref()
            .map(serde_json::to_string)
            .transpose()
            .map_err(|e| {
                AttributorError::serialization(format!(
                    "Failed to serialize event properties: {}",
                    e
                ))
            })?;

        let event = NewCustomerEvent {
            advertiser_id,
            event_type: input.action,
            occurred_at: Utc::now(),
            revenue: input.value,
            currency: input.currency,
            coupon_code: input.coupon_code,
            ref_code: input.ref_code,
            landing_url: input.landing_url,
            referrer: input.referrer,
            attribution,
            properties,
            raw_payload,
        };

        let id = self.writer.insert_customer_event(event).await?;

        info!(
            "Ingestion: event {} ({}) for advertiser {} attributed to influencer {:?}",
            id, input.action, advertiser_id, attribution.influencer_id
        );

        Ok(IngestedEvent {
            id,
            status: "processed".to_string(),
            attributed_influencer: attribution.influencer_id.map(|id| id.to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_input_defaults() {
        let input: EventInput = serde_json::from_str(r#"{"action":"signup"}"#).unwrap();
        assert_eq!(input.action, EventType::Signup);
        assert_eq!(input.currency, "USD");
        assert!(input.value.is_none());
        assert!(input.properties.is_none());
    }

    #[test]
    fn test_event_input_rejects_unknown_action() {
        assert!(serde_json::from_str::<EventInput>(r#"{"action":"refund"}"#).is_err());
    }

    #[test]
    fn test_event_input_keeps_properties() {
        let input: EventInput = serde_json::from_str(
            r#"{"action":"purchase","value":120.5,"coupon_code":"SUMMER20","properties":{"items":3}}"#,
        )
        .unwrap();
        let props = input.properties.unwrap();
        assert_eq!(props.get("items"), Some(&serde_json::json!(3)));
    }
}
