//! 事件入库集成测试（临时 SQLite）

use std::sync::{Arc, Once};

use async_trait::async_trait;
use sea_orm::{ActiveModelTrait, EntityTrait, Set};
use tempfile::TempDir;

use attributor::config::init_config;
use attributor::errors::{AttributorError, Result};
use attributor::services::{AttributionResolver, EventInput, IngestionCoordinator};
use attributor::storage::{
    CodeRegistry, EventType, EventWriter, NewCoupon, NewCustomerEvent, NewTrackingLink,
    SeaOrmStorage,
};
use migration::entities::{campaign, customer_event, influencer};

static INIT: Once = Once::new();

fn init_static_config() {
    INIT.call_once(|| {
        init_config();
    });
}

async fn create_temp_storage() -> (Arc<SeaOrmStorage>, TempDir) {
    init_static_config();
    let td = TempDir::new().unwrap();
    let p = td.path().join("ingestion_test.db");
    let u = format!("sqlite://{}?mode=rwc", p.display());
    let s = SeaOrmStorage::new(&u, "sqlite").await.unwrap();
    (Arc::new(s), td)
}

/// 活动 3 / 达人 7，优惠码 SUMMER20，追踪链接 abc123
async fn seed_fixtures(storage: &SeaOrmStorage) {
    let now = chrono::Utc::now();
    campaign::ActiveModel {
        id: Set(3),
        advertiser_id: Set(1),
        name: Set("Summer Launch".to_string()),
        status: Set("active".to_string()),
        budget: Set(500.0),
        start_date: Set(None),
        end_date: Set(None),
        created_at: Set(now),
    }
    .insert(storage.get_db())
    .await
    .unwrap();
    influencer::ActiveModel {
        id: Set(7),
        name: Set("Ana".to_string()),
        email: Set("ana@creators.test".to_string()),
        social_handle: Set(None),
        created_at: Set(now),
    }
    .insert(storage.get_db())
    .await
    .unwrap();

    storage
        .try_insert_coupon(NewCoupon {
            code: "SUMMER20".to_string(),
            campaign_id: 3,
            influencer_id: Some(7),
            settings: None,
        })
        .await
        .unwrap();
    storage
        .try_insert_tracking_link(NewTrackingLink {
            short_code: "abc123".to_string(),
            destination_url: "https://shop.example.com/".to_string(),
            campaign_id: 3,
            influencer_id: Some(7),
        })
        .await
        .unwrap();
}

fn coordinator(storage: &Arc<SeaOrmStorage>) -> IngestionCoordinator {
    IngestionCoordinator::new(AttributionResolver::new(storage.clone()), storage.clone())
}

#[tokio::test]
async fn test_identical_events_are_not_deduplicated() {
    let (storage, _td) = create_temp_storage().await;
    let ingestion = coordinator(&storage);

    let mut input = EventInput::new(EventType::Purchase);
    input.value = Some(42.0);

    let first = ingestion.ingest(input.clone(), 1).await.unwrap();
    let second = ingestion.ingest(input, 1).await.unwrap();

    assert_ne!(first.id, second.id);
    assert_eq!(first.status, "processed");
    assert_eq!(first.attributed_influencer, None);

    let rows = customer_event::Entity::find()
        .all(storage.get_db())
        .await
        .unwrap();
    assert_eq!(rows.len(), 2);
}

#[tokio::test]
async fn test_ingest_persists_attribution_and_raw_fields() {
    let (storage, _td) = create_temp_storage().await;
    seed_fixtures(&storage).await;
    let ingestion = coordinator(&storage);

    let input: EventInput = serde_json::from_str(
        r#"{
            "action": "purchase",
            "value": 120.5,
            "currency": "EUR",
            "coupon_code": "SUMMER20",
            "ref_code": "OTHERGUY",
            "properties": {"sku": "A-1", "qty": 2}
        }"#,
    )
    .unwrap();

    let ingested = ingestion.ingest(input, 1).await.unwrap();
    assert_eq!(ingested.attributed_influencer.as_deref(), Some("7"));

    let row = customer_event::Entity::find_by_id(ingested.id)
        .one(storage.get_db())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(row.advertiser_id, 1);
    assert_eq!(row.event_type, "purchase");
    assert_eq!(row.revenue, Some(120.5));
    assert_eq!(row.currency, "EUR");
    assert_eq!(row.influencer_id, Some(7));
    assert_eq!(row.campaign_id, Some(3));
    assert_eq!(row.tracking_link_id, None);
    // 原始输入原样保留，即使未参与归因
    assert_eq!(row.ref_code.as_deref(), Some("OTHERGUY"));

    let properties: serde_json::Value =
        serde_json::from_str(row.properties.as_deref().unwrap()).unwrap();
    assert_eq!(properties["qty"], 2);
    let raw: serde_json::Value = serde_json::from_str(&row.raw_payload).unwrap();
    assert_eq!(raw["coupon_code"], "SUMMER20");
}

#[tokio::test]
async fn test_ingest_attributes_via_landing_url() {
    let (storage, _td) = create_temp_storage().await;
    seed_fixtures(&storage).await;
    let ingestion = coordinator(&storage);

    let mut input = EventInput::new(EventType::AddToCart);
    input.landing_url = Some("https://shop.example.com/p?ref_code=abc123&utm=x".to_string());

    let ingested = ingestion.ingest(input, 1).await.unwrap();
    assert_eq!(ingested.attributed_influencer.as_deref(), Some("7"));

    let row = customer_event::Entity::find_by_id(ingested.id)
        .one(storage.get_db())
        .await
        .unwrap()
        .unwrap();
    assert!(row.tracking_link_id.is_some());
    assert_eq!(row.ref_code, None);
}

struct FailingWriter;

#[async_trait]
impl EventWriter for FailingWriter {
    async fn insert_customer_event(&self, _event: NewCustomerEvent) -> Result<i64> {
        Err(AttributorError::database_operation("disk full"))
    }
}

#[tokio::test]
async fn test_insert_failure_is_persistence_error() {
    let (storage, _td) = create_temp_storage().await;
    let ingestion = IngestionCoordinator::new(
        AttributionResolver::new(storage.clone()),
        Arc::new(FailingWriter),
    );

    let err = ingestion
        .ingest(EventInput::new(EventType::Signup), 1)
        .await
        .unwrap_err();
    assert!(matches!(err, AttributorError::DatabaseOperation(_)));
}
