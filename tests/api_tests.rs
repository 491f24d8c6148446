//! HTTP 层集成测试
//!
//! 通过 `configure_app` 组装完整路由，临时 SQLite 作为存储。

use std::sync::{Arc, Once};
use std::time::Duration;

use actix_web::http::StatusCode;
use actix_web::http::header::LOCATION;
use actix_web::{App, test};
use sea_orm::{ActiveModelTrait, EntityTrait, PaginatorTrait, Set};
use serde_json::{Value, json};
use tempfile::TempDir;

use attributor::api::middleware::{ADVERTISER_HEADER, TENANT_SCOPE_HEADER};
use attributor::api::services::ErrorCode;
use attributor::config::init_config;
use attributor::runtime::AppServices;
use attributor::runtime::server::configure_app;
use attributor::storage::{CodeRegistry, NewTrackingLink, SeaOrmStorage};
use migration::entities::{campaign, click_event, customer_event, influencer};

static INIT: Once = Once::new();

fn init_static_config() {
    INIT.call_once(|| {
        init_config();
    });
}

async fn create_temp_storage() -> (Arc<SeaOrmStorage>, TempDir) {
    init_static_config();
    let td = TempDir::new().unwrap();
    let p = td.path().join("api_test.db");
    let u = format!("sqlite://{}?mode=rwc", p.display());
    let s = SeaOrmStorage::new(&u, "sqlite").await.unwrap();
    (Arc::new(s), td)
}

/// 广告主 1 的活动 3，达人 7，链接 abc123
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
        social_handle: Set(Some("@ana".to_string())),
        created_at: Set(now),
    }
    .insert(storage.get_db())
    .await
    .unwrap();
    storage
        .try_insert_tracking_link(NewTrackingLink {
            short_code: "abc123".to_string(),
            destination_url: "https://shop.example.com/p?sku=1".to_string(),
            campaign_id: 3,
            influencer_id: Some(7),
        })
        .await
        .unwrap();
}

macro_rules! init_app {
    ($storage:expr) => {
        test::init_service(App::new().configure(configure_app(AppServices::from_storage(
            $storage.clone(),
        ))))
        .await
    };
}

fn error_code(body: &Value) -> i64 {
    body["code"].as_i64().unwrap()
}

// =============================================================================
// Health
// =============================================================================

#[actix_rt::test]
async fn test_health_reports_storage() {
    let (storage, _td) = create_temp_storage().await;
    let app = init_app!(storage);

    let req = test::TestRequest::get().uri("/health").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(error_code(&body), 0);
    assert_eq!(body["data"]["status"], "healthy");
    assert_eq!(body["data"]["backend"], "sqlite");

    let req = test::TestRequest::get().uri("/health/live").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
}

// =============================================================================
// Events
// =============================================================================

#[actix_rt::test]
async fn test_ingest_event_created() {
    let (storage, _td) = create_temp_storage().await;
    seed_fixtures(&storage).await;
    let app = init_app!(storage);

    let req = test::TestRequest::post()
        .uri("/v1/events")
        .insert_header((ADVERTISER_HEADER, "1"))
        .set_json(json!({
            "action": "purchase",
            "value": 80.0,
            "landing_url": "https://shop.example.com/p?ref_code=abc123"
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(error_code(&body), 0);
    assert_eq!(body["data"]["status"], "processed");
    assert_eq!(body["data"]["attributed_influencer"], "7");
    assert!(body["data"]["id"].as_i64().unwrap() > 0);
}

#[actix_rt::test]
async fn test_ingest_event_requires_tenant() {
    let (storage, _td) = create_temp_storage().await;
    let app = init_app!(storage);

    let req = test::TestRequest::post()
        .uri("/v1/events")
        .set_json(json!({"action": "signup"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let req = test::TestRequest::post()
        .uri("/v1/events")
        .insert_header((ADVERTISER_HEADER, "not-a-number"))
        .set_json(json!({"action": "signup"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    // 全局身份不能写事件
    let req = test::TestRequest::post()
        .uri("/v1/events")
        .insert_header((TENANT_SCOPE_HEADER, "global"))
        .set_json(json!({"action": "signup"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(error_code(&body), ErrorCode::TenantRequired as i64);

    let count = customer_event::Entity::find()
        .count(storage.get_db())
        .await
        .unwrap();
    assert_eq!(count, 0);
}

#[actix_rt::test]
async fn test_ingest_event_rejects_bad_payload() {
    let (storage, _td) = create_temp_storage().await;
    let app = init_app!(storage);

    let req = test::TestRequest::post()
        .uri("/v1/events")
        .insert_header((ADVERTISER_HEADER, "1"))
        .set_json(json!({"action": "refund"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(error_code(&body), ErrorCode::InvalidEventPayload as i64);
}

// =============================================================================
// Stats
// =============================================================================

#[actix_rt::test]
async fn test_stats_overview_for_advertiser() {
    let (storage, _td) = create_temp_storage().await;
    seed_fixtures(&storage).await;
    let app = init_app!(storage);

    for value in [100.0, 50.0] {
        let req = test::TestRequest::post()
            .uri("/v1/events")
            .insert_header((ADVERTISER_HEADER, "1"))
            .set_json(json!({"action": "purchase", "value": value, "ref_code": "abc123"}))
            .to_request();
        assert_eq!(
            test::call_service(&app, req).await.status(),
            StatusCode::CREATED
        );
    }

    let req = test::TestRequest::get()
        .uri("/v1/stats/overview")
        .insert_header((ADVERTISER_HEADER, "1"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["data"]["conversions"], 2);
    assert_eq!(body["data"]["revenue"].as_f64(), Some(150.0));
    assert_eq!(body["data"]["clicks"], 0);
    // 无分成合约
    assert_eq!(body["data"]["payout"].as_f64(), Some(0.0));

    let req = test::TestRequest::get()
        .uri("/v1/stats/overview")
        .insert_header((ADVERTISER_HEADER, "2"))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["data"]["conversions"], 0);
}

#[actix_rt::test]
async fn test_stats_rejects_foreign_advertiser() {
    let (storage, _td) = create_temp_storage().await;
    let app = init_app!(storage);

    let req = test::TestRequest::get()
        .uri("/v1/stats/overview?advertiser_id=2")
        .insert_header((ADVERTISER_HEADER, "1"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    // 全局身份可指定任意广告主
    let req = test::TestRequest::get()
        .uri("/v1/stats/overview?advertiser_id=2")
        .insert_header((TENANT_SCOPE_HEADER, "GLOBAL"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let req = test::TestRequest::get().uri("/v1/stats/chart").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[actix_rt::test]
async fn test_stats_rejects_bad_dates() {
    let (storage, _td) = create_temp_storage().await;
    let app = init_app!(storage);

    let req = test::TestRequest::get()
        .uri("/v1/stats/chart?from=yesterday")
        .insert_header((ADVERTISER_HEADER, "1"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(error_code(&body), ErrorCode::InvalidDateFormat as i64);

    let req = test::TestRequest::get()
        .uri("/v1/stats/chart?from=2026-03-10&to=2026-03-01")
        .insert_header((ADVERTISER_HEADER, "1"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let req = test::TestRequest::get()
        .uri("/v1/stats/campaigns?limit=abc")
        .insert_header((ADVERTISER_HEADER, "1"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[actix_rt::test]
async fn test_export_streams_bom_and_header() {
    let (storage, _td) = create_temp_storage().await;
    seed_fixtures(&storage).await;
    let app = init_app!(storage);

    let req = test::TestRequest::post()
        .uri("/v1/events")
        .insert_header((ADVERTISER_HEADER, "1"))
        .set_json(json!({"action": "purchase", "value": 10.0, "ref_code": "abc123"}))
        .to_request();
    assert_eq!(
        test::call_service(&app, req).await.status(),
        StatusCode::CREATED
    );

    let req = test::TestRequest::get()
        .uri("/v1/stats/export")
        .insert_header((ADVERTISER_HEADER, "1"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let disposition = resp
        .headers()
        .get("Content-Disposition")
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(disposition.contains("attribution_export_"));

    let body = test::read_body(resp).await;
    assert!(body.starts_with(b"\xEF\xBB\xBF"));
    let text = String::from_utf8(body[3..].to_vec()).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].starts_with("Event ID,"));
    assert!(lines[1].contains("abc123"));
    assert!(lines[1].contains("Ana"));
    assert!(lines[1].contains("Summer Launch"));
}

// =============================================================================
// Redirect
// =============================================================================

#[actix_rt::test]
async fn test_redirect_appends_ref_code_and_logs_click() {
    let (storage, _td) = create_temp_storage().await;
    seed_fixtures(&storage).await;
    let app = init_app!(storage);

    let req = test::TestRequest::get()
        .uri("/r/abc123")
        .insert_header(("User-Agent", "integration-test"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(
        resp.headers().get(LOCATION).unwrap(),
        "https://shop.example.com/p?sku=1&ref_code=abc123"
    );

    // 点击在后台写入
    let mut clicks = 0;
    for _ in 0..50 {
        clicks = click_event::Entity::find()
            .count(storage.get_db())
            .await
            .unwrap();
        if clicks > 0 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert_eq!(clicks, 1);
}

#[actix_rt::test]
async fn test_redirect_unknown_code_is_404() {
    let (storage, _td) = create_temp_storage().await;
    let app = init_app!(storage);

    for uri in ["/r/nope", "/r/bad%20code"] {
        let req = test::TestRequest::get().uri(uri).to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND, "uri {}", uri);
    }
}
