//! SeaORM storage backend
//!
//! This module provides database storage using SeaORM,
//! supporting SQLite, MySQL/MariaDB, and PostgreSQL.

mod click_sink;
mod connection;
mod converters;
mod export;
mod lookup;
mod mutations;
pub mod retry;
mod stats;

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use moka::sync::Cache;
use sea_orm::{ConnectionTrait, DatabaseConnection, DbBackend};
use tracing::warn;

use crate::analytics::ClickSink;
use crate::errors::{AttributorError, Result};
use crate::storage::models::TrackingLink;

pub use export::EventBatchStream;
pub use mutations::is_unique_violation;
pub use stats::{
    BreakdownRow, CouponAggRow, DailyClickRow, DailyEventRow, DimensionAggRow, JourneyRow,
    PurchaseGroupRow, PurchaseTotalsRow, StatsDimension,
};

/// 从数据库 URL 推断数据库类型
pub fn infer_backend_from_url(database_url: &str) -> Result<String> {
    if database_url.starts_with("sqlite:")
        || database_url.ends_with(".db")
        || database_url.ends_with(".sqlite")
    {
        Ok("sqlite".to_string())
    } else if database_url.starts_with("mysql://") || database_url.starts_with("mariadb://") {
        Ok("mysql".to_string())
    } else if database_url.starts_with("postgres://") || database_url.starts_with("postgresql://") {
        Ok("postgres".to_string())
    } else {
        Err(AttributorError::database_config(format!(
            "无法从 URL 推断数据库类型: {}. 支持的 URL 格式: sqlite:, mysql://, mariadb://, postgres://",
            database_url
        )))
    }
}

/// 统计查询范围
///
/// `advertiser_id` 为空表示全局视图（仅特权调用方，由外部鉴权保证）。
/// `from` / `to` 均为闭区间。
#[derive(Default, Clone, Debug, PartialEq)]
pub struct StatsScope {
    pub advertiser_id: Option<i64>,
    pub campaign_id: Option<i64>,
    pub influencer_id: Option<i64>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

impl StatsScope {
    pub fn for_advertiser(advertiser_id: i64) -> Self {
        Self {
            advertiser_id: Some(advertiser_id),
            ..Default::default()
        }
    }
}

/// SeaORM-based storage backend
#[derive(Clone)]
pub struct SeaOrmStorage {
    db: DatabaseConnection,
    backend_name: String,
    /// 重定向热路径的链接缓存（short_code 不可变，TTL 60 秒）
    link_cache: Cache<String, TrackingLink>,
    /// 重试配置
    retry_config: retry::RetryConfig,
}

impl SeaOrmStorage {
    pub async fn new(database_url: &str, backend_name: &str) -> Result<Self> {
        if database_url.is_empty() {
            return Err(AttributorError::database_config(
                "DATABASE_URL 未设置".to_string(),
            ));
        }

        let config = crate::config::get_config();
        let retry_config = retry::RetryConfig::from_database_config(&config.database);
        let db = connection::open(database_url, backend_name, &config.database).await?;

        let storage = SeaOrmStorage {
            db,
            backend_name: backend_name.to_string(),
            link_cache: Cache::builder()
                .time_to_live(Duration::from_secs(60))
                .max_capacity(10_000)
                .build(),
            retry_config,
        };

        warn!(
            "{} Storage initialized.",
            storage.backend_name.to_uppercase()
        );
        Ok(storage)
    }

    pub fn as_click_sink(&self) -> Arc<dyn ClickSink> {
        Arc::new(self.clone()) as Arc<dyn ClickSink>
    }

    /// 获取数据库连接
    pub fn get_db(&self) -> &DatabaseConnection {
        &self.db
    }

    pub fn get_backend_name(&self) -> &str {
        &self.backend_name
    }

    pub fn db_backend(&self) -> DbBackend {
        self.db.get_database_backend()
    }

    /// 健康检查：执行一次轻量查询
    pub async fn ping(&self) -> Result<()> {
        self.db
            .ping()
            .await
            .map_err(|e| AttributorError::database_connection(format!("数据库不可用: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_infer_backend_from_url() {
        assert_eq!(infer_backend_from_url("sqlite://data.db").unwrap(), "sqlite");
        assert_eq!(infer_backend_from_url("sqlite::memory:").unwrap(), "sqlite");
        assert_eq!(infer_backend_from_url("events.sqlite").unwrap(), "sqlite");
        assert_eq!(
            infer_backend_from_url("mariadb://u:p@localhost/db").unwrap(),
            "mysql"
        );
        assert_eq!(
            infer_backend_from_url("postgresql://localhost/db").unwrap(),
            "postgres"
        );
        assert!(infer_backend_from_url("redis://localhost").is_err());
    }

    #[test]
    fn test_scope_for_advertiser() {
        let scope = StatsScope::for_advertiser(4);
        assert_eq!(scope.advertiser_id, Some(4));
        assert_eq!(scope.campaign_id, None);
        assert!(scope.from.is_none() && scope.to.is_none());
    }
}
