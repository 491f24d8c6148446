//! 只读查询的重试
//!
//! 归因查询和统计查询都是幂等读，遇到暂时性故障可以原样再跑一次：
//! 拿不到连接、连接中断、锁冲突。SQL 错误、约束冲突、记录不存在
//! 第一次就返回。写路径不经过这里，入库失败直接上抛。

use std::future::Future;
use std::time::Duration;

use sea_orm::DbErr;
use sea_orm::error::RuntimeErr;
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::config::DatabaseConfig;

/// SQLite BUSY / LOCKED，MySQL 死锁 / 锁等待超时，PostgreSQL 序列化失败 / 死锁
const LOCK_CONFLICT_CODES: &[&str] = &["5", "6", "1213", "1205", "40001", "40P01"];

const LOCK_CONFLICT_MESSAGES: &[&str] = &[
    "database is locked",
    "database table is locked",
    "deadlock",
    "lock wait timeout",
    "could not serialize",
];

/// 该错误换个时机重跑是否可能成功
pub fn is_transient(err: &DbErr) -> bool {
    match err {
        DbErr::ConnectionAcquire(_) | DbErr::Conn(_) => true,
        DbErr::Query(inner) | DbErr::Exec(inner) => is_lock_conflict(inner),
        _ => false,
    }
}

fn is_lock_conflict(err: &RuntimeErr) -> bool {
    let message = match err {
        RuntimeErr::SqlxError(e) => {
            let by_code = e
                .as_database_error()
                .and_then(|db| db.code())
                .is_some_and(|code| LOCK_CONFLICT_CODES.contains(&code.as_ref()));
            if by_code {
                return true;
            }
            e.to_string()
        }
        RuntimeErr::Internal(msg) => msg.clone(),
        #[allow(unreachable_patterns)]
        _ => return false,
    };

    let message = message.to_lowercase();
    LOCK_CONFLICT_MESSAGES.iter().any(|m| message.contains(m))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryConfig {
    /// 首次失败后最多再试几次
    pub retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl RetryConfig {
    pub fn from_database_config(config: &DatabaseConfig) -> Self {
        Self {
            retries: config.retry_count,
            base_delay: Duration::from_millis(config.retry_base_delay_ms),
            max_delay: Duration::from_millis(config.retry_max_delay_ms),
        }
    }

    /// 第 n 次重试前等待 base × 2^(n-1)，不超过 max_delay，
    /// 实际值在 [上限/2, 上限] 内随机，避免并发读同时醒来
    fn delay_before(&self, retry: u32) -> Duration {
        let exponent = retry.saturating_sub(1).min(20);
        let ceiling = self
            .base_delay
            .saturating_mul(1 << exponent)
            .min(self.max_delay)
            .as_millis() as u64;
        Duration::from_millis(rand::random_range(ceiling / 2..=ceiling))
    }
}

/// 执行 `query`，暂时性错误按 `config` 退避重试
pub async fn with_retry<T, F, Fut>(what: &str, config: RetryConfig, mut query: F) -> Result<T, DbErr>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, DbErr>>,
{
    let mut retry = 0;
    loop {
        let err = match query().await {
            Ok(value) => {
                if retry > 0 {
                    debug!("{} recovered after {} retries", what, retry);
                }
                return Ok(value);
            }
            Err(err) => err,
        };

        if retry >= config.retries || !is_transient(&err) {
            return Err(err);
        }

        retry += 1;
        let delay = config.delay_before(retry);
        warn!(
            "{} hit a transient error, retry {}/{} in {:?}: {}",
            what, retry, config.retries, delay, err
        );
        sleep(delay).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    use chrono::Utc;
    use migration::entities::campaign;
    use sea_orm::sqlx::SqlitePool;
    use sea_orm::sqlx::sqlite::SqliteConnectOptions;
    use sea_orm::{
        ActiveModelTrait, ConnectionTrait, DbBackend, EntityTrait, Set, SqlxSqliteConnector,
        TransactionTrait,
    };
    use tempfile::TempDir;

    fn quick(retries: u32) -> RetryConfig {
        RetryConfig {
            retries,
            base_delay: Duration::from_millis(2),
            max_delay: Duration::from_millis(10),
        }
    }

    fn new_campaign(id: i64) -> campaign::ActiveModel {
        campaign::ActiveModel {
            id: Set(id),
            advertiser_id: Set(1),
            name: Set(format!("Campaign {}", id)),
            status: Set("active".to_string()),
            budget: Set(0.0),
            start_date: Set(None),
            end_date: Set(None),
            created_at: Set(Utc::now()),
        }
    }

    #[test]
    fn test_transient_classification() {
        let internal = |msg: &str| RuntimeErr::Internal(msg.to_string());

        assert!(is_transient(&DbErr::ConnectionAcquire(
            sea_orm::error::ConnAcquireErr::Timeout
        )));
        assert!(is_transient(&DbErr::Conn(internal("connection reset"))));
        assert!(is_transient(&DbErr::Query(internal("database is locked"))));
        assert!(is_transient(&DbErr::Exec(internal(
            "Deadlock found when trying to get lock"
        ))));

        // 发码器自己处理唯一冲突
        assert!(!is_transient(&DbErr::Exec(internal(
            "UNIQUE constraint failed: coupons.code"
        ))));
        assert!(!is_transient(&DbErr::Query(internal("no such column: foo"))));
        assert!(!is_transient(&DbErr::RecordNotFound("gone".to_string())));
    }

    #[test]
    fn test_delay_doubles_and_caps() {
        let config = RetryConfig {
            retries: 5,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_millis(300),
        };
        let within = |d: Duration, lo: u64, hi: u64| {
            (lo..=hi).contains(&(d.as_millis() as u64))
        };
        assert!(within(config.delay_before(1), 50, 100));
        assert!(within(config.delay_before(2), 100, 200));
        assert!(within(config.delay_before(3), 150, 300));
        assert!(within(config.delay_before(30), 150, 300));
    }

    #[test]
    fn test_config_from_database_section() {
        let config = RetryConfig::from_database_config(&DatabaseConfig::default());
        assert_eq!(config.retries, 3);
        assert_eq!(config.base_delay, Duration::from_millis(100));
        assert_eq!(config.max_delay, Duration::from_millis(2000));
    }

    #[tokio::test]
    async fn test_gives_up_after_configured_retries() {
        let calls = AtomicU32::new(0);

        let result: Result<(), DbErr> = with_retry("acquire", quick(2), || {
            calls.fetch_add(1, Ordering::SeqCst);
            async {
                Err(DbErr::ConnectionAcquire(
                    sea_orm::error::ConnAcquireErr::Timeout,
                ))
            }
        })
        .await;

        assert!(matches!(result, Err(DbErr::ConnectionAcquire(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_sql_error_is_returned_without_retry() {
        let db = sea_orm::Database::connect("sqlite::memory:").await.unwrap();
        let calls = AtomicU32::new(0);

        let result = with_retry("missing table", quick(3), || {
            calls.fetch_add(1, Ordering::SeqCst);
            // 内存库未迁移，表不存在
            campaign::Entity::find().all(&db)
        })
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_retries_through_sqlite_write_lock() {
        let td = TempDir::new().unwrap();
        let url = format!("sqlite://{}", td.path().join("locked.db").display());
        let holder = super::super::connection::open(&url, "sqlite", &DatabaseConfig::default())
            .await
            .unwrap();

        // 第二个连接池不等锁，遇到 BUSY 立即报错
        let options: SqliteConnectOptions = url.parse().unwrap();
        let pool = SqlitePool::connect_with(options.busy_timeout(Duration::ZERO))
            .await
            .unwrap();
        let contender = SqlxSqliteConnector::from_sqlx_sqlite_pool(pool);
        assert_eq!(contender.get_database_backend(), DbBackend::Sqlite);

        let txn = holder.begin().await.unwrap();
        new_campaign(1).insert(&txn).await.unwrap();
        let release = tokio::spawn(async move {
            sleep(Duration::from_millis(20)).await;
            txn.commit().await.unwrap();
        });

        let config = RetryConfig {
            retries: 3,
            base_delay: Duration::from_millis(200),
            max_delay: Duration::from_millis(1000),
        };
        let calls = AtomicU32::new(0);
        let inserted = with_retry("insert under lock", config, || {
            calls.fetch_add(1, Ordering::SeqCst);
            new_campaign(2).insert(&contender)
        })
        .await
        .unwrap();
        release.await.unwrap();

        assert_eq!(inserted.id, 2);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        let rows = campaign::Entity::find().all(&holder).await.unwrap();
        assert_eq!(rows.len(), 2);
    }
}
