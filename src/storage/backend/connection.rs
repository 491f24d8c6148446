//! 建立连接并迁移
//!
//! SQLite 单文件部署是默认形态：WAL 让统计读与事件写互不阻塞。
//! MySQL / PostgreSQL 走 SeaORM 连接池，超时取自 `database.timeout`。

use std::str::FromStr;
use std::time::Duration;

use sea_orm::sqlx::SqlitePool;
use sea_orm::sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqliteSynchronous};
use sea_orm::{ConnectOptions, Database, DatabaseConnection, SqlxSqliteConnector};
use tracing::{debug, info};

use crate::config::DatabaseConfig;
use crate::errors::{AttributorError, Result};
use migration::{Migrator, MigratorTrait};

const SQLITE_BUSY_TIMEOUT: Duration = Duration::from_secs(5);
const POOL_IDLE_TIMEOUT: Duration = Duration::from_secs(300);
const POOL_MAX_LIFETIME: Duration = Duration::from_secs(3600);

/// 按后端名打开连接，随后执行全部未应用的迁移
pub async fn open(
    database_url: &str,
    backend_name: &str,
    config: &DatabaseConfig,
) -> Result<DatabaseConnection> {
    let db = match backend_name {
        "sqlite" => open_sqlite(database_url).await?,
        other => open_pooled(database_url, other, config).await?,
    };

    Migrator::up(&db, None)
        .await
        .map_err(|e| AttributorError::database_operation(format!("迁移失败: {}", e)))?;
    info!("Database migrations completed");

    Ok(db)
}

fn sqlite_options(database_url: &str) -> Result<SqliteConnectOptions> {
    let options = SqliteConnectOptions::from_str(database_url)
        .map_err(|e| AttributorError::database_config(format!("SQLite URL 解析失败: {}", e)))?;

    Ok(options
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .synchronous(SqliteSynchronous::Normal)
        .busy_timeout(SQLITE_BUSY_TIMEOUT)
        .pragma("temp_store", "memory"))
}

async fn open_sqlite(database_url: &str) -> Result<DatabaseConnection> {
    let pool = SqlitePool::connect_with(sqlite_options(database_url)?)
        .await
        .map_err(|e| {
            AttributorError::database_connection(format!("无法连接到 SQLite 数据库: {}", e))
        })?;

    debug!("SQLite pool ready: {}", database_url);
    Ok(SqlxSqliteConnector::from_sqlx_sqlite_pool(pool))
}

fn pool_options(database_url: &str, config: &DatabaseConfig) -> ConnectOptions {
    let timeout = Duration::from_secs(config.timeout);
    let mut options = ConnectOptions::new(database_url.to_owned());
    options
        .max_connections(config.pool_size)
        .min_connections(config.pool_size.min(5))
        .connect_timeout(timeout)
        .acquire_timeout(timeout)
        .idle_timeout(POOL_IDLE_TIMEOUT)
        .max_lifetime(POOL_MAX_LIFETIME)
        .sqlx_logging(false);
    options
}

async fn open_pooled(
    database_url: &str,
    backend_name: &str,
    config: &DatabaseConfig,
) -> Result<DatabaseConnection> {
    Database::connect(pool_options(database_url, config))
        .await
        .map_err(|e| {
            AttributorError::database_connection(format!(
                "无法连接到 {} 数据库: {}",
                backend_name.to_uppercase(),
                e
            ))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use migration::entities::customer_event;
    use sea_orm::{ConnectionTrait, DbBackend, EntityTrait, PaginatorTrait};
    use tempfile::TempDir;

    #[test]
    fn test_sqlite_options_reject_bad_url() {
        let err = sqlite_options("sqlite://events.db?mode=bogus").unwrap_err();
        assert!(matches!(err, AttributorError::DatabaseConfig(_)));
    }

    #[test]
    fn test_pool_options_follow_config() {
        let config = DatabaseConfig {
            pool_size: 3,
            timeout: 7,
            ..Default::default()
        };
        let options = pool_options("postgres://localhost/attr", &config);
        assert_eq!(options.get_max_connections(), Some(3));
        assert_eq!(options.get_min_connections(), Some(3));
        assert_eq!(options.get_acquire_timeout(), Some(Duration::from_secs(7)));
    }

    #[tokio::test]
    async fn test_open_sqlite_creates_file_and_schema() {
        let td = TempDir::new().unwrap();
        let path = td.path().join("fresh.db");
        let url = format!("sqlite://{}", path.display());

        let db = open(&url, "sqlite", &DatabaseConfig::default())
            .await
            .unwrap();
        assert!(path.exists());

        assert_eq!(db.get_database_backend(), DbBackend::Sqlite);
        let events = customer_event::Entity::find().count(&db).await.unwrap();
        assert_eq!(events, 0);
    }
}
