use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{debug, info};

use crate::analytics::ClickRecorder;
use crate::services::{
    AttributionResolver, CodeIssuer, IngestionCoordinator, RedirectService, StatsService,
};
use crate::storage::{SeaOrmStorage, StorageFactory};

/// 启动后共享的服务集合
#[derive(Clone)]
pub struct AppServices {
    pub storage: Arc<SeaOrmStorage>,
    pub ingestion: Arc<IngestionCoordinator>,
    pub stats: Arc<StatsService>,
    pub redirects: Arc<RedirectService>,
    pub code_issuer: Arc<CodeIssuer>,
}

impl AppServices {
    /// 基于已连接的存储组装服务（测试也走这里）
    pub fn from_storage(storage: Arc<SeaOrmStorage>) -> Self {
        let resolver = AttributionResolver::new(storage.clone());
        let ingestion = IngestionCoordinator::new(resolver, storage.clone());
        let stats = StatsService::new(storage.clone());
        let recorder = ClickRecorder::new(storage.as_click_sink());
        let redirects = RedirectService::new(storage.clone(), recorder);
        let code_issuer = CodeIssuer::new(storage.clone());

        Self {
            storage,
            ingestion: Arc::new(ingestion),
            stats: Arc::new(stats),
            redirects: Arc::new(redirects),
            code_issuer: Arc::new(code_issuer),
        }
    }
}

/// 连接存储、执行迁移并组装服务
pub async fn prepare_services() -> Result<AppServices> {
    let start_time = std::time::Instant::now();
    debug!("Starting pre-startup processing...");

    // sqlx rustls 连接需要进程级 crypto provider；重复安装（测试中多次调用）忽略即可
    if rustls::crypto::ring::default_provider()
        .install_default()
        .is_err()
    {
        debug!("rustls crypto provider already installed");
    }

    let storage = StorageFactory::create()
        .await
        .context("Failed to create storage backend")?;
    info!("Using storage backend: {}", storage.get_backend_name());

    let services = AppServices::from_storage(storage);

    info!(
        "Pre-startup processing completed in {} ms",
        start_time.elapsed().as_millis()
    );
    Ok(services)
}
