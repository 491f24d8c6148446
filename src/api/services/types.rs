//! API 类型定义

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::storage::models::TS_EXPORT_PATH;

/// JSON 响应信封
#[derive(Serialize, Deserialize, Clone, Debug, TS)]
#[ts(export, export_to = TS_EXPORT_PATH)]
pub struct ApiResponse<T> {
    pub code: i32,
    pub message: String,
    pub data: Option<T>,
}

/// 统计查询参数
///
/// `limit` 只对 top-N 接口生效
#[derive(Deserialize, Clone, Debug, Default, TS)]
#[ts(export, export_to = TS_EXPORT_PATH)]
pub struct StatsQuery {
    #[ts(optional)]
    pub from: Option<String>,
    #[ts(optional)]
    pub to: Option<String>,
    #[ts(optional)]
    pub advertiser_id: Option<i64>,
    #[ts(optional)]
    pub campaign_id: Option<i64>,
    #[ts(optional)]
    pub influencer_id: Option<i64>,
    #[ts(optional)]
    pub limit: Option<u64>,
}

#[derive(Serialize, Clone, Debug, TS)]
#[ts(export, export_to = TS_EXPORT_PATH)]
pub struct HealthResponse {
    pub status: String,
    pub storage: String,
    pub backend: String,
    pub response_time_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub error: Option<String>,
}
