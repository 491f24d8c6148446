//! 点击日志
//!
//! 重定向时记录一次点击；写入在后台完成，不阻塞 302 响应。

pub mod recorder;
pub mod sink;

pub use recorder::ClickRecorder;
pub use sink::ClickSink;

use chrono::{DateTime, Utc};

/// 单次点击详情
#[derive(Debug, Clone)]
pub struct ClickDetail {
    pub tracking_link_id: i64,
    pub clicked_at: DateTime<Utc>,
    /// 客户端 IP 地址
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    /// 来源页面 (Referer header)
    pub referer: Option<String>,
}

impl ClickDetail {
    pub fn new(tracking_link_id: i64) -> Self {
        Self {
            tracking_link_id,
            clicked_at: Utc::now(),
            ip_address: None,
            user_agent: None,
            referer: None,
        }
    }

    pub fn with_request_info(
        mut self,
        ip_address: Option<String>,
        user_agent: Option<String>,
        referer: Option<String>,
    ) -> Self {
        self.ip_address = ip_address;
        self.user_agent = user_agent;
        self.referer = referer;
        self
    }
}
