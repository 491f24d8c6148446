use super::ClickDetail;

/// 点击日志 Sink
#[async_trait::async_trait]
pub trait ClickSink: Send + Sync {
    /// 记录单条点击
    async fn log_click(&self, detail: ClickDetail) -> anyhow::Result<()>;
}
