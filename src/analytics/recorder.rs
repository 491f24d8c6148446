//! 点击记录器
//!
//! 重定向 handler 调用 `record`，写入在独立任务中执行，失败只记 warn。

use std::sync::Arc;

use tracing::{trace, warn};

use super::{ClickDetail, ClickSink};

#[derive(Clone)]
pub struct ClickRecorder {
    sink: Arc<dyn ClickSink>,
}

impl ClickRecorder {
    pub fn new(sink: Arc<dyn ClickSink>) -> Self {
        Self { sink }
    }

    /// 异步记录点击（fire-and-forget）
    pub fn record(&self, detail: ClickDetail) {
        let sink = Arc::clone(&self.sink);
        tokio::spawn(async move {
            let link_id = detail.tracking_link_id;
            match sink.log_click(detail).await {
                Ok(()) => trace!("Click logged for tracking link {}", link_id),
                Err(e) => warn!("Failed to log click for tracking link {}: {}", link_id, e),
            }
        });
    }

    /// 同步等待写入完成（CLI / 测试使用）
    pub async fn record_now(&self, detail: ClickDetail) -> anyhow::Result<()> {
        self.sink.log_click(detail).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::time::Duration;

    #[derive(Default)]
    struct CollectingSink {
        clicks: Mutex<Vec<ClickDetail>>,
    }

    #[async_trait::async_trait]
    impl ClickSink for CollectingSink {
        async fn log_click(&self, detail: ClickDetail) -> anyhow::Result<()> {
            self.clicks.lock().unwrap().push(detail);
            Ok(())
        }
    }

    struct FailingSink;

    #[async_trait::async_trait]
    impl ClickSink for FailingSink {
        async fn log_click(&self, _detail: ClickDetail) -> anyhow::Result<()> {
            anyhow::bail!("disk full")
        }
    }

    #[tokio::test]
    async fn test_record_spawns_write() {
        let sink = Arc::new(CollectingSink::default());
        let recorder = ClickRecorder::new(sink.clone());

        recorder.record(ClickDetail::new(42).with_request_info(
            Some("10.0.0.1".to_string()),
            Some("curl/8.0".to_string()),
            None,
        ));

        for _ in 0..50 {
            if !sink.clicks.lock().unwrap().is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        let clicks = sink.clicks.lock().unwrap();
        assert_eq!(clicks.len(), 1);
        assert_eq!(clicks[0].tracking_link_id, 42);
        assert_eq!(clicks[0].ip_address.as_deref(), Some("10.0.0.1"));
    }

    #[tokio::test]
    async fn test_record_now_surfaces_failure() {
        let recorder = ClickRecorder::new(Arc::new(FailingSink));
        assert!(recorder.record_now(ClickDetail::new(1)).await.is_err());

        // 后台写入失败不会 panic
        recorder.record(ClickDetail::new(1));
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}
