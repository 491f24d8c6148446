//! CSV 流式导出

use actix_web::{HttpResponse, web};
use bytes::Bytes;
use chrono::Utc;
use csv::WriterBuilder;
use futures_util::stream::{self, Stream, StreamExt};
use serde::Serialize;
use std::fmt::Display;
use std::pin::Pin;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::api::middleware::TenantContext;
use crate::services::StatsService;

use super::helpers::error_from_attributor;
use super::stats::build_scope;
use super::types::StatsQuery;

/// UTF-8 BOM，Excel 打开时按 UTF-8 识别
pub const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// 导出表头，与 `ExportRow` 的字段名保持一致
pub const EXPORT_HEADER: [&str; 8] = [
    "Event ID",
    "Date",
    "Type",
    "Ref Code",
    "Coupon",
    "Revenue",
    "Influencer",
    "Campaign",
];

type BatchStream<T, E> = Pin<Box<dyn Stream<Item = Result<Vec<T>, E>> + Send + 'static>>;

struct CsvState<T, E, F> {
    batches: BatchStream<T, E>,
    header_sent: bool,
    done: bool,
    count: usize,
    mapper: F,
}

fn header_chunk() -> Vec<u8> {
    let mut writer = WriterBuilder::new().from_writer(vec![]);
    // 写入内存不会失败
    let _ = writer.write_record(EXPORT_HEADER);
    writer.into_inner().unwrap_or_default()
}

/// 通用流式 CSV 响应体生成器
///
/// 第一个 chunk 是 BOM，随后是表头和各批次数据。
/// 数据源出错时追加一行 `# ERROR: ...` 并结束，不再拉取后续批次。
/// 响应体被丢弃（客户端断开）时上游分页流随之释放。
pub fn create_csv_stream<T, R, F, E>(
    batch_stream: BatchStream<T, E>,
    row_mapper: F,
    item_name: &'static str,
) -> impl Stream<Item = Result<Bytes, actix_web::Error>>
where
    T: Send + 'static,
    R: Serialize + Send + 'static,
    F: Fn(T) -> R + Send + Clone + 'static,
    E: Display + Send + 'static,
{
    let bom = stream::once(async { Ok::<_, actix_web::Error>(Bytes::from_static(UTF8_BOM)) });

    let body = stream::unfold(
        CsvState {
            batches: batch_stream,
            header_sent: false,
            done: false,
            count: 0,
            mapper: row_mapper,
        },
        move |mut state| async move {
            if state.done {
                return None;
            }

            match state.batches.next().await {
                Some(Ok(batch)) if batch.is_empty() => {
                    state.done = true;
                    if state.header_sent {
                        None
                    } else {
                        state.header_sent = true;
                        Some((Ok(Bytes::from(header_chunk())), state))
                    }
                }
                Some(Ok(batch)) => {
                    let batch_len = batch.len();
                    let with_header = !state.header_sent;
                    let mapper = state.mapper.clone();

                    // CSV 序列化放到 blocking 线程池
                    let csv_result = tokio::task::spawn_blocking(move || {
                        let mut csv_writer = WriterBuilder::new()
                            .has_headers(with_header)
                            .from_writer(vec![]);

                        let mut serialize_errors = 0usize;
                        for item in batch {
                            if let Err(e) = csv_writer.serialize(mapper(item)) {
                                error!("Failed to serialize CSV row: {}", e);
                                serialize_errors += 1;
                            }
                        }

                        (csv_writer.into_inner(), serialize_errors)
                    })
                    .await;

                    match csv_result {
                        Ok((Ok(chunk), serialize_errors)) => {
                            state.count += batch_len;
                            state.header_sent = true;

                            if with_header {
                                info!(
                                    "Export stream: sent CSV header + {} {}",
                                    batch_len, item_name
                                );
                            } else {
                                debug!(
                                    "Export stream: sent batch of {} {} (total: {})",
                                    batch_len, item_name, state.count
                                );
                            }
                            if serialize_errors > 0 {
                                warn!(
                                    "Export stream: {} serialize errors in this batch",
                                    serialize_errors
                                );
                            }

                            Some((Ok(Bytes::from(chunk)), state))
                        }
                        Ok((Err(e), _)) => {
                            error!("Failed to finalize CSV writer: {}", e.error());
                            state.done = true;
                            Some((
                                Err(actix_web::error::ErrorInternalServerError(
                                    "CSV generation error",
                                )),
                                state,
                            ))
                        }
                        Err(e) => {
                            error!("Blocking task panicked: {}", e);
                            state.done = true;
                            Some((
                                Err(actix_web::error::ErrorInternalServerError(
                                    "CSV task failed",
                                )),
                                state,
                            ))
                        }
                    }
                }
                Some(Err(e)) => {
                    error!(
                        "Export stream error at ~{} {}: {}",
                        state.count, item_name, e
                    );
                    let mut chunk = if state.header_sent {
                        Vec::new()
                    } else {
                        header_chunk()
                    };
                    chunk.extend_from_slice(format!("# ERROR: {}\n", e).as_bytes());
                    state.header_sent = true;
                    state.done = true;
                    Some((Ok(Bytes::from(chunk)), state))
                }
                None => {
                    state.done = true;
                    if state.header_sent {
                        info!(
                            "Export stream completed: {} {} exported",
                            state.count, item_name
                        );
                        None
                    } else {
                        state.header_sent = true;
                        Some((Ok(Bytes::from(header_chunk())), state))
                    }
                }
            }
        },
    );

    bom.chain(body)
}

/// GET /stats/export
pub async fn export_events(
    tenant: TenantContext,
    query: web::Query<StatsQuery>,
    stats: web::Data<Arc<StatsService>>,
) -> HttpResponse {
    let scope = match build_scope(&tenant, &query) {
        Ok(scope) => scope,
        Err(e) => return error_from_attributor(&e),
    };

    let csv_stream = create_csv_stream(stats.export(scope), |row| row, "events");

    let filename = format!(
        "attribution_export_{}.csv",
        Utc::now().format("%Y%m%d_%H%M%S")
    );
    info!("API: starting streaming export to {}", filename);

    HttpResponse::Ok()
        .content_type("text/csv; charset=utf-8")
        .insert_header((
            "Content-Disposition",
            format!("attachment; filename=\"{}\"", filename),
        ))
        .streaming(csv_stream)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::AttributorError;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Serialize)]
    struct Row {
        #[serde(rename = "Event ID")]
        id: i64,
    }

    async fn collect(
        batches: Vec<Result<Vec<i64>, AttributorError>>,
    ) -> (String, bool) {
        let source: BatchStream<i64, AttributorError> = Box::pin(stream::iter(batches));
        let chunks: Vec<_> = create_csv_stream(source, |id| Row { id }, "rows")
            .collect()
            .await;
        let had_error = chunks.iter().any(|c| c.is_err());
        let body: Vec<u8> = chunks
            .into_iter()
            .filter_map(|c| c.ok())
            .flat_map(|b| b.to_vec())
            .collect();
        (String::from_utf8(body).unwrap(), had_error)
    }

    #[tokio::test]
    async fn test_bom_header_and_rows() {
        let (body, had_error) = collect(vec![Ok(vec![1, 2]), Ok(vec![3])]).await;
        assert!(!had_error);
        assert!(body.starts_with('\u{feff}'));
        assert_eq!(body.trim_start_matches('\u{feff}'), "Event ID\n1\n2\n3\n");
    }

    #[tokio::test]
    async fn test_empty_export_still_has_header() {
        let (body, _) = collect(vec![]).await;
        assert_eq!(
            body.trim_start_matches('\u{feff}'),
            "Event ID,Date,Type,Ref Code,Coupon,Revenue,Influencer,Campaign\n"
        );
    }

    #[tokio::test]
    async fn test_error_line_ends_stream() {
        let (body, _) = collect(vec![
            Ok(vec![1]),
            Err(AttributorError::stats_query_failed("connection reset")),
            Ok(vec![2]),
        ])
        .await;
        let body = body.trim_start_matches('\u{feff}');
        assert!(body.starts_with("Event ID\n1\n# ERROR: "));
        assert!(body.contains("connection reset"));
        assert!(!body.contains("\n2\n"));
    }

    #[tokio::test]
    async fn test_dropping_body_stops_pulling_batches() {
        let pulled = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&pulled);
        // 无穷分页源，只有被拉取时才计数
        let source: BatchStream<i64, AttributorError> =
            Box::pin(stream::iter(0i64..).map(move |page| {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(vec![page])
            }));

        let mut body = Box::pin(create_csv_stream(source, |id| Row { id }, "rows"));

        let bom = body.next().await.unwrap().unwrap();
        assert_eq!(&bom[..], UTF8_BOM);
        assert_eq!(pulled.load(Ordering::SeqCst), 0);

        let first = body.next().await.unwrap().unwrap();
        assert_eq!(&first[..], b"Event ID\n0\n");
        assert_eq!(pulled.load(Ordering::SeqCst), 1);

        // 客户端断开：actix 丢弃响应体
        drop(body);
        assert_eq!(Arc::strong_count(&pulled), 1);
        assert_eq!(pulled.load(Ordering::SeqCst), 1);
    }
}
