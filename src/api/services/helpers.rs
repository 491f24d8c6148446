//! API 帮助函数

use actix_web::http::StatusCode;
use actix_web::{HttpRequest, HttpResponse, error::InternalError};
use serde::Serialize;
use tracing::warn;

use crate::errors::AttributorError;

use super::error_code::ErrorCode;
use super::types::ApiResponse;

/// 构建 JSON 响应
pub fn json_response<T: Serialize>(
    status: StatusCode,
    code: ErrorCode,
    message: impl Into<String>,
    data: Option<T>,
) -> HttpResponse {
    HttpResponse::build(status)
        .append_header(("Content-Type", "application/json; charset=utf-8"))
        .json(ApiResponse {
            code: code as i32,
            message: message.into(),
            data,
        })
}

/// 构建成功响应
pub fn success_response<T: Serialize>(data: T) -> HttpResponse {
    json_response(StatusCode::OK, ErrorCode::Success, "OK", Some(data))
}

/// 构建 201 Created 响应
pub fn created_response<T: Serialize>(data: T) -> HttpResponse {
    json_response(StatusCode::CREATED, ErrorCode::Success, "Created", Some(data))
}

/// 构建错误响应
pub fn error_response(status: StatusCode, error_code: ErrorCode, message: &str) -> HttpResponse {
    json_response::<()>(status, error_code, message, None)
}

/// 从 AttributorError 构建错误响应（自动映射 HTTP 状态码和 ErrorCode）
pub fn error_from_attributor(err: &AttributorError) -> HttpResponse {
    error_response(err.http_status(), ErrorCode::from(err), err.message())
}

/// 统一 Result → HttpResponse 转换
///
/// 成功时返回 200 OK + JSON 数据，失败时自动映射 AttributorError。
pub fn api_result<T, E>(result: Result<T, E>) -> HttpResponse
where
    T: Serialize,
    E: Into<AttributorError>,
{
    match result {
        Ok(data) => success_response(data),
        Err(e) => {
            let err: AttributorError = e.into();
            error_from_attributor(&err)
        }
    }
}

/// JSON body 反序列化失败（未知 action、类型错误等）统一走信封
pub fn json_error_handler(
    err: actix_web::error::JsonPayloadError,
    _req: &HttpRequest,
) -> actix_web::Error {
    warn!("Rejected event payload: {}", err);
    let response = error_response(
        StatusCode::BAD_REQUEST,
        ErrorCode::InvalidEventPayload,
        &format!("Invalid event payload: {}", err),
    );
    InternalError::from_response(err, response).into()
}

/// Query 参数解析失败统一走信封
pub fn query_error_handler(
    err: actix_web::error::QueryPayloadError,
    _req: &HttpRequest,
) -> actix_web::Error {
    let response = error_response(
        StatusCode::BAD_REQUEST,
        ErrorCode::BadRequest,
        &format!("Invalid query parameters: {}", err),
    );
    InternalError::from_response(err, response).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_response() {
        let response = success_response("success_data");
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[test]
    fn test_created_response() {
        let response = created_response(1);
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    #[test]
    fn test_error_from_attributor_maps_status() {
        let response = error_from_attributor(&AttributorError::forbidden("nope"));
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let response = error_from_attributor(&AttributorError::stats_query_failed("boom"));
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_api_result() {
        let ok: Result<u32, AttributorError> = Ok(3);
        assert_eq!(api_result(ok).status(), StatusCode::OK);

        let err: Result<u32, AttributorError> = Err(AttributorError::validation("bad"));
        assert_eq!(api_result(err).status(), StatusCode::BAD_REQUEST);
    }
}
