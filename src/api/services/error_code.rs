//! 统一 API 错误码定义

use serde_repr::{Deserialize_repr, Serialize_repr};
use ts_rs::TS;

use crate::errors::AttributorError;
use crate::storage::models::TS_EXPORT_PATH;

/// API 错误码枚举
///
/// 使用 serde_repr 序列化为数字，ts-rs 自动生成 TypeScript 类型。
/// 按千位分域：
/// - 0: 成功
/// - 1000-1099: 通用错误
/// - 2000-2099: 事件写入错误
/// - 3000-3099: 统计与导出错误
/// - 4000-4099: 发码错误
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize_repr, Deserialize_repr, TS)]
#[ts(export, export_to = TS_EXPORT_PATH)]
#[ts(rename = "ErrorCode")]
#[ts(repr(enum))]
#[repr(i32)]
pub enum ErrorCode {
    // 成功
    Success = 0,

    // 通用错误 1000-1099
    BadRequest = 1000,
    Unauthorized = 1001,
    Forbidden = 1003,
    NotFound = 1004,
    InternalServerError = 1005,
    InvalidDateFormat = 1012,
    ServiceUnavailable = 1030,

    // 事件写入错误 2000-2099
    InvalidEventPayload = 2000,
    PersistenceFailure = 2001,
    TenantRequired = 2002,

    // 统计与导出错误 3000-3099
    StatsQueryFailed = 3000,
    ExportFailed = 3001,
    CsvGenerationError = 3002,

    // 发码错误 4000-4099
    CodeConflict = 4000,
}

impl From<AttributorError> for ErrorCode {
    fn from(err: AttributorError) -> Self {
        ErrorCode::from(&err)
    }
}

impl From<&AttributorError> for ErrorCode {
    fn from(err: &AttributorError) -> Self {
        match err {
            AttributorError::Validation(_) => ErrorCode::BadRequest,
            AttributorError::DateParse(_) => ErrorCode::InvalidDateFormat,
            AttributorError::NotFound(_) => ErrorCode::NotFound,
            AttributorError::Conflict(_) => ErrorCode::CodeConflict,
            AttributorError::Unauthorized(_) => ErrorCode::Unauthorized,
            AttributorError::Forbidden(_) => ErrorCode::Forbidden,
            AttributorError::DatabaseOperation(_) => ErrorCode::PersistenceFailure,
            AttributorError::DatabaseConnection(_) => ErrorCode::ServiceUnavailable,
            AttributorError::StatsQueryFailed(_) => ErrorCode::StatsQueryFailed,
            AttributorError::DatabaseConfig(_) | AttributorError::Serialization(_) => {
                ErrorCode::InternalServerError
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serializes_as_number() {
        assert_eq!(serde_json::to_string(&ErrorCode::Success).unwrap(), "0");
        assert_eq!(
            serde_json::to_string(&ErrorCode::StatsQueryFailed).unwrap(),
            "3000"
        );
    }

    #[test]
    fn test_from_attributor_error() {
        assert_eq!(
            ErrorCode::from(AttributorError::conflict("try again")),
            ErrorCode::CodeConflict
        );
        assert_eq!(
            ErrorCode::from(AttributorError::date_parse("bad")),
            ErrorCode::InvalidDateFormat
        );
        assert_eq!(
            ErrorCode::from(AttributorError::database_operation("insert")),
            ErrorCode::PersistenceFailure
        );
    }
}
