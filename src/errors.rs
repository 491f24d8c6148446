use std::fmt;

use actix_web::http::StatusCode;

#[derive(Debug, Clone)]
pub enum AttributorError {
    DatabaseConfig(String),
    DatabaseConnection(String),
    /// 持久化失败（写入/查询），调用方可整体重试
    DatabaseOperation(String),
    Validation(String),
    NotFound(String),
    /// 发码唯一性重试耗尽
    Conflict(String),
    Serialization(String),
    DateParse(String),
    StatsQueryFailed(String),
    Unauthorized(String),
    Forbidden(String),
}

impl AttributorError {
    /// 获取错误代码
    pub fn code(&self) -> &'static str {
        match self {
            AttributorError::DatabaseConfig(_) => "E001",
            AttributorError::DatabaseConnection(_) => "E002",
            AttributorError::DatabaseOperation(_) => "E003",
            AttributorError::Validation(_) => "E004",
            AttributorError::NotFound(_) => "E005",
            AttributorError::Conflict(_) => "E006",
            AttributorError::Serialization(_) => "E007",
            AttributorError::DateParse(_) => "E008",
            AttributorError::StatsQueryFailed(_) => "E009",
            AttributorError::Unauthorized(_) => "E010",
            AttributorError::Forbidden(_) => "E011",
        }
    }

    /// 获取错误类型名称
    pub fn error_type(&self) -> &'static str {
        match self {
            AttributorError::DatabaseConfig(_) => "Database Configuration Error",
            AttributorError::DatabaseConnection(_) => "Database Connection Error",
            AttributorError::DatabaseOperation(_) => "Persistence Failure",
            AttributorError::Validation(_) => "Validation Error",
            AttributorError::NotFound(_) => "Resource Not Found",
            AttributorError::Conflict(_) => "Conflict",
            AttributorError::Serialization(_) => "Serialization Error",
            AttributorError::DateParse(_) => "Date Parse Error",
            AttributorError::StatsQueryFailed(_) => "Stats Query Failed",
            AttributorError::Unauthorized(_) => "Unauthorized",
            AttributorError::Forbidden(_) => "Forbidden",
        }
    }

    /// 获取错误详情
    pub fn message(&self) -> &str {
        match self {
            AttributorError::DatabaseConfig(msg)
            | AttributorError::DatabaseConnection(msg)
            | AttributorError::DatabaseOperation(msg)
            | AttributorError::Validation(msg)
            | AttributorError::NotFound(msg)
            | AttributorError::Conflict(msg)
            | AttributorError::Serialization(msg)
            | AttributorError::DateParse(msg)
            | AttributorError::StatsQueryFailed(msg)
            | AttributorError::Unauthorized(msg)
            | AttributorError::Forbidden(msg) => msg,
        }
    }

    /// 映射 HTTP 状态码
    pub fn http_status(&self) -> StatusCode {
        match self {
            AttributorError::Validation(_) | AttributorError::DateParse(_) => {
                StatusCode::BAD_REQUEST
            }
            AttributorError::NotFound(_) => StatusCode::NOT_FOUND,
            AttributorError::Conflict(_) => StatusCode::CONFLICT,
            AttributorError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AttributorError::Forbidden(_) => StatusCode::FORBIDDEN,
            AttributorError::DatabaseConnection(_) => StatusCode::SERVICE_UNAVAILABLE,
            AttributorError::DatabaseConfig(_)
            | AttributorError::DatabaseOperation(_)
            | AttributorError::Serialization(_)
            | AttributorError::StatsQueryFailed(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// 格式化为彩色输出（用于 Server 模式）
    #[cfg(feature = "server")]
    pub fn format_colored(&self) -> String {
        use colored::Colorize;
        format!(
            "{} {} {}\n  {}",
            "[ERROR]".red().bold(),
            self.code().yellow(),
            self.error_type().red(),
            self.message().white()
        )
    }

    /// 格式化为简洁输出（用于 CLI 模式）
    pub fn format_simple(&self) -> String {
        format!("{}: {}", self.error_type(), self.message())
    }
}

impl fmt::Display for AttributorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format_simple())
    }
}

impl std::error::Error for AttributorError {}

// 便捷的构造函数
impl AttributorError {
    pub fn database_config<T: Into<String>>(msg: T) -> Self {
        AttributorError::DatabaseConfig(msg.into())
    }

    pub fn database_connection<T: Into<String>>(msg: T) -> Self {
        AttributorError::DatabaseConnection(msg.into())
    }

    pub fn database_operation<T: Into<String>>(msg: T) -> Self {
        AttributorError::DatabaseOperation(msg.into())
    }

    pub fn validation<T: Into<String>>(msg: T) -> Self {
        AttributorError::Validation(msg.into())
    }

    pub fn not_found<T: Into<String>>(msg: T) -> Self {
        AttributorError::NotFound(msg.into())
    }

    pub fn conflict<T: Into<String>>(msg: T) -> Self {
        AttributorError::Conflict(msg.into())
    }

    pub fn serialization<T: Into<String>>(msg: T) -> Self {
        AttributorError::Serialization(msg.into())
    }

    pub fn date_parse<T: Into<String>>(msg: T) -> Self {
        AttributorError::DateParse(msg.into())
    }

    pub fn stats_query_failed<T: Into<String>>(msg: T) -> Self {
        AttributorError::StatsQueryFailed(msg.into())
    }

    pub fn unauthorized<T: Into<String>>(msg: T) -> Self {
        AttributorError::Unauthorized(msg.into())
    }

    pub fn forbidden<T: Into<String>>(msg: T) -> Self {
        AttributorError::Forbidden(msg.into())
    }
}

// 为常见的错误类型实现 From trait
impl From<sea_orm::DbErr> for AttributorError {
    fn from(err: sea_orm::DbErr) -> Self {
        AttributorError::DatabaseOperation(err.to_string())
    }
}

impl From<serde_json::Error> for AttributorError {
    fn from(err: serde_json::Error) -> Self {
        AttributorError::Serialization(err.to_string())
    }
}

impl From<chrono::ParseError> for AttributorError {
    fn from(err: chrono::ParseError) -> Self {
        AttributorError::DateParse(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AttributorError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_unique() {
        let errors = [
            AttributorError::database_config("x"),
            AttributorError::database_connection("x"),
            AttributorError::database_operation("x"),
            AttributorError::validation("x"),
            AttributorError::not_found("x"),
            AttributorError::conflict("x"),
            AttributorError::serialization("x"),
            AttributorError::date_parse("x"),
            AttributorError::stats_query_failed("x"),
            AttributorError::unauthorized("x"),
            AttributorError::forbidden("x"),
        ];
        let mut codes: Vec<&str> = errors.iter().map(|e| e.code()).collect();
        codes.sort();
        codes.dedup();
        assert_eq!(codes.len(), errors.len());
    }

    #[test]
    fn test_http_status_mapping() {
        assert_eq!(
            AttributorError::not_found("coupon").http_status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AttributorError::conflict("try again").http_status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            AttributorError::database_operation("insert failed").http_status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            AttributorError::date_parse("bad").http_status(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn test_display_uses_simple_format() {
        let err = AttributorError::conflict("code space exhausted, try again");
        assert_eq!(err.to_string(), "Conflict: code space exhausted, try again");
    }

    #[test]
    fn test_from_db_err_is_persistence_failure() {
        let err: AttributorError = sea_orm::DbErr::Custom("boom".into()).into();
        assert!(matches!(err, AttributorError::DatabaseOperation(_)));
        assert_eq!(err.error_type(), "Persistence Failure");
    }
}
