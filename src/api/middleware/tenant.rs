//! Tenant resolution
//!
//! 鉴权由上游网关完成，这里只读取网关注入的身份头：
//! - `X-Advertiser-Id: <id>`：租户调用方，只能访问自己的数据
//! - `X-Tenant-Scope: global`：特权调用方，可查看全局或指定任意 advertiser
//!
//! 两者都缺失时返回 401。两者同时存在时按租户处理。

use actix_web::dev::Payload;
use actix_web::http::header::HeaderMap;
use actix_web::{FromRequest, HttpRequest, error::InternalError};
use futures_util::future::{Ready, ready};

use crate::api::services::helpers::error_from_attributor;
use crate::errors::{AttributorError, Result};

pub const ADVERTISER_HEADER: &str = "X-Advertiser-Id";
pub const TENANT_SCOPE_HEADER: &str = "X-Tenant-Scope";
pub const GLOBAL_SCOPE: &str = "global";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TenantContext {
    Advertiser(i64),
    Global,
}

impl TenantContext {
    pub fn from_headers(headers: &HeaderMap) -> Result<Self> {
        if let Some(value) = headers.get(ADVERTISER_HEADER) {
            let id = value
                .to_str()
                .ok()
                .and_then(|s| s.trim().parse::<i64>().ok())
                .filter(|id| *id > 0)
                .ok_or_else(|| {
                    AttributorError::unauthorized(format!("Invalid {} header", ADVERTISER_HEADER))
                })?;
            return Ok(TenantContext::Advertiser(id));
        }

        let is_global = headers
            .get(TENANT_SCOPE_HEADER)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.trim().eq_ignore_ascii_case(GLOBAL_SCOPE));
        if is_global {
            return Ok(TenantContext::Global);
        }

        Err(AttributorError::unauthorized("Missing tenant identity"))
    }

    /// 统计查询的 advertiser 范围
    ///
    /// 租户调用方传入其他 advertiser_id 时拒绝；特权调用方按请求值（None 为全局）
    pub fn scoped_advertiser(&self, requested: Option<i64>) -> Result<Option<i64>> {
        match (*self, requested) {
            (TenantContext::Advertiser(own), Some(other)) if other != own => Err(
                AttributorError::forbidden("advertiser_id does not match the caller's tenant"),
            ),
            (TenantContext::Advertiser(own), _) => Ok(Some(own)),
            (TenantContext::Global, requested) => Ok(requested),
        }
    }

    /// 写入事件必须归属某个 advertiser
    pub fn require_advertiser(&self) -> Result<i64> {
        match self {
            TenantContext::Advertiser(id) => Ok(*id),
            TenantContext::Global => Err(AttributorError::validation(
                "Events must be ingested on behalf of an advertiser",
            )),
        }
    }
}

impl FromRequest for TenantContext {
    type Error = actix_web::Error;
    type Future = Ready<std::result::Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(TenantContext::from_headers(req.headers()).map_err(|e| {
            let response = error_from_attributor(&e);
            InternalError::from_response(e, response).into()
        }))
    }
}
