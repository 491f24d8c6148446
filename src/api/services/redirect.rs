use actix_web::http::StatusCode;
use actix_web::http::header::{LOCATION, REFERER, USER_AGENT};
use actix_web::{HttpRequest, HttpResponse, web};
use std::sync::Arc;
use tracing::trace;

use crate::services::{ClickMeta, RedirectService};
use crate::utils::ip::extract_client_ip;

/// 短码最大长度，超出直接 404，不查库
const MAX_SHORT_CODE_LEN: usize = 64;

fn is_valid_short_code(code: &str) -> bool {
    !code.is_empty()
        && code.len() <= MAX_SHORT_CODE_LEN
        && code
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

fn header_string(req: &HttpRequest, name: actix_web::http::header::HeaderName) -> Option<String> {
    req.headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

fn not_found_response() -> HttpResponse {
    HttpResponse::build(StatusCode::NOT_FOUND)
        .insert_header(("Content-Type", "text/html; charset=utf-8"))
        .insert_header(("Cache-Control", "public, max-age=60"))
        .body("Not Found")
}

/// GET /{short_code}
///
/// 302 到目标地址（带 `ref_code`），点击异步落库；未知短码 404
pub async fn handle_redirect(
    req: HttpRequest,
    path: web::Path<String>,
    redirects: web::Data<Arc<RedirectService>>,
) -> HttpResponse {
    let short_code = path.into_inner();
    if !is_valid_short_code(&short_code) {
        trace!("Invalid short code rejected: {}", short_code);
        return not_found_response();
    }

    let meta = ClickMeta {
        ip_address: extract_client_ip(&req),
        user_agent: header_string(&req, USER_AGENT),
        referer: header_string(&req, REFERER),
    };

    match redirects.resolve(&short_code, meta).await {
        Some(target) => HttpResponse::build(StatusCode::FOUND)
            .insert_header((LOCATION, target))
            .finish(),
        None => not_found_response(),
    }
}

/// 重定向路由，挂在 `server.redirect_prefix`（默认 `/r`）下
pub fn redirect_routes(redirect_prefix: &str) -> actix_web::Scope {
    web::scope(redirect_prefix)
        .route("/{short_code}", web::get().to(handle_redirect))
        .route("/{short_code}", web::head().to(handle_redirect))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_valid_short_code() {
        assert!(is_valid_short_code("abc123"));
        assert!(is_valid_short_code("Ab-_9"));
        assert!(!is_valid_short_code(""));
        assert!(!is_valid_short_code("a/b"));
        assert!(!is_valid_short_code(&"x".repeat(65)));
    }
}
