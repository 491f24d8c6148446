//! 客户端 IP 提取
//!
//! 上游网关负责设置 X-Forwarded-For / Forwarded，这里直接信任 actix 的 realip 解析，
//! 仅去掉端口部分。

use std::net::{IpAddr, SocketAddr};

use actix_web::HttpRequest;

/// 去掉端口，返回规范化的 IP 字符串
pub fn normalize_ip(raw: &str) -> Option<String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(socket_addr) = raw.parse::<SocketAddr>() {
        return Some(socket_addr.ip().to_string());
    }
    if let Ok(ip_addr) = raw.parse::<IpAddr>() {
        return Some(ip_addr.to_string());
    }
    None
}

/// 从请求中提取客户端 IP
pub fn extract_client_ip(req: &HttpRequest) -> Option<String> {
    let conn_info = req.connection_info();
    conn_info.realip_remote_addr().and_then(normalize_ip)
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test::TestRequest;

    #[test]
    fn test_normalize_ip() {
        assert_eq!(normalize_ip("10.0.0.1:5555").as_deref(), Some("10.0.0.1"));
        assert_eq!(normalize_ip("[::1]:8080").as_deref(), Some("::1"));
        assert_eq!(normalize_ip("192.168.1.9").as_deref(), Some("192.168.1.9"));
        assert_eq!(normalize_ip("not-an-ip"), None);
        assert_eq!(normalize_ip(""), None);
    }

    #[test]
    fn test_extract_from_forwarded_header() {
        let req = TestRequest::default()
            .insert_header(("X-Forwarded-For", "203.0.113.7"))
            .to_http_request();
        assert_eq!(extract_client_ip(&req).as_deref(), Some("203.0.113.7"));
    }
}
