pub mod ip;
pub mod url_validator;

/// 优惠码字符集（大写字母 + 数字）
pub const COUPON_CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// 短码字符集（大小写字母 + 数字）
pub const SHORT_CODE_CHARSET: &[u8] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

pub fn generate_random_code(charset: &[u8], length: usize) -> String {
    use std::iter;

    if charset.is_empty() {
        return String::new();
    }

    iter::repeat_with(|| charset[rand::random_range(0..charset.len())] as char)
        .take(length)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coupon_charset_is_uppercase_alnum() {
        let code = generate_random_code(COUPON_CHARSET, 32);
        assert_eq!(code.len(), 32);
        assert!(
            code.chars()
                .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit())
        );
    }

    #[test]
    fn test_short_code_length() {
        let code = generate_random_code(SHORT_CODE_CHARSET, 6);
        assert_eq!(code.len(), 6);
        assert!(code.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn test_empty_inputs() {
        assert_eq!(generate_random_code(COUPON_CHARSET, 0), "");
        assert_eq!(generate_random_code(b"", 8), "");
    }
}
