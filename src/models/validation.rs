//! Field validation shared by the JSON payloads.

use crate::errors::ApiError;

pub const MIN_QR_SIZE: i32 = 64;
pub const MAX_QR_SIZE: i32 = 2048;

pub fn non_empty(field: &str, value: &str) -> Result<String, ApiError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ApiError::validation(format!("{field} must not be empty")));
    }
    Ok(trimmed.to_string())
}

/// Absolute `http`/`https` URL with a host.
pub fn http_url(field: &str, value: &str) -> Result<(), ApiError> {
    let parsed = url::Url::parse(value.trim())
        .map_err(|_| ApiError::validation(format!("{field} must be an absolute URL")))?;
    if !matches!(parsed.scheme(), "http" | "https") || parsed.host_str().is_none() {
        return Err(ApiError::validation(format!(
            "{field} must be an http or https URL"
        )));
    }
    Ok(())
}

/// `#rrggbb`
pub fn hex_color(field: &str, value: &str) -> Result<(), ApiError> {
    let valid = value.len() == 7
        && value.starts_with('#')
        && value[1..].chars().all(|c| c.is_ascii_hexdigit());
    if !valid {
        return Err(ApiError::validation(format!(
            "{field} must be a #rrggbb color"
        )));
    }
    Ok(())
}

pub fn short_code(value: &str) -> Result<(), ApiError> {
    let valid = (3..=32).contains(&value.len())
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if !valid {
        return Err(ApiError::validation(
            "custom_code must be 3 to 32 characters of letters, digits, '-' or '_'",
        ));
    }
    Ok(())
}

pub fn positive(field: &str, value: i32) -> Result<(), ApiError> {
    if value <= 0 {
        return Err(ApiError::validation(format!("{field} must be positive")));
    }
    Ok(())
}

pub fn qr_size(value: i32) -> Result<(), ApiError> {
    if !(MIN_QR_SIZE..=MAX_QR_SIZE).contains(&value) {
        return Err(ApiError::validation(format!(
            "size must be between {MIN_QR_SIZE} and {MAX_QR_SIZE}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn urls_must_be_absolute_http() {
        assert!(http_url("url", "https://example.com/a?b=c").is_ok());
        assert!(http_url("url", "http://localhost:3000").is_ok());
        assert!(http_url("url", "example.com").is_err());
        assert!(http_url("url", "ftp://example.com").is_err());
        assert!(http_url("url", "javascript:alert(1)").is_err());
    }

    #[test]
    fn colors() {
        assert!(hex_color("color", "#00ff7A").is_ok());
        assert!(hex_color("color", "00ff7a").is_err());
        assert!(hex_color("color", "#00ff7").is_err());
        assert!(hex_color("color", "#gg0000").is_err());
    }

    #[test]
    fn custom_codes() {
        assert!(short_code("promo_2024").is_ok());
        assert!(short_code("ab").is_err());
        assert!(short_code("has space").is_err());
        assert!(short_code(&"a".repeat(33)).is_err());
    }

    #[test]
    fn non_empty_trims() {
        assert_eq!(non_empty("name", "  Menu ").unwrap(), "Menu");
        assert!(non_empty("name", "   ").is_err());
    }

    #[test]
    fn sizes_and_limits() {
        assert!(qr_size(256).is_ok());
        assert!(qr_size(32).is_err());
        assert!(qr_size(4096).is_err());
        assert!(positive("max_scans", 0).is_err());
        assert!(positive("max_scans", 1).is_ok());
    }
}
