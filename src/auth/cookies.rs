use axum::http::{header::InvalidHeaderValue, HeaderMap, HeaderValue};

pub const SESSION_COOKIE_NAME: &str = "token";

/// Build a `HttpOnly` cookie carrying the session token.
pub fn session_cookie(
    token: &str,
    max_age_secs: u64,
    secure: bool,
) -> Result<HeaderValue, InvalidHeaderValue> {
    let mut cookie = format!(
        "{SESSION_COOKIE_NAME}={token}; Path=/; HttpOnly; SameSite=Lax; Max-Age={max_age_secs}"
    );
    if secure {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie)
}

/// Expire the session cookie immediately.
pub fn clear_session_cookie(secure: bool) -> Result<HeaderValue, InvalidHeaderValue> {
    let mut cookie = format!("{SESSION_COOKIE_NAME}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0");
    if secure {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie)
}

/// Pull the session token out of the `Cookie` header, if present.
pub fn extract_session_token(headers: &HeaderMap) -> Option<String> {
    let header = headers.get(axum::http::header::COOKIE)?;
    let value = header.to_str().ok()?;
    for pair in value.split(';') {
        let trimmed = pair.trim();
        let mut parts = trimmed.splitn(2, '=');
        let key = parts.next()?.trim();
        let val = parts.next()?.trim();
        if key == SESSION_COOKIE_NAME && !val.is_empty() {
            return Some(val.to_string());
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::header::COOKIE;

    #[test]
    fn session_cookie_is_httponly_and_scoped() {
        let value = session_cookie("abc.def.ghi", 3600, false).expect("valid header");
        let s = value.to_str().unwrap();
        assert!(s.starts_with("token=abc.def.ghi"));
        assert!(s.contains("HttpOnly"));
        assert!(s.contains("Max-Age=3600"));
        assert!(!s.contains("Secure"));
    }

    #[test]
    fn secure_flag_is_appended_when_requested() {
        let value = session_cookie("t", 60, true).expect("valid header");
        assert!(value.to_str().unwrap().ends_with("; Secure"));
    }

    #[test]
    fn clear_cookie_expires_immediately() {
        let value = clear_session_cookie(false).expect("valid header");
        let s = value.to_str().unwrap();
        assert!(s.starts_with("token=;"));
        assert!(s.contains("Max-Age=0"));
    }

    #[test]
    fn extract_finds_token_among_other_cookies() {
        let mut headers = HeaderMap::new();
        headers.insert(
            COOKIE,
            HeaderValue::from_static("theme=dark; token=abc123; lang=en"),
        );
        assert_eq!(extract_session_token(&headers).as_deref(), Some("abc123"));
    }

    #[test]
    fn extract_returns_none_without_cookie_header() {
        let headers = HeaderMap::new();
        assert!(extract_session_token(&headers).is_none());
    }

    #[test]
    fn extract_ignores_empty_token_value() {
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_static("token="));
        assert!(extract_session_token(&headers).is_none());
    }
}
