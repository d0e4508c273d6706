//! refreshToken cookie handling

use axum::http::{header, HeaderMap, HeaderValue};

pub const REFRESH_TOKEN_COOKIE: &str = "refreshToken";

/// Read the refresh token from the request's `Cookie` headers
pub fn extract_refresh_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == REFRESH_TOKEN_COOKIE)
        .map(|(_, value)| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// `Set-Cookie` value carrying a fresh refresh token
pub fn refresh_cookie(token: &str, max_age_secs: u64, secure: bool) -> Option<HeaderValue> {
    let mut cookie = format!(
        "{}={}; Max-Age={}; Path=/; HttpOnly",
        REFRESH_TOKEN_COOKIE, token, max_age_secs
    );
    if secure {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie).ok()
}

/// `Set-Cookie` value that removes the refresh token
pub fn clear_refresh_cookie(secure: bool) -> HeaderValue {
    let cookie = if secure {
        "refreshToken=; Max-Age=0; Expires=Thu, 01 Jan 1970 00:00:00 GMT; Path=/; HttpOnly; Secure"
    } else {
        "refreshToken=; Max-Age=0; Expires=Thu, 01 Jan 1970 00:00:00 GMT; Path=/; HttpOnly"
    };
    HeaderValue::from_static(cookie)
}
