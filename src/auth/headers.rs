//! Credential carriers at the request boundary.
//!
//! The routing layer hands us its `HeaderMap`; we read the `access_token`
//! cookie first and fall back to an `Authorization: Bearer` header, and we
//! build the `Set-Cookie` values so every call site issues and clears the
//! cookie the same way.

use axum::http::{
    header::{InvalidHeaderValue, AUTHORIZATION, COOKIE},
    HeaderMap, HeaderValue,
};

pub const ACCESS_TOKEN_COOKIE: &str = "access_token";

/// Extract the signed token from the request, cookie preferred.
#[must_use]
pub fn extract_access_token(headers: &HeaderMap) -> Option<String> {
    cookie_token(headers).or_else(|| bearer_token(headers))
}

fn cookie_token(headers: &HeaderMap) -> Option<String> {
    let header = headers.get(COOKIE)?;
    let value = header.to_str().ok()?;
    for pair in value.split(';') {
        let trimmed = pair.trim();
        let mut parts = trimmed.splitn(2, '=');
        let key = parts.next()?.trim();
        let val = parts.next()?.trim();
        if key == ACCESS_TOKEN_COOKIE && !val.is_empty() {
            return Some(val.to_string());
        }
    }
    None
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let trimmed = value.trim();
    let token = trimmed
        .strip_prefix("Bearer ")
        .or_else(|| trimmed.strip_prefix("bearer "))?
        .trim();
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}

/// Build the `Set-Cookie` value carrying a freshly issued token.
///
/// HttpOnly, `SameSite=Lax`, scoped to the root path, with Max-Age equal to
/// the token TTL in seconds.
///
/// # Errors
/// Fails only if the token contains bytes illegal in a header value.
pub fn access_token_cookie(
    token: &str,
    max_age_seconds: i64,
) -> Result<HeaderValue, InvalidHeaderValue> {
    HeaderValue::from_str(&format!(
        "{ACCESS_TOKEN_COOKIE}={token}; Path=/; HttpOnly; SameSite=Lax; Max-Age={max_age_seconds}"
    ))
}

/// Build the `Set-Cookie` value that clears the credential carrier.
///
/// Logout always sends this, whether or not a session was found server-side.
#[must_use]
pub fn clear_access_token_cookie() -> HeaderValue {
    HeaderValue::from_static("access_token=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0")
}
