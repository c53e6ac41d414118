//! Bearer-token auth (spec §4.9): self-verifying signed tokens built from the
//! existing `sha2`/`subtle` dependencies rather than a dedicated JWT crate.

use std::sync::Arc;

use axum::extract::State;
use axum::http::{Request, StatusCode};
use axum::middleware::Next;
use axum::response::Response;
use chrono::{Duration, Utc};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

use crate::runtime::Runtime;

const TOKEN_LIFETIME_HOURS: i64 = 8;

fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

fn sign(secret: &str, payload: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(secret.as_bytes());
    hasher.update(b":");
    hasher.update(payload.as_bytes());
    hex_encode(&hasher.finalize())
}

/// Issue an 8-hour bearer token for `username`, signed with `secret`.
pub fn issue_token(secret: &str, username: &str) -> String {
    let expires_at = (Utc::now() + Duration::hours(TOKEN_LIFETIME_HOURS)).timestamp();
    let payload = format!("{}|{}", username, expires_at);
    let signature = sign(secret, &payload);
    format!("{}.{}", payload, signature)
}

/// Verify a bearer token's signature and expiry; returns the username on success.
pub fn verify_token(secret: &str, token: &str) -> Option<String> {
    let (payload, signature) = token.rsplit_once('.')?;
    let expected = sign(secret, payload);

    let matches: bool = signature.as_bytes().ct_eq(expected.as_bytes()).into();
    if !matches {
        return None;
    }

    let (username, expires_at_raw) = payload.split_once('|')?;
    let expires_at: i64 = expires_at_raw.parse().ok()?;
    if Utc::now().timestamp() > expires_at {
        return None;
    }
    Some(username.to_string())
}

/// Middleware enforcing bearer auth on every `/api/*` path except
/// `/api/health` and `/api/auth/*` (spec §4.9), when `RuntimeConfig.auth_enabled`.
pub async fn require_auth(
    State(runtime): State<Arc<Runtime>>,
    request: Request<axum::body::Body>,
    next: Next,
) -> Result<Response, StatusCode> {
    if !runtime.config.auth_enabled {
        return Ok(next.run(request).await);
    }

    let path = request.uri().path();
    if path == "/api/health" || path.starts_with("/api/auth/") {
        return Ok(next.run(request).await);
    }

    let secret = runtime.config.jwt_secret.as_deref().unwrap_or_default();
    let token = request
        .headers()
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));

    match token.and_then(|t| verify_token(secret, t)) {
        Some(_username) => Ok(next.run(request).await),
        None => Err(StatusCode::UNAUTHORIZED),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issued_token_verifies() {
        let token = issue_token("secret", "admin");
        assert_eq!(verify_token("secret", &token).as_deref(), Some("admin"));
    }

    #[test]
    fn wrong_secret_fails() {
        let token = issue_token("secret", "admin");
        assert!(verify_token("other-secret", &token).is_none());
    }

    #[test]
    fn tampered_payload_fails() {
        let token = issue_token("secret", "admin");
        let tampered = token.replacen("admin", "root", 1);
        assert!(verify_token("secret", &tampered).is_none());
    }
}
