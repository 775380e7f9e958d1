//! Bearer-token check shared by the HTTP middleware and the WS upgrade
//! handler. The token itself is an opaque string from an env var — the
//! spec treats the authenticated principal as an external collaborator,
//! so this is deliberately just a constant-time string comparison, not a
//! session/identity system.

use axum::extract::{Request, State};
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::Response;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

use crate::state::AppState;

/// Constant-time comparison via SHA-256 digest, so differing lengths
/// don't leak through early-exit comparisons.
pub fn token_eq(a: &str, b: &str) -> bool {
    let ha = Sha256::digest(a.as_bytes());
    let hb = Sha256::digest(b.as_bytes());
    ha.ct_eq(&hb).into()
}

/// `None` ⇒ no token configured, every request is accepted (dev mode).
pub fn check_token(expected: Option<&str>, provided: &str) -> bool {
    match expected {
        Some(expected) => token_eq(expected, provided),
        None => true,
    }
}

pub async fn require_api_token(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let provided = request
        .headers()
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .unwrap_or("");

    if check_token(state.api_token.as_deref(), provided) {
        Ok(next.run(request).await)
    } else {
        Err(StatusCode::UNAUTHORIZED)
    }
}
