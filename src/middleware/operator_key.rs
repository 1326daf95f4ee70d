use crate::error::authorization_error::AuthorizationError;
use crate::state::system_state::SystemState;
use axum::extract::State;
use axum::{http::Request, middleware::Next, response::IntoResponse};
use sha2::{Digest, Sha256};
use tracing::warn;

pub const OPERATOR_KEY_HEADER: &str = "x-api-key";

/// Guards maintenance endpoints with the shared operator key from `X-Api-Key`
pub async fn require_operator_key(
    State(state): State<SystemState>,
    req: Request<axum::body::Body>,
    next: Next,
) -> Result<impl IntoResponse, AuthorizationError> {
    let Some(expected) = state.operator_key.as_deref() else {
        warn!("SECURITY: Operator endpoint called but no operator key is configured");
        return Err(AuthorizationError::OperatorKeyNotConfigured);
    };

    let presented = req
        .headers()
        .get(OPERATOR_KEY_HEADER)
        .and_then(|header| header.to_str().ok())
        .unwrap_or_default();

    if !keys_match(presented, expected) {
        warn!("SECURITY: Operator endpoint called with a missing or wrong key");
        return Err(AuthorizationError::InvalidOperatorKey);
    }

    Ok(next.run(req).await)
}

/// Compares fixed-length digests so the comparison does not leak the key length
fn keys_match(presented: &str, expected: &str) -> bool {
    if presented.is_empty() {
        return false;
    }
    let presented = Sha256::digest(presented.as_bytes());
    let expected = Sha256::digest(expected.as_bytes());
    presented
        .iter()
        .zip(expected.iter())
        .fold(0u8, |acc, (a, b)| acc | (a ^ b))
        == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keys_match() {
        assert!(keys_match("s3cret-operator", "s3cret-operator"));
        assert!(!keys_match("s3cret-operatox", "s3cret-operator"));
        assert!(!keys_match("", "s3cret-operator"));
    }
}
