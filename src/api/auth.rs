// =============================================================================
// Webhook Secret Check — Axum extractor
// =============================================================================
//
// Telegram echoes the `secret_token` given to `setWebhook` in the
// `X-Telegram-Bot-Api-Secret-Token` header of every delivery.  The header is
// compared in constant time against `AppState::webhook_secret`.
//
// Usage:
//
//   async fn handler(_: WebhookSecret, ...) { ... }
//
// Without a configured secret every delivery is refused; webhook mode always
// runs with one (see `webhook_secret_or_generate`).
// =============================================================================

use std::sync::Arc;

use axum::{
    extract::FromRequestParts,
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Response},
};
use tracing::warn;

use crate::app_state::AppState;

pub const SECRET_HEADER: &str = "x-telegram-bot-api-secret-token";

/// Compare two byte slices in constant time.  Every byte is examined even
/// after a mismatch.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result: u8 = 0;
    for (x, y) in a.iter().zip(b.iter()) {
        result |= x ^ y;
    }
    result == 0
}

/// Check a presented header value against the configured secret.
pub fn secret_matches(expected: Option<&str>, presented: Option<&str>) -> bool {
    match (expected, presented) {
        (Some(e), Some(p)) if !e.is_empty() => constant_time_eq(e.as_bytes(), p.as_bytes()),
        _ => false,
    }
}

/// The configured secret, or a fresh random one.  Telegram accepts
/// `A-Z a-z 0-9 _ -` up to 256 characters; a simple UUID is 32 hex digits.
pub fn webhook_secret_or_generate(configured: Option<String>) -> String {
    configured
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| uuid::Uuid::new_v4().simple().to_string())
}

/// Marker extractor: present only if the delivery carried the right secret.
pub struct WebhookSecret;

pub struct SecretRejection;

impl IntoResponse for SecretRejection {
    fn into_response(self) -> Response {
        let body = serde_json::json!({ "error": "invalid webhook secret" });
        (StatusCode::UNAUTHORIZED, axum::Json(body)).into_response()
    }
}

#[axum::async_trait]
impl FromRequestParts<Arc<AppState>> for WebhookSecret {
    type Rejection = SecretRejection;

    async fn from_request_parts(parts: &mut Parts, state: &Arc<AppState>) -> Result<Self, Self::Rejection> {
        let presented = parts.headers.get(SECRET_HEADER).and_then(|v| v.to_str().ok());

        if secret_matches(state.webhook_secret.as_deref(), presented) {
            Ok(WebhookSecret)
        } else {
            warn!(header_present = presented.is_some(), "webhook delivery rejected");
            Err(SecretRejection)
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
