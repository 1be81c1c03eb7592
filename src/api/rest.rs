// =============================================================================
// HTTP Endpoints — Axum 0.7
// =============================================================================
//
// `/` and `/api/v1/health` are liveness checks for the hosting platform.
// `/api/v1/signal/:symbol` runs the same pipeline the chat commands use and
// returns the analysis as JSON.  `/telegram/webhook` receives updates in
// webhook mode; it acknowledges at once and handles the update on a task.
//
// CORS is permissive; the only write endpoint is guarded by the webhook
// secret and refuses everything when none is configured.
// =============================================================================

use std::sync::Arc;

use axum::{
    extract::{Json, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use tower_http::cors::{Any, CorsLayer};
use tracing::{debug, info};

use crate::api::auth::WebhookSecret;
use crate::app_state::AppState;
use crate::bot::handle_update;
use crate::market_data::Timeframe;
use crate::telegram::Update;

pub const WEBHOOK_PATH: &str = "/telegram/webhook";

// =============================================================================
// Router construction
// =============================================================================

/// Build the HTTP router with CORS middleware and shared state.
pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(index))
        .route("/api/v1/health", get(health))
        .route("/api/v1/signal/:symbol", get(signal))
        .route(WEBHOOK_PATH, post(webhook))
        .layer(cors)
        .with_state(state)
}

// =============================================================================
// Liveness
// =============================================================================

async fn index() -> &'static str {
    "Crypto Bot Running ✅"
}

async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.health())
}

// =============================================================================
// Signal
// =============================================================================

#[derive(Debug, Deserialize)]
struct SignalQuery {
    timeframe: Option<String>,
}

async fn signal(
    State(state): State<Arc<AppState>>,
    Path(symbol): Path<String>,
    Query(query): Query<SignalQuery>,
) -> impl IntoResponse {
    let symbol = state.config.resolve_symbol(&symbol);
    let timeframe = match query.timeframe.as_deref() {
        None => state.config.default_timeframe,
        Some(raw) => match raw.parse::<Timeframe>() {
            Ok(tf) => tf,
            Err(e) => {
                return (
                    StatusCode::BAD_REQUEST,
                    Json(serde_json::json!({ "error": e.to_string() })),
                )
                    .into_response()
            }
        },
    };

    info!(symbol = %symbol, %timeframe, "signal requested over HTTP");
    match state.pipeline.run(&symbol, timeframe).await {
        Ok(analysis) => Json(analysis).into_response(),
        Err(e) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(serde_json::json!({
                "error": e.to_string(),
                "symbol": e.symbol(),
            })),
        )
            .into_response(),
    }
}

// =============================================================================
// Telegram webhook
// =============================================================================

async fn webhook(
    _secret: WebhookSecret,
    State(state): State<Arc<AppState>>,
    Json(update): Json<Update>,
) -> StatusCode {
    debug!(update_id = update.update_id, "webhook delivery");
    tokio::spawn(async move {
        handle_update(&state, update).await;
    });
    StatusCode::OK
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::auth::SECRET_HEADER;
    use crate::app_state::tests::test_state;
    use crate::bot::handler::tests::rising_candles;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    async fn body_json(resp: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn index_is_plain_text() {
        let (state, _) = test_state(None);
        let resp = router(state)
            .oneshot(Request::get("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], "Crypto Bot Running ✅".as_bytes());
    }

    #[tokio::test]
    async fn health_is_json() {
        let (state, _) = test_state(None);
        let resp = router(state)
            .oneshot(Request::get("/api/v1/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let json = body_json(resp).await;
        assert_eq!(json["status"], "ok");
        assert_eq!(json["mode"], "Polling");
    }

    #[tokio::test]
    async fn signal_returns_analysis() {
        let (state, _) = test_state(Some(rising_candles()));
        let resp = router(state)
            .oneshot(Request::get("/api/v1/signal/btc?timeframe=4h").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let json = body_json(resp).await;
        assert_eq!(json["symbol"], "BTCUSDT");
        assert_eq!(json["signal"]["direction"], "Long");
    }

    #[tokio::test]
    async fn signal_rejects_bad_timeframe() {
        let (state, _) = test_state(Some(rising_candles()));
        let resp = router(state)
            .oneshot(Request::get("/api/v1/signal/BTCUSDT?timeframe=7h").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn signal_unavailable_is_503() {
        let (state, _) = test_state(None);
        let resp = router(state)
            .oneshot(Request::get("/api/v1/signal/ETHUSDT").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
        let json = body_json(resp).await;
        assert_eq!(json["symbol"], "ETHUSDT");
    }

    fn webhook_request(secret: Option<&str>) -> Request<Body> {
        let body = serde_json::json!({
            "update_id": 77,
            "message": {
                "message_id": 1,
                "chat": {"id": 555, "type": "private"},
                "text": "/start"
            }
        });
        let mut builder = Request::post(WEBHOOK_PATH).header("content-type", "application/json");
        if let Some(s) = secret {
            builder = builder.header(SECRET_HEADER, s);
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    #[tokio::test]
    async fn webhook_rejects_wrong_secret() {
        let (state, sender) = test_state(None);
        let resp = router(state.clone()).oneshot(webhook_request(Some("nope"))).await.unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        let resp = router(state).oneshot(webhook_request(None)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        assert!(sender.texts().is_empty());
    }

    #[tokio::test]
    async fn webhook_without_configured_secret_is_closed() {
        let sender = Arc::new(crate::telegram::client::tests::RecordingSender::default());
        let state = Arc::new(AppState::new(
            Arc::new(crate::runtime_config::BotConfig::default()),
            Arc::new(crate::market_data::source::tests::StaticSource::ok(rising_candles())),
            sender.clone(),
            crate::types::BotMode::Webhook,
            None,
        ));

        let resp = router(state.clone()).oneshot(webhook_request(None)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        let resp = router(state).oneshot(webhook_request(Some(""))).await.unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        assert!(sender.texts().is_empty());
    }

    #[tokio::test]
    async fn webhook_acknowledges_and_handles() {
        let (state, sender) = test_state(None);
        let resp = router(state).oneshot(webhook_request(Some("s3cret"))).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        // The handler runs on a spawned task.
        for _ in 0..100 {
            if !sender.texts().is_empty() {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        let sent = sender.sent.lock();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].chat_id, 555);
        assert!(sent[0].text.contains("Welcome"));
    }
}
