//! HTTP surface: two POST endpoints over the gateway.
//!
//! Every 5xx body carries a speakable apology alongside the machine error,
//! so the browser client can keep talking even when the backend is broken.

use crate::gateway::Gateway;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use kana_core::config::ServerConfig;
use kana_core::error::KanaError;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tracing::{error, info};

#[derive(Clone)]
struct AppState {
    gateway: Arc<Gateway>,
}

#[derive(Debug, Deserialize)]
struct ChatRequest {
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Serialize)]
struct ErrorReply {
    error: String,
    display: String,
    speak: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    audio: Option<String>,
}

pub fn router(gateway: Arc<Gateway>) -> Router {
    Router::new()
        .route("/chat", post(chat))
        .route("/reset", post(reset))
        .with_state(AppState { gateway })
}

pub async fn serve(gateway: Arc<Gateway>, config: &ServerConfig) -> anyhow::Result<()> {
    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("listening on {addr}");
    axum::serve(listener, router(gateway)).await?;
    Ok(())
}

async fn chat(State(state): State<AppState>, Json(req): Json<ChatRequest>) -> Response {
    let Some(message) = req.message.filter(|m| !m.trim().is_empty()) else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": "message required"})),
        )
            .into_response();
    };

    match state.gateway.handle_chat(&message).await {
        Ok(reply) => (StatusCode::OK, Json(reply)).into_response(),
        Err(KanaError::Validation(detail)) => {
            (StatusCode::BAD_REQUEST, Json(json!({"error": detail}))).into_response()
        }
        Err(e) => {
            error!("chat turn failed: {e}");
            let (display, speak) = apology(&e);
            let audio = state.gateway.synthesize_b64(&speak).await;
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorReply {
                    error: e.to_string(),
                    display,
                    speak,
                    audio,
                }),
            )
                .into_response()
        }
    }
}

async fn reset(State(state): State<AppState>) -> Response {
    state.gateway.reset().await;
    info!("conversation reset");
    (StatusCode::OK, Json(json!({"status": "ok"}))).into_response()
}

/// Spoken-friendly apology per failure class. Display keeps the detail,
/// speech spells out abbreviations the synthesizer would mangle.
fn apology(error: &KanaError) -> (String, String) {
    match error {
        KanaError::RateLimited => (
            "APIのレート制限に引っかかっちゃいました…少し待ってからまた話しかけてください！"
                .to_string(),
            "エーピーアイのレート制限に引っかかっちゃいました。少し待ってからまた話しかけてください！"
                .to_string(),
        ),
        KanaError::Upstream(detail) => (
            format!("APIエラーです: {detail}"),
            "エーピーアイエラーが発生しちゃいました…".to_string(),
        ),
        _ => (
            "あれ、なんかエラーが出ちゃったみたいです…".to_string(),
            "あれ、なんかエラーが出ちゃったみたいです…".to_string(),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_limit_apology_is_speakable() {
        let (display, speak) = apology(&KanaError::RateLimited);
        assert!(display.starts_with("API"));
        assert!(speak.starts_with("エーピーアイ"));
    }

    #[test]
    fn test_upstream_apology_keeps_detail_in_display_only() {
        let (display, speak) = apology(&KanaError::Upstream("status 503".to_string()));
        assert!(display.contains("status 503"));
        assert!(!speak.contains("503"));
    }

    #[test]
    fn test_generic_apology() {
        let (display, speak) = apology(&KanaError::Integration("x".to_string()));
        assert_eq!(display, speak);
        assert!(display.contains("エラー"));
    }

    #[test]
    fn test_chat_request_tolerates_missing_message() {
        let req: ChatRequest = serde_json::from_str("{}").unwrap();
        assert!(req.message.is_none());
    }
}
