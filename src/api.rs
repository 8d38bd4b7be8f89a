//! REST API server
//!
//! Exposes the orchestrator over HTTP. One endpoint handles both message
//! and document turns; the caller echoes context and history back on every
//! invocation.

use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::info;

use crate::models::InvocationPayload;
use crate::orchestrator::Orchestrator;

/// =============================
/// Response Wrapper
/// =============================

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse {
    pub success: bool,
    pub data: Option<serde_json::Value>,
    pub error: Option<String>,
    pub timestamp: String,
}

impl ApiResponse {
    pub fn success<T: Serialize>(data: T) -> Self {
        Self {
            success: true,
            data: serde_json::to_value(data).ok(),
            error: None,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// =============================
/// API State
/// =============================

#[derive(Clone)]
pub struct ApiState {
    pub orchestrator: Arc<Orchestrator>,
}

/// =============================
/// Helpers — Stable user ids
/// =============================

fn stable_uuid_from_string(input: &str) -> uuid::Uuid {
    use sha2::{Digest, Sha256};

    let hash = Sha256::digest(input.as_bytes());
    let mut bytes = [0u8; 16];
    bytes.copy_from_slice(&hash[..16]);

    // Set UUID version (4) and variant (RFC4122) bits.
    bytes[6] = (bytes[6] & 0x0f) | 0x40;
    bytes[8] = (bytes[8] & 0x3f) | 0x80;

    uuid::Uuid::from_bytes(bytes)
}

fn canonical_user_id(value: Option<&str>) -> String {
    match value {
        Some(v) if !v.trim().is_empty() => uuid::Uuid::parse_str(v)
            .unwrap_or_else(|_| stable_uuid_from_string(v))
            .to_string(),
        _ => stable_uuid_from_string("anonymous-user").to_string(),
    }
}

fn with_canonical_user_id(mut payload: InvocationPayload) -> InvocationPayload {
    let canonical = canonical_user_id(payload.user_id());
    match &mut payload {
        InvocationPayload::Message(p) => p.user_id = Some(canonical),
        InvocationPayload::Document(p) => p.user_id = Some(canonical),
    }
    payload
}

/// =============================
/// Health Endpoint
/// =============================

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

/// =============================
/// Invocation Endpoint
/// =============================

async fn invoke_handler(
    State(state): State<ApiState>,
    Json(payload): Json<InvocationPayload>,
) -> (StatusCode, Json<ApiResponse>) {
    let kind = match &payload {
        InvocationPayload::Message(_) => "message",
        InvocationPayload::Document(_) => "document",
    };
    info!(kind, "Received invocation");

    let payload = with_canonical_user_id(payload);

    match state.orchestrator.handle_turn(payload).await {
        Ok(turn) => (StatusCode::OK, Json(ApiResponse::success(turn))),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ApiResponse::error(format!("Turn failed: {}", e))),
        ),
    }
}

/// =============================
/// Router
/// =============================

pub fn create_router(orchestrator: Arc<Orchestrator>) -> Router {
    let state = ApiState { orchestrator };

    Router::new()
        .route("/health", axum::routing::get(health))
        .route("/api/invoke", post(invoke_handler))
        .with_state(state)
        .layer(CorsLayer::permissive())
}

/// =============================
/// Server Startup
/// =============================

pub async fn start_server(
    orchestrator: Arc<Orchestrator>,
    port: u16,
) -> std::result::Result<(), Box<dyn std::error::Error>> {
    let router = create_router(orchestrator);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?;

    info!("API Server listening on http://0.0.0.0:{}", port);
    info!("Local: http://127.0.0.1:{}", port);

    axum::serve(listener, router).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_user_id_is_stable() {
        let a = canonical_user_id(Some("cliente-42"));
        let b = canonical_user_id(Some("cliente-42"));
        assert_eq!(a, b);
        // A real UUID passes through unchanged.
        let uuid = "550e8400-e29b-41d4-a716-446655440000";
        assert_eq!(canonical_user_id(Some(uuid)), uuid);
        // Empty falls back to the anonymous id.
        assert_eq!(canonical_user_id(None), canonical_user_id(Some("  ")));
    }
}
