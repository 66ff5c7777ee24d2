use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::{json, Value};

use crate::AppState;

/// GET / - Service description
pub async fn root() -> Json<Value> {
    let version = env!("CARGO_PKG_VERSION");

    Json(json!({
        "name": "Address Book API",
        "version": version,
        "description": "Postal addresses shared between authenticated users",
        "endpoints": {
            "home": "/ (public)",
            "health": "/health (public)",
            "token": "/api-token-auth (public - token acquisition)",
            "session": "/api-auth/login, /api-auth/logout",
            "register": "/auth/register (public, when enabled)",
            "auth": "/api/v1/auth/whoami, /api/v1/auth/account (protected)",
            "addressbook": "/api/v1/addressbook[/:id], /api/v1/addressbook/batch?ids= (protected)",
        }
    }))
}

/// GET /health - Database ping; 503 when the database is unreachable
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let now = chrono::Utc::now();

    match state.db.health_check().await {
        Ok(_) => (
            StatusCode::OK,
            Json(json!({
                "status": "ok",
                "timestamp": now,
                "database": "ok"
            })),
        ),
        Err(e) => {
            tracing::warn!("Health check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "status": "degraded",
                    "timestamp": now,
                    "database": "unavailable"
                })),
            )
        }
    }
}
