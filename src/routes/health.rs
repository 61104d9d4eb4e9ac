use axum::Json;
use chrono::Utc;
use serde_json::{json, Value};

/// Health check endpoint (liveness)
pub async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "service": "vos-gateway",
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": Utc::now().to_rfc3339(),
    }))
}
