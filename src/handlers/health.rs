use axum::{
    extract::State,
    http::StatusCode,
    response::Json,
};
use serde_json::{json, Value};
use std::sync::Arc;

use crate::utils::logging::*;
use crate::AppState;

pub async fn health_check() -> Json<Value> {
    log_health_check();

    Json(json!({
        "status": "healthy",
        "service": "cdg-producao",
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

pub async fn ready_check(State(state): State<Arc<AppState>>) -> (StatusCode, Json<Value>) {
    log_health_check();

    let storage_status = match state.pedidos.ping().await {
        Ok(_) => "connected",
        Err(e) => {
            log_error(&format!("Storage indisponível: {}", e));
            "disconnected"
        }
    };
    let storage_kind = if state.settings.database.url.is_some() {
        "postgres"
    } else {
        "memory"
    };

    let ready = storage_status == "connected";

    let response = json!({
        "ready": ready,
        "service": "cdg-producao",
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "dependencies": {
            "storage": {
                "status": storage_status,
                "kind": storage_kind
            },
            "google_drive": {
                "status": if state.drive.is_some() { "configured" } else { "not_configured" }
            }
        }
    });

    let code = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (code, Json(response))
}
