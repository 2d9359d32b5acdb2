/// Middleware de autenticação para as rotas administrativas
///
/// Valida que a requisição contém a chave configurada em `admin.api_key`
/// (variável `ADMIN_API_KEY`) no header X-Admin-Key. Protege a gestão de
/// pedidos, status, endpoints de envio e secrets de webhook.

use axum::{
    extract::{Request, State},
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::sync::Arc;

use crate::AppState;

pub const ADMIN_KEY_HEADER: &str = "X-Admin-Key";

/// Middleware que requer a chave de administração
///
/// # Uso na requisição
///
/// ```bash
/// curl -H "X-Admin-Key: sua-chave" http://localhost:8080/api/pedidos/
/// ```
///
/// # Respostas
///
/// - Chave válida: segue para o handler
/// - **401 Unauthorized**: chave ausente ou inválida
/// - **503 Service Unavailable**: produção sem `ADMIN_API_KEY`
///
/// Em desenvolvimento, sem `ADMIN_API_KEY` configurado, o acesso é liberado
/// com warning no log.
pub async fn require_admin_key(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    request: Request,
    next: Next,
) -> Result<Response, Response> {
    let provided_key = headers
        .get(ADMIN_KEY_HEADER)
        .and_then(|v| v.to_str().ok());

    let admin = &state.settings.admin;
    let expected_key = admin.api_key.as_deref().filter(|k| !k.is_empty());

    match (expected_key, provided_key, admin.producao) {
        (Some(expected), Some(provided), _) if expected == provided => {
            tracing::debug!("✅ Admin access granted");
            Ok(next.run(request).await)
        }

        (Some(_), provided, _) => {
            tracing::warn!(
                "❌ Admin access denied - Invalid or missing X-Admin-Key: {:?}",
                provided.map(|_| "<redacted>")
            );
            Err(unauthorized_response())
        }

        (None, _, false) => {
            tracing::warn!(
                "⚠️  ADMIN_API_KEY not configured - Allowing access in development mode. \
                 Configure ADMIN_API_KEY in production!"
            );
            Ok(next.run(request).await)
        }

        (None, _, true) => {
            tracing::error!("🚨 ADMIN_API_KEY not configured in production! Blocking admin access.");
            Err(service_unavailable_response())
        }
    }
}

fn unauthorized_response() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({
            "error": "Chave de administração ausente ou inválida",
            "status": 401
        })),
    )
        .into_response()
}

fn service_unavailable_response() -> Response {
    (
        StatusCode::SERVICE_UNAVAILABLE,
        Json(json!({
            "error": "ADMIN_API_KEY não configurado no servidor",
            "status": 503
        })),
    )
        .into_response()
}
