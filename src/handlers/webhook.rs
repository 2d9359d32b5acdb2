use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Json, Response},
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::time::Instant;

use crate::models::{NovoWebhookConfig, Pedido, Webhook, WebhookConfig};
use crate::services::{signature::SIGNATURE_HEADERS, webhook_ingest};
use crate::utils::logging::*;
use crate::utils::{AppError, AppJson, AppQuery, AppResult};
use crate::AppState;

const ROTA_RECEBER: &str = "/api/webhooks/receber/";

fn assinatura(headers: &HeaderMap) -> Option<&str> {
    SIGNATURE_HEADERS
        .iter()
        .find_map(|name| headers.get(*name).and_then(|v| v.to_str().ok()))
}

/// POST /api/webhooks/receber/
pub async fn receber_webhook(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> AppResult<(StatusCode, Json<Pedido>)> {
    let start_time = Instant::now();
    log_request_received(ROTA_RECEBER, "POST");

    let resultado = webhook_ingest::receber_pedido(
        state.pedidos.as_ref(),
        &state.settings.webhook,
        &body,
        assinatura(&headers),
    )
    .await;

    let status = match &resultado {
        Ok(_) => StatusCode::CREATED,
        Err(e) => e.status_code(),
    };
    log_request_processed(ROTA_RECEBER, status.as_u16(), start_time.elapsed().as_millis() as u64);

    Ok((StatusCode::CREATED, Json(resultado?)))
}

#[derive(Debug, Deserialize)]
pub struct RecebidosQuery {
    pub limit: Option<u32>,
}

/// GET /api/webhooks/recebidos/
pub async fn listar_recebidos(
    State(state): State<Arc<AppState>>,
    AppQuery(query): AppQuery<RecebidosQuery>,
) -> AppResult<Json<Vec<Webhook>>> {
    log_request_received("/api/webhooks/recebidos/", "GET");
    let limit = query.limit.unwrap_or(50).clamp(1, 500);
    Ok(Json(state.pedidos.list_webhooks(limit).await?))
}

/// GET /api/webhooks/configuracoes/
pub async fn listar_configuracoes(
    State(state): State<Arc<AppState>>,
) -> AppResult<Json<Vec<WebhookConfig>>> {
    log_request_received("/api/webhooks/configuracoes/", "GET");
    Ok(Json(state.pedidos.list_webhook_configs().await?))
}

/// POST /api/webhooks/configuracoes/
pub async fn criar_configuracao(
    State(state): State<Arc<AppState>>,
    AppJson(config): AppJson<NovoWebhookConfig>,
) -> AppResult<(StatusCode, Json<WebhookConfig>)> {
    log_request_received("/api/webhooks/configuracoes/", "POST");

    if config.secret_key.trim().is_empty() {
        log_validation_error("secret_key", "vazio");
        return Err(AppError::ValidationError("secret_key: obrigatório".to_string()));
    }

    let criada = state.pedidos.create_webhook_config(config).await?;
    log_info(&format!("🔑 Novo secret de webhook #{} cadastrado", criada.id));
    Ok((StatusCode::CREATED, Json(criada)))
}

#[derive(Debug, Deserialize)]
pub struct EnvioManual {
    pub pedido_id: i64,
    pub status: String,
    pub payload: Value,
    #[serde(default)]
    pub endpoint_id: Option<i64>,
}

/// POST /api/webhooks/enviar/
///
/// Envia um corpo livre para um endpoint (ou o primeiro ativo). 200 com o
/// registro do envio; 502 quando o endpoint não confirmou.
pub async fn enviar_webhook(
    State(state): State<Arc<AppState>>,
    AppJson(envio): AppJson<EnvioManual>,
) -> AppResult<Response> {
    log_request_received("/api/webhooks/enviar/", "POST");

    let status = envio.status.trim();
    if status.is_empty() || envio.payload.is_null() {
        return Err(AppError::ValidationError(
            "Os campos pedido_id, status e payload são obrigatórios".to_string(),
        ));
    }

    let registro = state
        .dispatcher
        .enviar_manual(
            state.pedidos.as_ref(),
            envio.pedido_id,
            status,
            &envio.payload,
            envio.endpoint_id,
        )
        .await?;

    if registro.sucesso {
        return Ok(Json(registro).into_response());
    }

    let corpo = json!({
        "error": "Falha ao enviar webhook",
        "status": StatusCode::BAD_GATEWAY.as_u16(),
        "envio": registro,
    });
    Ok((StatusCode::BAD_GATEWAY, Json(corpo)).into_response())
}
