use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

use crate::models::{NovoStatus, Pagina, Pedido, PedidoFiltro, StatusPedido, WebhookStatusEnviado};
use crate::services::{ItemLote, ResultadoEnvio};
use crate::utils::logging::*;
use crate::utils::{AppError, AppJson, AppPath, AppQuery, AppResult};
use crate::AppState;

/// GET /api/pedidos/
pub async fn listar_pedidos(
    State(state): State<Arc<AppState>>,
    AppQuery(filtro): AppQuery<PedidoFiltro>,
) -> AppResult<Json<Pagina<Pedido>>> {
    log_request_received("/api/pedidos/", "GET");
    Ok(Json(state.pedidos.list_pedidos(&filtro).await?))
}

/// GET /api/pedidos/:id/
pub async fn obter_pedido(
    State(state): State<Arc<AppState>>,
    AppPath(id): AppPath<i64>,
) -> AppResult<Json<Pedido>> {
    log_request_received("/api/pedidos/:id/", "GET");
    Ok(Json(state.pedidos.get_pedido(id).await?))
}

#[derive(Debug, Deserialize)]
pub struct AlterarStatus {
    pub status_id: i64,
}

/// PATCH /api/pedidos/:id/status/
///
/// 200 quando todos os endpoints confirmaram e o status foi gravado;
/// 502 quando algum envio falhou (status mantido, auditoria gravada).
pub async fn alterar_status(
    State(state): State<Arc<AppState>>,
    AppPath(id): AppPath<i64>,
    AppJson(body): AppJson<AlterarStatus>,
) -> AppResult<Response> {
    log_request_received("/api/pedidos/:id/status/", "PATCH");

    let r = state
        .dispatcher
        .atualizar_status(state.pedidos.as_ref(), id, body.status_id)
        .await?;

    if r.aplicado {
        return Ok(Json(r).into_response());
    }

    let corpo = json!({
        "error": format!(
            "Status não alterado: {} de {} envio(s) falharam",
            r.envio.falhas, r.envio.total
        ),
        "status": StatusCode::BAD_GATEWAY.as_u16(),
        "pedido": r.pedido,
        "envio": r.envio,
    });
    Ok((StatusCode::BAD_GATEWAY, Json(corpo)).into_response())
}

#[derive(Debug, Deserialize)]
pub struct AlterarStatusLote {
    pub pedido_ids: Vec<i64>,
    pub status_id: i64,
}

/// POST /api/pedidos/status/lote/
pub async fn alterar_status_lote(
    State(state): State<Arc<AppState>>,
    AppJson(body): AppJson<AlterarStatusLote>,
) -> AppResult<Json<Vec<ItemLote>>> {
    log_request_received("/api/pedidos/status/lote/", "POST");

    if body.pedido_ids.is_empty() {
        return Err(AppError::ValidationError("pedido_ids: informe ao menos um pedido".to_string()));
    }

    let itens = state
        .dispatcher
        .atualizar_lote(state.pedidos.as_ref(), &body.pedido_ids, body.status_id)
        .await?;

    let aplicados = itens.iter().filter(|i| i.aplicado).count();
    log_info(&format!("📦 Lote: {} de {} pedido(s) atualizados", aplicados, itens.len()));
    Ok(Json(itens))
}

/// POST /api/pedidos/:id/reenviar/
pub async fn reenviar_status(
    State(state): State<Arc<AppState>>,
    AppPath(id): AppPath<i64>,
) -> AppResult<Json<ResultadoEnvio>> {
    log_request_received("/api/pedidos/:id/reenviar/", "POST");
    let r = state.dispatcher.reenviar(state.pedidos.as_ref(), id).await?;
    Ok(Json(r))
}

/// GET /api/pedidos/:id/envios/
pub async fn listar_envios(
    State(state): State<Arc<AppState>>,
    AppPath(id): AppPath<i64>,
) -> AppResult<Json<Vec<WebhookStatusEnviado>>> {
    log_request_received("/api/pedidos/:id/envios/", "GET");
    // 404 para pedido inexistente, em vez de lista vazia
    state.pedidos.get_pedido(id).await?;
    Ok(Json(state.pedidos.list_envios(id).await?))
}

/// GET /api/status/
pub async fn listar_status(State(state): State<Arc<AppState>>) -> AppResult<Json<Vec<StatusPedido>>> {
    log_request_received("/api/status/", "GET");
    Ok(Json(state.pedidos.list_status(true).await?))
}

/// POST /api/status/
pub async fn criar_status(
    State(state): State<Arc<AppState>>,
    AppJson(novo): AppJson<NovoStatus>,
) -> AppResult<(StatusCode, Json<StatusPedido>)> {
    log_request_received("/api/status/", "POST");

    if novo.nome.trim().is_empty() {
        return Err(AppError::ValidationError("nome: obrigatório".to_string()));
    }

    let status = state.pedidos.create_status(novo).await?;
    Ok((StatusCode::CREATED, Json(status)))
}
