//! Montagem do router
//!
//! Rotas públicas: health, recebimento de webhooks e formulários das marcas.
//! Rotas administrativas (`/api/pedidos`, `/api/status`, gestão de webhooks)
//! passam pelo middleware de `X-Admin-Key`.

use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, patch, post},
    Extension, Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::handlers::*;
use crate::middleware::require_admin_key;
use crate::models::Marca;
use crate::AppState;

pub fn build_router(state: Arc<AppState>) -> Router {
    let admin = Router::new()
        .route("/api/pedidos/", get(listar_pedidos))
        .route("/api/pedidos/status/lote/", post(alterar_status_lote))
        .route("/api/pedidos/:id/", get(obter_pedido))
        .route("/api/pedidos/:id/status/", patch(alterar_status))
        .route("/api/pedidos/:id/reenviar/", post(reenviar_status))
        .route("/api/pedidos/:id/envios/", get(listar_envios))
        .route("/api/status/", get(listar_status).post(criar_status))
        .route("/api/webhooks/endpoints/", get(listar_endpoints).post(criar_endpoint))
        .route(
            "/api/webhooks/endpoints/:id/",
            patch(atualizar_endpoint).delete(remover_endpoint),
        )
        .route(
            "/api/webhooks/configuracoes/",
            get(listar_configuracoes).post(criar_configuracao),
        )
        .route("/api/webhooks/recebidos/", get(listar_recebidos))
        .route("/api/webhooks/enviar/", post(enviar_webhook))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_admin_key));

    let mut formularios = Router::new();
    for marca in Marca::TODAS {
        let slug = marca.slug();
        formularios = formularios.merge(
            Router::new()
                .route(
                    &format!("/{}/", slug),
                    get(listar_formularios).post(criar_formulario),
                )
                .route(
                    &format!("/{}/:cod_op/", slug),
                    get(obter_formulario)
                        .put(atualizar_formulario)
                        .delete(remover_formulario),
                )
                .layer(Extension(marca)),
        );
    }
    let formularios = formularios.layer(DefaultBodyLimit::max(LIMITE_CORPO_BYTES));

    Router::new()
        .route("/health", get(health_check))
        .route("/ready", get(ready_check))
        .route("/api/webhooks/receber/", post(receber_webhook))
        .merge(formularios)
        .merge(admin)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
