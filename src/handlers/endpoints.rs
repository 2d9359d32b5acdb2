use axum::{
    extract::State,
    http::StatusCode,
    response::Json,
};
use serde_json::Value;
use std::sync::Arc;

use crate::models::{DadosEndpoint, EndpointPatch, NovoEndpoint, WebhookEndpointConfig};
use crate::utils::logging::*;
use crate::utils::{non_empty, AppError, AppJson, AppPath, AppResult};
use crate::AppState;

/// Aceita objeto JSON ou string contendo um objeto JSON; guarda como texto
fn normalizar_headers(valor: Option<Value>) -> AppResult<Option<String>> {
    let objeto = match valor {
        None | Some(Value::Null) => return Ok(None),
        Some(Value::String(s)) if s.trim().is_empty() => return Ok(None),
        Some(Value::String(s)) => serde_json::from_str::<Value>(&s).map_err(|e| {
            AppError::ValidationError(format!("headers_adicionais: JSON inválido ({})", e))
        })?,
        Some(outro) => outro,
    };

    if !objeto.is_object() {
        return Err(AppError::ValidationError(
            "headers_adicionais: deve ser um objeto JSON".to_string(),
        ));
    }
    Ok(Some(objeto.to_string()))
}

fn validar_url(url: &str) -> AppResult<()> {
    if url.starts_with("http://") || url.starts_with("https://") {
        Ok(())
    } else {
        log_validation_error("url", url);
        Err(AppError::ValidationError(format!("url: '{}' deve começar com http:// ou https://", url)))
    }
}

/// GET /api/webhooks/endpoints/
pub async fn listar_endpoints(
    State(state): State<Arc<AppState>>,
) -> AppResult<Json<Vec<WebhookEndpointConfig>>> {
    log_request_received("/api/webhooks/endpoints/", "GET");
    Ok(Json(state.pedidos.list_endpoints().await?))
}

/// POST /api/webhooks/endpoints/
pub async fn criar_endpoint(
    State(state): State<Arc<AppState>>,
    AppJson(novo): AppJson<NovoEndpoint>,
) -> AppResult<(StatusCode, Json<WebhookEndpointConfig>)> {
    log_request_received("/api/webhooks/endpoints/", "POST");

    let nome = novo.nome.trim().to_string();
    if nome.is_empty() {
        return Err(AppError::ValidationError("nome: obrigatório".to_string()));
    }
    let url = novo.url.trim().to_string();
    validar_url(&url)?;

    let dados = DadosEndpoint {
        nome,
        url,
        ativo: novo.ativo,
        auto_enviar: novo.auto_enviar,
        access_token: non_empty(novo.access_token),
        token_autenticacao: non_empty(novo.token_autenticacao),
        headers_adicionais: normalizar_headers(novo.headers_adicionais)?,
    };

    let endpoint = state.pedidos.create_endpoint(dados).await?;
    log_info(&format!("🔗 Endpoint '{}' cadastrado ({})", endpoint.nome, endpoint.url));
    Ok((StatusCode::CREATED, Json(endpoint)))
}

/// PATCH /api/webhooks/endpoints/:id/
pub async fn atualizar_endpoint(
    State(state): State<Arc<AppState>>,
    AppPath(id): AppPath<i64>,
    AppJson(patch): AppJson<EndpointPatch>,
) -> AppResult<Json<WebhookEndpointConfig>> {
    log_request_received("/api/webhooks/endpoints/:id/", "PATCH");

    let atual = state.pedidos.get_endpoint(id).await?;
    let mut dados = DadosEndpoint::from(&atual);

    if let Some(nome) = patch.nome.map(|n| n.trim().to_string()) {
        if nome.is_empty() {
            return Err(AppError::ValidationError("nome: não pode ser vazio".to_string()));
        }
        dados.nome = nome;
    }
    if let Some(url) = patch.url.map(|u| u.trim().to_string()) {
        validar_url(&url)?;
        dados.url = url;
    }
    if let Some(ativo) = patch.ativo {
        dados.ativo = ativo;
    }
    if let Some(auto_enviar) = patch.auto_enviar {
        dados.auto_enviar = auto_enviar;
    }
    // String vazia limpa o valor
    if patch.access_token.is_some() {
        dados.access_token = non_empty(patch.access_token);
    }
    if patch.token_autenticacao.is_some() {
        dados.token_autenticacao = non_empty(patch.token_autenticacao);
    }
    if patch.headers_adicionais.is_some() {
        dados.headers_adicionais = normalizar_headers(patch.headers_adicionais)?;
    }

    Ok(Json(state.pedidos.update_endpoint(id, dados).await?))
}

/// DELETE /api/webhooks/endpoints/:id/
pub async fn remover_endpoint(
    State(state): State<Arc<AppState>>,
    AppPath(id): AppPath<i64>,
) -> AppResult<StatusCode> {
    log_request_received("/api/webhooks/endpoints/:id/", "DELETE");
    state.pedidos.delete_endpoint(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_normalizar_headers() {
        assert_eq!(normalizar_headers(None).unwrap(), None);
        assert_eq!(normalizar_headers(Some(json!(""))).unwrap(), None);
        assert_eq!(
            normalizar_headers(Some(json!({"X-A": "1"}))).unwrap().as_deref(),
            Some(r#"{"X-A":"1"}"#)
        );
        assert_eq!(
            normalizar_headers(Some(json!(r#"{"X-A": "1"}"#))).unwrap().as_deref(),
            Some(r#"{"X-A":"1"}"#)
        );
        assert!(normalizar_headers(Some(json!([1, 2]))).is_err());
        assert!(normalizar_headers(Some(json!("{oops"))).is_err());
    }
}
