use axum::{
    body::Body,
    extract::{FromRequest, Multipart, Request, State},
    http::{header::CONTENT_TYPE, StatusCode},
    response::Json,
    Extension,
};
use serde_json::{Map, Value};
use std::sync::Arc;
use tokio::time::Instant;

use crate::models::{Formulario, FormularioEntrada, Marca};
use crate::services::formularios::{self, ArquivoEnviado, FormularioCriado};
use crate::utils::logging::*;
use crate::utils::{AppError, AppPath, AppResult};
use crate::AppState;

/// Limite do corpo nas rotas de formulário (PDFs anexados)
pub const LIMITE_CORPO_BYTES: usize = 25 * 1024 * 1024;

const CAMPO_ARQUIVO: &str = "arquivo";

/// POST /{marca}/
pub async fn criar_formulario(
    State(state): State<Arc<AppState>>,
    Extension(marca): Extension<Marca>,
    request: Request<Body>,
) -> AppResult<(StatusCode, Json<FormularioCriado>)> {
    let start_time = Instant::now();
    let rota = format!("/{}/", marca.slug());
    log_request_received(&rota, "POST");

    let (entrada, arquivos) = ler_entrada(&state, request).await?;
    let criado = formularios::criar(
        state.formularios.as_ref(),
        state.drive.as_ref(),
        marca,
        entrada,
        arquivos,
    )
    .await?;

    log_request_processed(&rota, 201, start_time.elapsed().as_millis() as u64);
    Ok((StatusCode::CREATED, Json(criado)))
}

/// GET /{marca}/
pub async fn listar_formularios(
    State(state): State<Arc<AppState>>,
    Extension(marca): Extension<Marca>,
) -> AppResult<Json<Vec<Formulario>>> {
    log_request_received(&format!("/{}/", marca.slug()), "GET");
    Ok(Json(state.formularios.list_formularios(marca).await?))
}

/// GET /{marca}/:cod_op/
pub async fn obter_formulario(
    State(state): State<Arc<AppState>>,
    Extension(marca): Extension<Marca>,
    AppPath(cod_op): AppPath<String>,
) -> AppResult<Json<Formulario>> {
    log_request_received(&format!("/{}/{}/", marca.slug(), cod_op), "GET");
    Ok(Json(state.formularios.get_formulario(marca, &cod_op).await?))
}

/// PUT /{marca}/:cod_op/
pub async fn atualizar_formulario(
    State(state): State<Arc<AppState>>,
    Extension(marca): Extension<Marca>,
    AppPath(cod_op): AppPath<String>,
    request: Request<Body>,
) -> AppResult<Json<Formulario>> {
    log_request_received(&format!("/{}/{}/", marca.slug(), cod_op), "PUT");

    let (entrada, arquivos) = ler_entrada(&state, request).await?;
    let formulario = formularios::atualizar(
        state.formularios.as_ref(),
        state.drive.as_ref(),
        marca,
        &cod_op,
        entrada,
        arquivos,
    )
    .await?;

    Ok(Json(formulario))
}

/// DELETE /{marca}/:cod_op/
pub async fn remover_formulario(
    State(state): State<Arc<AppState>>,
    Extension(marca): Extension<Marca>,
    AppPath(cod_op): AppPath<String>,
) -> AppResult<StatusCode> {
    log_request_received(&format!("/{}/{}/", marca.slug(), cod_op), "DELETE");
    state.formularios.delete_formulario(marca, &cod_op).await?;
    log_info(&format!("🗑️ Formulário {} removido", cod_op));
    Ok(StatusCode::NO_CONTENT)
}

// ============================================================================
// Leitura do corpo (multipart ou JSON)
// ============================================================================

async fn ler_entrada(
    state: &Arc<AppState>,
    request: Request<Body>,
) -> AppResult<(FormularioEntrada, Vec<ArquivoEnviado>)> {
    let is_multipart = request
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.starts_with("multipart/form-data"));

    if is_multipart {
        let multipart = Multipart::from_request(request, state)
            .await
            .map_err(|e| AppError::ValidationError(format!("Multipart inválido: {}", e)))?;
        return ler_multipart(multipart).await;
    }

    let bytes = axum::body::to_bytes(request.into_body(), LIMITE_CORPO_BYTES)
        .await
        .map_err(|e| AppError::ValidationError(format!("Falha ao ler o corpo: {}", e)))?;

    if bytes.is_empty() {
        return Ok((FormularioEntrada::default(), Vec::new()));
    }

    let campos: Map<String, Value> = serde_json::from_slice(&bytes)
        .map_err(|e| AppError::ValidationError(format!("JSON inválido: {}", e)))?;
    Ok((entrada_de_campos(campos)?, Vec::new()))
}

async fn ler_multipart(mut multipart: Multipart) -> AppResult<(FormularioEntrada, Vec<ArquivoEnviado>)> {
    let mut campos = Map::new();
    let mut arquivos = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::ValidationError(format!("Multipart inválido: {}", e)))?
    {
        let nome = field.name().unwrap_or_default().to_string();

        if let Some(nome_arquivo) = field.file_name().map(str::to_string) {
            if nome != CAMPO_ARQUIVO {
                log_warning(&format!("Arquivo no campo '{}' ignorado", nome));
                continue;
            }
            let content_type = field.content_type().unwrap_or_default().to_string();
            let conteudo = field
                .bytes()
                .await
                .map_err(|e| AppError::ValidationError(format!("Falha ao ler '{}': {}", nome_arquivo, e)))?;

            if conteudo.is_empty() {
                continue;
            }
            if !eh_pdf(&nome_arquivo, &content_type) {
                return Err(AppError::ValidationError(format!(
                    "arquivo: '{}' não é um PDF",
                    nome_arquivo
                )));
            }
            arquivos.push(ArquivoEnviado {
                nome_original: nome_arquivo,
                conteudo: conteudo.to_vec(),
            });
            continue;
        }

        let valor = field
            .text()
            .await
            .map_err(|e| AppError::ValidationError(format!("Campo '{}' inválido: {}", nome, e)))?;
        campos.insert(nome, Value::String(valor));
    }

    Ok((entrada_de_campos(campos)?, arquivos))
}

fn eh_pdf(nome_arquivo: &str, content_type: &str) -> bool {
    content_type == "application/pdf" || nome_arquivo.to_lowercase().ends_with(".pdf")
}

/// Converte os campos crus (JSON ou texto do multipart) em `FormularioEntrada`
///
/// `unidades` pode chegar como string JSON e `unidade_quantidade` como texto.
fn entrada_de_campos(mut campos: Map<String, Value>) -> AppResult<FormularioEntrada> {
    if let Some(Value::String(raw)) = campos.get("unidades") {
        let valor = if raw.trim().is_empty() {
            Value::Null
        } else {
            serde_json::from_str(raw)
                .map_err(|e| AppError::ValidationError(format!("unidades: JSON inválido ({})", e)))?
        };
        campos.insert("unidades".to_string(), valor);
    }

    if let Some(Value::String(raw)) = campos.get("unidade_quantidade") {
        let valor = if raw.trim().is_empty() {
            Value::Null
        } else {
            let n: i64 = raw.trim().parse().map_err(|_| {
                AppError::ValidationError(format!("unidade_quantidade: '{}' não é um número", raw))
            })?;
            Value::from(n)
        };
        campos.insert("unidade_quantidade".to_string(), valor);
    }

    // Campos somente leitura não fazem parte de FormularioEntrada
    serde_json::from_value(Value::Object(campos))
        .map_err(|e| AppError::ValidationError(format!("Dados inválidos: {}", e)))
}
