//! Formulários de impressão das marcas
//!
//! Valida os campos enviados pelos front-ends, gera o `cod_op`, grava o
//! formulário e, quando há Drive configurado, envia o PDF anexado.

use chrono::{Local, NaiveDate};
use once_cell::sync::Lazy;
use rand::Rng;
use regex::Regex;
use serde::Serialize;
use serde_json::json;

use crate::models::{
    Formulario, FormularioEntrada, FormularioPatch, LinksFormulario, Marca, NovaUnidade,
    NovoArquivo, NovoFormulario, COR_PADRAO, CORES_IMPRESSAO, FORMATOS, FORMATO_PADRAO,
    IMPRESSAO_PADRAO, TIPOS_IMPRESSAO, UNIDADES,
};
use crate::services::drive::{nome_pdf, DriveService};
use crate::storage::{FormularioStore, StoreError};
use crate::utils::logging::*;
use crate::utils::{AppError, AppResult};

/// Tentativas de gerar um `cod_op` livre antes de desistir
const MAX_TENTATIVAS_COD_OP: usize = 5;

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap());

/// PDF recebido no multipart
#[derive(Debug, Clone)]
pub struct ArquivoEnviado {
    pub nome_original: String,
    pub conteudo: Vec<u8>,
}

/// Resposta da criação de um formulário
#[derive(Debug, Clone, Serialize)]
pub struct FormularioCriado {
    pub detail: String,
    pub cod_op: String,
    pub link_download: Option<String>,
    pub formulario: Formulario,
}

/// `{prefixo}{AAAAMMDD}{4 dígitos}`
pub fn gerar_cod_op(marca: Marca, data: NaiveDate) -> String {
    let aleatorio: u16 = rand::thread_rng().gen_range(0..10_000);
    format!("{}{}{:04}", marca.prefixo(), data.format("%Y%m%d"), aleatorio)
}

fn parse_data(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(raw, "%d/%m/%Y"))
        .ok()
}

fn texto(valor: Option<String>) -> Option<String> {
    valor.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn escolha(valor: Option<String>, campo: &str, opcoes: &[&str], erros: &mut Vec<String>) -> Option<String> {
    let valor = texto(valor)?.to_uppercase();
    if opcoes.contains(&valor.as_str()) {
        Some(valor)
    } else {
        erros.push(format!("{}: '{}' inválido (opções: {})", campo, valor, opcoes.join(", ")));
        None
    }
}

fn validar_unidades(unidades: Vec<NovaUnidade>, erros: &mut Vec<String>) -> Vec<NovaUnidade> {
    unidades
        .into_iter()
        .enumerate()
        .filter_map(|(i, u)| {
            let nome = u.nome.trim().to_uppercase();
            let mut ok = true;
            if !UNIDADES.contains(&nome.as_str()) {
                erros.push(format!("unidades[{}].nome: '{}' não é uma unidade conhecida", i, u.nome));
                ok = false;
            }
            if u.quantidade <= 0 {
                erros.push(format!("unidades[{}].quantidade: deve ser maior que zero", i));
                ok = false;
            }
            ok.then_some(NovaUnidade {
                nome,
                quantidade: u.quantidade,
            })
        })
        .collect()
}

fn validar_email(email: &str, erros: &mut Vec<String>) {
    let valido = EMAIL_RE.is_match(email);
    if !valido {
        erros.push(format!("email: '{}' inválido", email));
    }
}

/// Valida um formulário novo, listando todos os problemas de uma vez
pub fn validar_entrada(marca: Marca, entrada: FormularioEntrada) -> Result<NovoFormulario, Vec<String>> {
    let mut erros = Vec::new();

    let mut obrigatorio = |valor: Option<String>, campo: &str| {
        texto(valor).unwrap_or_else(|| {
            erros.push(format!("{}: obrigatório", campo));
            String::new()
        })
    };
    let nome = obrigatorio(entrada.nome, "nome");
    let email = obrigatorio(entrada.email, "email");
    let unidade_nome = obrigatorio(entrada.unidade_nome, "unidade_nome");
    let titulo = obrigatorio(entrada.titulo, "titulo");
    let data_raw = obrigatorio(entrada.data_entrega, "data_entrega");

    if !email.is_empty() {
        validar_email(&email, &mut erros);
    }

    let data_entrega = if data_raw.is_empty() {
        None
    } else {
        let data = parse_data(&data_raw);
        if data.is_none() {
            erros.push(format!("data_entrega: '{}' não é uma data válida", data_raw));
        }
        data
    };

    if entrada.unidade_quantidade.is_some_and(|q| q <= 0) {
        erros.push("unidade_quantidade: deve ser maior que zero".to_string());
    }

    let formato = escolha(entrada.formato, "formato", &FORMATOS, &mut erros);
    let cor_impressao = escolha(entrada.cor_impressao, "cor_impressao", &CORES_IMPRESSAO, &mut erros);
    let impressao = escolha(entrada.impressao, "impressao", &TIPOS_IMPRESSAO, &mut erros);
    let unidades = validar_unidades(entrada.unidades.unwrap_or_default(), &mut erros);

    match data_entrega {
        Some(data_entrega) if erros.is_empty() => Ok(NovoFormulario {
            marca,
            nome,
            email,
            unidade_nome,
            unidade_quantidade: entrada.unidade_quantidade,
            titulo,
            data_entrega,
            observacoes: entrada.observacoes.map(|o| o.trim().to_string()).unwrap_or_default(),
            formato: formato.unwrap_or_else(|| FORMATO_PADRAO.to_string()),
            cor_impressao: cor_impressao.unwrap_or_else(|| COR_PADRAO.to_string()),
            impressao: impressao.unwrap_or_else(|| IMPRESSAO_PADRAO.to_string()),
            unidades,
        }),
        _ => Err(erros),
    }
}

/// Valida uma atualização parcial; campos ausentes ficam como estão
pub fn validar_patch(entrada: FormularioEntrada) -> Result<FormularioPatch, Vec<String>> {
    let mut erros = Vec::new();

    let email = texto(entrada.email);
    if let Some(email) = &email {
        validar_email(email, &mut erros);
    }

    let data_entrega = texto(entrada.data_entrega).and_then(|raw| {
        let data = parse_data(&raw);
        if data.is_none() {
            erros.push(format!("data_entrega: '{}' não é uma data válida", raw));
        }
        data
    });

    if entrada.unidade_quantidade.is_some_and(|q| q <= 0) {
        erros.push("unidade_quantidade: deve ser maior que zero".to_string());
    }

    let patch = FormularioPatch {
        nome: texto(entrada.nome),
        email,
        unidade_nome: texto(entrada.unidade_nome),
        unidade_quantidade: entrada.unidade_quantidade,
        titulo: texto(entrada.titulo),
        data_entrega,
        observacoes: entrada.observacoes.map(|o| o.trim().to_string()),
        formato: escolha(entrada.formato, "formato", &FORMATOS, &mut erros),
        cor_impressao: escolha(entrada.cor_impressao, "cor_impressao", &CORES_IMPRESSAO, &mut erros),
        impressao: escolha(entrada.impressao, "impressao", &TIPOS_IMPRESSAO, &mut erros),
        unidades: entrada.unidades.map(|u| validar_unidades(u, &mut erros)),
    };

    if erros.is_empty() {
        Ok(patch)
    } else {
        Err(erros)
    }
}

fn erro_validacao(erros: Vec<String>) -> AppError {
    log_validation_error("formulario", &erros.join("; "));
    AppError::ValidationError(format!("Dados inválidos: {}", erros.join("; ")))
}

/// Cria o formulário e envia os PDFs anexados
pub async fn criar(
    store: &dyn FormularioStore,
    drive: Option<&DriveService>,
    marca: Marca,
    entrada: FormularioEntrada,
    arquivos: Vec<ArquivoEnviado>,
) -> AppResult<FormularioCriado> {
    let novo = validar_entrada(marca, entrada).map_err(erro_validacao)?;
    let hoje = Local::now().date_naive();

    let mut formulario = None;
    for tentativa in 1..=MAX_TENTATIVAS_COD_OP {
        let cod_op = gerar_cod_op(marca, hoje);
        match store.create_formulario(novo.clone(), &cod_op).await {
            Ok(f) => {
                formulario = Some(f);
                break;
            }
            Err(StoreError::Duplicate(_)) => {
                log_warning(&format!("cod_op {} já existe (tentativa {})", cod_op, tentativa));
            }
            Err(e) => return Err(e.into()),
        }
    }
    let formulario = formulario.ok_or_else(|| {
        AppError::InternalError("Não foi possível gerar um cod_op livre".to_string())
    })?;
    log_formulario_created(marca.pasta(), &formulario.cod_op);

    anexar_pdfs(store, drive, marca, &formulario, arquivos).await?;
    let formulario = store.get_formulario(marca, &formulario.cod_op).await?;

    Ok(FormularioCriado {
        detail: "Formulário criado com sucesso".to_string(),
        cod_op: formulario.cod_op.clone(),
        link_download: formulario.link_download.clone(),
        formulario,
    })
}

/// Atualização parcial; um novo PDF substitui os links principais
pub async fn atualizar(
    store: &dyn FormularioStore,
    drive: Option<&DriveService>,
    marca: Marca,
    cod_op: &str,
    entrada: FormularioEntrada,
    arquivos: Vec<ArquivoEnviado>,
) -> AppResult<Formulario> {
    let patch = validar_patch(entrada).map_err(erro_validacao)?;
    let formulario = store.update_formulario(marca, cod_op, patch).await?;

    anexar_pdfs(store, drive, marca, &formulario, arquivos).await?;
    Ok(store.get_formulario(marca, cod_op).await?)
}

/// Resumo gravado em `json_link`
pub fn resumo_json(formulario: &Formulario, link_pdf: Option<&str>) -> String {
    json!({
        "cod_op": formulario.cod_op,
        "nome": formulario.nome,
        "email": formulario.email,
        "unidade": formulario.unidade_nome,
        "titulo": formulario.titulo,
        "data_entrega": formulario.data_entrega.format("%Y-%m-%d").to_string(),
        "link_pdf": link_pdf,
    })
    .to_string()
}

/// Envia cada PDF ao Drive e registra os links
///
/// Sem Drive configurado, ou se o envio falhar, o formulário fica sem links
/// e o erro vai só para o log.
async fn anexar_pdfs(
    store: &dyn FormularioStore,
    drive: Option<&DriveService>,
    marca: Marca,
    formulario: &Formulario,
    arquivos: Vec<ArquivoEnviado>,
) -> AppResult<()> {
    if arquivos.is_empty() {
        return Ok(());
    }

    let Some(drive) = drive else {
        log_warning(&format!(
            "⚠️ Google Drive não configurado - {} PDF(s) do formulário {} não foram enviados",
            arquivos.len(),
            formulario.cod_op
        ));
        return Ok(());
    };

    let total = arquivos.len();
    for (i, arquivo) in arquivos.into_iter().enumerate() {
        // Arquivos extras recebem sufixo para não colidir no Drive
        let cod_arquivo = if i == 0 {
            formulario.cod_op.clone()
        } else {
            format!("{}_{}", formulario.cod_op, i + 1)
        };

        let enviado = match drive.enviar_pdf(marca, &cod_arquivo, arquivo.conteudo).await {
            Ok(f) => f,
            Err(e) => {
                log_drive_error(&format!("upload de '{}'", arquivo.nome_original), &e.to_string());
                continue;
            }
        };

        let link = enviado.web_view_link.clone();
        let resumo = resumo_json(formulario, link.as_deref());

        if i == 0 {
            store
                .set_links(
                    formulario.id,
                    LinksFormulario {
                        link_download: link.clone(),
                        web_view_link: link.clone(),
                        json_link: Some(resumo.clone()),
                    },
                )
                .await?;
        }

        store
            .add_arquivo(
                formulario.id,
                NovoArquivo {
                    nome: nome_pdf(marca, &cod_arquivo),
                    link_download: link.clone(),
                    web_view_link: link,
                    json_link: Some(resumo),
                },
            )
            .await?;
    }

    log_info(&format!("{} PDF(s) processado(s) para {}", total, formulario.cod_op));
    Ok(())
}
