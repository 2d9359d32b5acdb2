use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::types::Json;

/// Status atribuído a todo pedido recém recebido
pub const STATUS_INICIAL: &str = "Pedido Novo";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, sqlx::FromRow)]
pub struct StatusPedido {
    pub id: i64,
    pub nome: String,
    pub descricao: Option<String>,
    pub cor_css: String,
    pub ordem: i32,
    pub ativo: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NovoStatus {
    pub nome: String,
    #[serde(default)]
    pub descricao: Option<String>,
    #[serde(default = "cor_padrao")]
    pub cor_css: String,
    #[serde(default)]
    pub ordem: i32,
    #[serde(default = "ativo_padrao")]
    pub ativo: bool,
}

fn cor_padrao() -> String {
    "#3498db".to_string()
}

fn ativo_padrao() -> bool {
    true
}

impl NovoStatus {
    pub fn inicial() -> Self {
        Self {
            nome: STATUS_INICIAL.to_string(),
            descricao: Some("Pedido recém recebido via webhook".to_string()),
            cor_css: cor_padrao(),
            ordem: 1,
            ativo: true,
        }
    }
}

// ============================================================================
// Estrutura do pedido
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Designs {
    pub capa_frente: String,
    #[serde(default)]
    pub capa_verso: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Mockups {
    pub capa_frente: String,
    #[serde(default)]
    pub capa_costas: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Produto {
    pub nome: String,
    pub sku: String,
    pub quantidade: i32,
    #[serde(default)]
    pub id_sku: Option<String>,
    #[serde(default)]
    pub arquivo_pdf: Option<String>,
    pub designs: Designs,
    pub mockups: Mockups,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EnderecoEnvio {
    pub nome_destinatario: String,
    pub endereco: String,
    pub numero: String,
    #[serde(default)]
    pub complemento: Option<String>,
    pub cidade: String,
    pub uf: String,
    pub cep: String,
    pub bairro: String,
    pub telefone: String,
    pub pais: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InformacoesAdicionais {
    pub nome: String,
    pub telefone: String,
    pub email: String,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Pedido {
    pub id: i64,
    pub numero_pedido: String,
    pub titulo: String,
    pub valor_pedido: Decimal,
    pub custo_envio: Option<Decimal>,
    pub etiqueta_envio: Option<String>,
    pub metodo_envio: Option<String>,
    pub nome_cliente: String,
    pub documento_cliente: String,
    pub email_cliente: String,
    pub produtos: Json<Vec<Produto>>,
    pub endereco_envio: Json<EnderecoEnvio>,
    pub informacoes_adicionais: Json<InformacoesAdicionais>,
    pub status_id: i64,
    pub status_nome: String,
    pub webhook_id: Option<i64>,
    pub criado_em: DateTime<Utc>,
    pub atualizado_em: DateTime<Utc>,
}

/// Pedido validado, pronto para ser gravado
#[derive(Debug, Clone, PartialEq)]
pub struct NovoPedido {
    pub numero_pedido: String,
    pub titulo: String,
    pub valor_pedido: Decimal,
    pub custo_envio: Option<Decimal>,
    pub etiqueta_envio: Option<String>,
    pub metodo_envio: Option<String>,
    pub nome_cliente: String,
    pub documento_cliente: String,
    pub email_cliente: String,
    pub produtos: Vec<Produto>,
    pub endereco_envio: EnderecoEnvio,
    pub informacoes_adicionais: InformacoesAdicionais,
}

/// Corpo do webhook da Montink, antes da validação
///
/// Todos os campos são opcionais aqui para que a validação consiga listar
/// tudo o que falta de uma vez.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PedidoPayload {
    #[serde(default)]
    pub numero_pedido: Option<Value>,
    #[serde(default)]
    pub titulo: Option<String>,
    #[serde(default)]
    pub valor_pedido: Option<Decimal>,
    #[serde(default)]
    pub custo_envio: Option<Decimal>,
    #[serde(default)]
    pub etiqueta_envio: Option<String>,
    #[serde(default)]
    pub metodo_envio: Option<String>,
    #[serde(default)]
    pub nome_cliente: Option<String>,
    #[serde(default)]
    pub documento_cliente: Option<String>,
    #[serde(default)]
    pub email_cliente: Option<String>,
    #[serde(default)]
    pub produtos: Option<Vec<Value>>,
    #[serde(default)]
    pub endereco_envio: Option<Value>,
    #[serde(default)]
    pub informacoes_adicionais: Option<Value>,
}

// ============================================================================
// Listagem
// ============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PedidoFiltro {
    pub page: Option<u32>,
    pub page_size: Option<u32>,
    /// Busca em numero_pedido, nome_cliente e email_cliente
    pub search: Option<String>,
    pub status: Option<i64>,
    pub data_inicio: Option<NaiveDate>,
    pub data_fim: Option<NaiveDate>,
    pub order_by: Option<String>,
}

pub const PAGE_SIZE_PADRAO: u32 = 10;
pub const PAGE_SIZE_MAXIMO: u32 = 100;

/// Ordenações aceitas em `order_by` (prefixo `-` para decrescente)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ordenacao {
    CriadoEm { desc: bool },
    NumeroPedido { desc: bool },
    ValorPedido { desc: bool },
}

impl Ordenacao {
    pub fn parse(raw: Option<&str>) -> Self {
        let raw = raw.unwrap_or("-criado_em").trim();
        let (desc, campo) = match raw.strip_prefix('-') {
            Some(campo) => (true, campo),
            None => (false, raw),
        };
        match campo {
            "numero_pedido" => Self::NumeroPedido { desc },
            "valor_pedido" => Self::ValorPedido { desc },
            "criado_em" => Self::CriadoEm { desc },
            _ => Self::CriadoEm { desc: true },
        }
    }

    pub fn sql(&self) -> &'static str {
        match self {
            Self::CriadoEm { desc: true } => "p.criado_em DESC, p.id DESC",
            Self::CriadoEm { desc: false } => "p.criado_em ASC, p.id ASC",
            Self::NumeroPedido { desc: true } => "p.numero_pedido DESC",
            Self::NumeroPedido { desc: false } => "p.numero_pedido ASC",
            Self::ValorPedido { desc: true } => "p.valor_pedido DESC, p.id DESC",
            Self::ValorPedido { desc: false } => "p.valor_pedido ASC, p.id ASC",
        }
    }
}

impl PedidoFiltro {
    pub fn page(&self) -> u32 {
        self.page.unwrap_or(1).max(1)
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
            .unwrap_or(PAGE_SIZE_PADRAO)
            .clamp(1, PAGE_SIZE_MAXIMO)
    }

    pub fn offset(&self) -> u64 {
        u64::from(self.page() - 1) * u64::from(self.page_size())
    }

    pub fn ordenacao(&self) -> Ordenacao {
        Ordenacao::parse(self.order_by.as_deref())
    }

    pub fn search_term(&self) -> Option<String> {
        self.search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_lowercase)
    }
}

/// Página de resultados
#[derive(Debug, Clone, Serialize)]
pub struct Pagina<T> {
    pub count: u64,
    pub page: u32,
    pub page_size: u32,
    pub total_pages: u32,
    pub results: Vec<T>,
}

impl<T> Pagina<T> {
    pub fn new(results: Vec<T>, count: u64, filtro: &PedidoFiltro) -> Self {
        let page_size = filtro.page_size();
        let total_pages = count.div_ceil(u64::from(page_size)) as u32;
        Self {
            count,
            page: filtro.page(),
            page_size,
            total_pages,
            results,
        }
    }
}
