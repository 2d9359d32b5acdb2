use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;

/// Evento assumido quando o payload não informa `evento`
pub const EVENTO_PADRAO: &str = "pedido.novo";

/// Registro de auditoria de todo webhook recebido
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Webhook {
    pub id: i64,
    pub evento: String,
    pub payload: String,
    pub assinatura: Option<String>,
    pub verificado: bool,
    pub status_code: Option<i32>,
    pub erro: Option<String>,
    pub processado: bool,
    pub recebido_em: DateTime<Utc>,
}

#[derive(Debug, Clone, Default)]
pub struct NovoWebhook {
    pub evento: String,
    pub payload: String,
    pub assinatura: Option<String>,
    pub verificado: bool,
    pub status_code: Option<i32>,
    pub erro: Option<String>,
    pub processado: bool,
}

impl NovoWebhook {
    /// Marca o registro como rejeitado com o código HTTP devolvido
    pub fn rejeitado(mut self, status_code: u16, erro: impl Into<String>) -> Self {
        self.status_code = Some(i32::from(status_code));
        self.erro = Some(erro.into());
        self.processado = false;
        self
    }
}

/// Secret compartilhado usado na verificação dos webhooks recebidos
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct WebhookConfig {
    pub id: i64,
    #[serde(serialize_with = "mascarar")]
    pub secret_key: String,
    pub ativo: bool,
    pub criado_em: DateTime<Utc>,
    pub atualizado_em: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NovoWebhookConfig {
    pub secret_key: String,
    #[serde(default = "verdadeiro")]
    pub ativo: bool,
}

fn verdadeiro() -> bool {
    true
}

fn mascarar<S: Serializer>(secret: &str, serializer: S) -> Result<S::Ok, S::Error> {
    let visivel: String = secret.chars().take(4).collect();
    serializer.serialize_str(&format!("{}****", visivel))
}

/// Destino das notificações de mudança de status
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct WebhookEndpointConfig {
    pub id: i64,
    pub nome: String,
    pub url: String,
    pub ativo: bool,
    pub auto_enviar: bool,
    pub access_token: Option<String>,
    #[serde(serialize_with = "mascarar_opcional")]
    pub token_autenticacao: Option<String>,
    pub headers_adicionais: Option<String>,
    pub criado_em: DateTime<Utc>,
    pub atualizado_em: DateTime<Utc>,
}

fn mascarar_opcional<S: Serializer>(secret: &Option<String>, serializer: S) -> Result<S::Ok, S::Error> {
    match secret {
        Some(s) => mascarar(s, serializer),
        None => serializer.serialize_none(),
    }
}

impl WebhookEndpointConfig {
    /// Headers do envio: Content-Type, Bearer opcional e os headers adicionais
    ///
    /// `headers_adicionais` inválido é ignorado (com log), assim como valores
    /// que não são string.
    pub fn headers(&self) -> Vec<(String, String)> {
        let mut headers = vec![("Content-Type".to_string(), "application/json".to_string())];

        if let Some(token) = self.token_autenticacao.as_deref().filter(|t| !t.is_empty()) {
            headers.push(("Authorization".to_string(), format!("Bearer {}", token)));
        }

        if let Some(raw) = self.headers_adicionais.as_deref().filter(|h| !h.trim().is_empty()) {
            match serde_json::from_str::<serde_json::Map<String, Value>>(raw) {
                Ok(extra) => {
                    for (name, value) in extra {
                        let Some(value) = value.as_str() else { continue };
                        headers.retain(|(existing, _)| !existing.eq_ignore_ascii_case(&name));
                        headers.push((name, value.to_string()));
                    }
                }
                Err(e) => {
                    tracing::error!("Headers adicionais inválidos para o endpoint {}: {}", self.nome, e);
                }
            }
        }

        headers
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NovoEndpoint {
    pub nome: String,
    pub url: String,
    #[serde(default = "verdadeiro")]
    pub ativo: bool,
    #[serde(default = "verdadeiro")]
    pub auto_enviar: bool,
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub token_autenticacao: Option<String>,
    /// Objeto JSON (ou string contendo um objeto JSON)
    #[serde(default)]
    pub headers_adicionais: Option<Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EndpointPatch {
    pub nome: Option<String>,
    pub url: Option<String>,
    pub ativo: Option<bool>,
    pub auto_enviar: Option<bool>,
    pub access_token: Option<String>,
    pub token_autenticacao: Option<String>,
    pub headers_adicionais: Option<Value>,
}

/// Valores já normalizados para gravação de um endpoint
#[derive(Debug, Clone, PartialEq)]
pub struct DadosEndpoint {
    pub nome: String,
    pub url: String,
    pub ativo: bool,
    pub auto_enviar: bool,
    pub access_token: Option<String>,
    pub token_autenticacao: Option<String>,
    pub headers_adicionais: Option<String>,
}

impl From<&WebhookEndpointConfig> for DadosEndpoint {
    fn from(e: &WebhookEndpointConfig) -> Self {
        Self {
            nome: e.nome.clone(),
            url: e.url.clone(),
            ativo: e.ativo,
            auto_enviar: e.auto_enviar,
            access_token: e.access_token.clone(),
            token_autenticacao: e.token_autenticacao.clone(),
            headers_adicionais: e.headers_adicionais.clone(),
        }
    }
}

/// Registro de cada tentativa de envio de status
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct WebhookStatusEnviado {
    pub id: i64,
    pub pedido_id: i64,
    pub status: String,
    pub url_destino: String,
    pub payload: String,
    pub resposta: Option<String>,
    pub codigo_http: Option<i32>,
    pub sucesso: bool,
    pub tentativa_numero: i32,
    pub enviado_em: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NovoEnvio {
    pub pedido_id: i64,
    pub status: String,
    pub url_destino: String,
    pub payload: String,
    pub resposta: Option<String>,
    pub codigo_http: Option<i32>,
    pub sucesso: bool,
    pub tentativa_numero: i32,
}
