//! Camada de persistência
//!
//! Dois backends implementam os mesmos traits:
//! - [`PgStore`]: PostgreSQL via sqlx (produção)
//! - [`MemoryStore`]: dados em memória (desenvolvimento sem banco e testes)

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{
    ArquivoPdf, DadosEndpoint, Formulario, FormularioPatch, LinksFormulario, Marca, NovoArquivo,
    NovoEnvio, NovoFormulario, NovoPedido, NovoStatus, NovoWebhook, NovoWebhookConfig, Pagina,
    Pedido, PedidoFiltro, StatusPedido, Webhook, WebhookConfig, WebhookEndpointConfig,
    WebhookStatusEnviado,
};

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Duplicate(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Pedidos, status, webhooks recebidos, endpoints de envio e auditoria de envios
#[async_trait]
pub trait PedidoStore: Send + Sync {
    async fn ping(&self) -> StoreResult<()>;

    // Status
    async fn ensure_status(&self, status: NovoStatus) -> StoreResult<StatusPedido>;
    async fn create_status(&self, status: NovoStatus) -> StoreResult<StatusPedido>;
    async fn get_status(&self, id: i64) -> StoreResult<StatusPedido>;
    async fn list_status(&self, apenas_ativos: bool) -> StoreResult<Vec<StatusPedido>>;

    // Webhooks recebidos
    async fn record_webhook(&self, webhook: NovoWebhook) -> StoreResult<Webhook>;
    async fn list_webhooks(&self, limit: u32) -> StoreResult<Vec<Webhook>>;

    /// Grava o webhook e o pedido na mesma transação
    ///
    /// Falha com [`StoreError::Duplicate`] se `numero_pedido` já existe; nesse
    /// caso nada é gravado.
    async fn create_pedido_from_webhook(
        &self,
        webhook: NovoWebhook,
        pedido: NovoPedido,
        status_id: i64,
    ) -> StoreResult<(Webhook, Pedido)>;

    // Pedidos
    async fn get_pedido(&self, id: i64) -> StoreResult<Pedido>;
    async fn list_pedidos(&self, filtro: &PedidoFiltro) -> StoreResult<Pagina<Pedido>>;
    async fn update_pedido_status(&self, pedido_id: i64, status_id: i64) -> StoreResult<Pedido>;

    // Secret dos webhooks recebidos
    async fn active_webhook_secret(&self) -> StoreResult<Option<String>>;
    async fn list_webhook_configs(&self) -> StoreResult<Vec<WebhookConfig>>;
    async fn create_webhook_config(&self, config: NovoWebhookConfig) -> StoreResult<WebhookConfig>;

    // Endpoints de envio
    async fn list_endpoints(&self) -> StoreResult<Vec<WebhookEndpointConfig>>;
    /// Somente endpoints `ativo && auto_enviar`, ordenados por nome
    async fn dispatch_endpoints(&self) -> StoreResult<Vec<WebhookEndpointConfig>>;
    async fn get_endpoint(&self, id: i64) -> StoreResult<WebhookEndpointConfig>;
    async fn create_endpoint(&self, dados: DadosEndpoint) -> StoreResult<WebhookEndpointConfig>;
    async fn update_endpoint(&self, id: i64, dados: DadosEndpoint) -> StoreResult<WebhookEndpointConfig>;
    async fn delete_endpoint(&self, id: i64) -> StoreResult<()>;

    // Auditoria de envios
    async fn record_envio(&self, envio: NovoEnvio) -> StoreResult<WebhookStatusEnviado>;
    async fn list_envios(&self, pedido_id: i64) -> StoreResult<Vec<WebhookStatusEnviado>>;
}

/// Formulários de impressão com unidades e arquivos PDF
#[async_trait]
pub trait FormularioStore: Send + Sync {
    /// Falha com [`StoreError::Duplicate`] se `cod_op` já existe
    async fn create_formulario(&self, dados: NovoFormulario, cod_op: &str) -> StoreResult<Formulario>;
    async fn get_formulario(&self, marca: Marca, cod_op: &str) -> StoreResult<Formulario>;
    async fn list_formularios(&self, marca: Marca) -> StoreResult<Vec<Formulario>>;
    async fn update_formulario(
        &self,
        marca: Marca,
        cod_op: &str,
        patch: FormularioPatch,
    ) -> StoreResult<Formulario>;
    async fn set_links(&self, formulario_id: i64, links: LinksFormulario) -> StoreResult<()>;
    async fn add_arquivo(&self, formulario_id: i64, arquivo: NovoArquivo) -> StoreResult<ArquivoPdf>;
    async fn delete_formulario(&self, marca: Marca, cod_op: &str) -> StoreResult<()>;
}

pub(crate) fn pedido_duplicado(numero_pedido: &str) -> StoreError {
    StoreError::Duplicate(format!("Pedido com número {} já existe", numero_pedido))
}

pub(crate) fn nao_encontrado(entidade: &str, chave: impl std::fmt::Display) -> StoreError {
    StoreError::NotFound(format!("{} {} não encontrado", entidade, chave))
}
