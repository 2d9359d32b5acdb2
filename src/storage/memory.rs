//! Store em memória
//!
//! Usado quando `database.url` não está configurado e nos testes. As mesmas
//! regras do PostgreSQL valem aqui: `numero_pedido`, `cod_op` e nome de status
//! únicos, e a gravação webhook + pedido é tudo-ou-nada.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::types::Json;
use tokio::sync::RwLock;

use super::{nao_encontrado, pedido_duplicado, FormularioStore, PedidoStore, StoreError, StoreResult};
use crate::models::{
    ArquivoPdf, DadosEndpoint, Formulario, FormularioPatch, LinksFormulario, Marca, NovaUnidade,
    NovoArquivo, NovoEnvio, NovoFormulario, NovoPedido, NovoStatus, NovoWebhook, NovoWebhookConfig,
    Ordenacao, Pagina, Pedido, PedidoFiltro, StatusPedido, Unidade, Webhook, WebhookConfig,
    WebhookEndpointConfig, WebhookStatusEnviado,
};

#[derive(Default)]
struct Dados {
    seq: i64,
    status: Vec<StatusPedido>,
    webhooks: Vec<Webhook>,
    pedidos: Vec<Pedido>,
    configs: Vec<WebhookConfig>,
    endpoints: Vec<WebhookEndpointConfig>,
    envios: Vec<WebhookStatusEnviado>,
    formularios: Vec<Formulario>,
}

impl Dados {
    fn next_id(&mut self) -> i64 {
        self.seq += 1;
        self.seq
    }

    fn insert_webhook(&mut self, novo: NovoWebhook) -> Webhook {
        let webhook = Webhook {
            id: self.next_id(),
            evento: novo.evento,
            payload: novo.payload,
            assinatura: novo.assinatura,
            verificado: novo.verificado,
            status_code: novo.status_code,
            erro: novo.erro,
            processado: novo.processado,
            recebido_em: Utc::now(),
        };
        self.webhooks.push(webhook.clone());
        webhook
    }

    fn status_nome(&self, status_id: i64) -> StoreResult<String> {
        self.status
            .iter()
            .find(|s| s.id == status_id)
            .map(|s| s.nome.clone())
            .ok_or_else(|| nao_encontrado("Status", status_id))
    }

    fn unidades(&mut self, formulario_id: i64, novas: &[NovaUnidade]) -> Vec<Unidade> {
        novas
            .iter()
            .map(|u| Unidade {
                id: self.next_id(),
                formulario_id,
                nome: u.nome.clone(),
                quantidade: u.quantidade,
            })
            .collect()
    }

    fn formulario_mut(&mut self, marca: Marca, cod_op: &str) -> StoreResult<&mut Formulario> {
        self.formularios
            .iter_mut()
            .find(|f| f.marca == marca.slug() && f.cod_op == cod_op)
            .ok_or_else(|| nao_encontrado("Formulário", cod_op))
    }
}

#[derive(Default)]
pub struct MemoryStore {
    dados: RwLock<Dados>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn pedido_casa_filtro(pedido: &Pedido, filtro: &PedidoFiltro, termo: Option<&str>) -> bool {
    if let Some(termo) = termo {
        let casa = pedido.numero_pedido.to_lowercase().contains(termo)
            || pedido.nome_cliente.to_lowercase().contains(termo)
            || pedido.email_cliente.to_lowercase().contains(termo);
        if !casa {
            return false;
        }
    }
    if filtro.status.is_some_and(|s| s != pedido.status_id) {
        return false;
    }
    let dia = pedido.criado_em.date_naive();
    if filtro.data_inicio.is_some_and(|inicio| dia < inicio) {
        return false;
    }
    if filtro.data_fim.is_some_and(|fim| dia > fim) {
        return false;
    }
    true
}

fn ordenar(pedidos: &mut [Pedido], ordenacao: Ordenacao) {
    match ordenacao {
        Ordenacao::CriadoEm { desc } => {
            pedidos.sort_by(|a, b| (a.criado_em, a.id).cmp(&(b.criado_em, b.id)));
            if desc {
                pedidos.reverse();
            }
        }
        Ordenacao::NumeroPedido { desc } => {
            pedidos.sort_by(|a, b| a.numero_pedido.cmp(&b.numero_pedido));
            if desc {
                pedidos.reverse();
            }
        }
        Ordenacao::ValorPedido { desc } => {
            pedidos.sort_by(|a, b| (a.valor_pedido, a.id).cmp(&(b.valor_pedido, b.id)));
            if desc {
                pedidos.reverse();
            }
        }
    }
}

#[async_trait]
impl PedidoStore for MemoryStore {
    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }

    async fn ensure_status(&self, status: NovoStatus) -> StoreResult<StatusPedido> {
        let mut dados = self.dados.write().await;
        if let Some(existente) = dados.status.iter().find(|s| s.nome == status.nome) {
            return Ok(existente.clone());
        }
        let novo = StatusPedido {
            id: dados.next_id(),
            nome: status.nome,
            descricao: status.descricao,
            cor_css: status.cor_css,
            ordem: status.ordem,
            ativo: status.ativo,
        };
        dados.status.push(novo.clone());
        Ok(novo)
    }

    async fn create_status(&self, status: NovoStatus) -> StoreResult<StatusPedido> {
        let mut dados = self.dados.write().await;
        if dados.status.iter().any(|s| s.nome == status.nome) {
            return Err(StoreError::Duplicate(format!("Status '{}' já existe", status.nome)));
        }
        let novo = StatusPedido {
            id: dados.next_id(),
            nome: status.nome,
            descricao: status.descricao,
            cor_css: status.cor_css,
            ordem: status.ordem,
            ativo: status.ativo,
        };
        dados.status.push(novo.clone());
        Ok(novo)
    }

    async fn get_status(&self, id: i64) -> StoreResult<StatusPedido> {
        let dados = self.dados.read().await;
        dados
            .status
            .iter()
            .find(|s| s.id == id)
            .cloned()
            .ok_or_else(|| nao_encontrado("Status", id))
    }

    async fn list_status(&self, apenas_ativos: bool) -> StoreResult<Vec<StatusPedido>> {
        let dados = self.dados.read().await;
        let mut status: Vec<StatusPedido> = dados
            .status
            .iter()
            .filter(|s| !apenas_ativos || s.ativo)
            .cloned()
            .collect();
        status.sort_by_key(|s| (s.ordem, s.id));
        Ok(status)
    }

    async fn record_webhook(&self, webhook: NovoWebhook) -> StoreResult<Webhook> {
        Ok(self.dados.write().await.insert_webhook(webhook))
    }

    async fn list_webhooks(&self, limit: u32) -> StoreResult<Vec<Webhook>> {
        let dados = self.dados.read().await;
        Ok(dados
            .webhooks
            .iter()
            .rev()
            .take(limit as usize)
            .cloned()
            .collect())
    }

    async fn create_pedido_from_webhook(
        &self,
        webhook: NovoWebhook,
        pedido: NovoPedido,
        status_id: i64,
    ) -> StoreResult<(Webhook, Pedido)> {
        // Um único write lock cobre verificação e inserção
        let mut dados = self.dados.write().await;

        if dados.pedidos.iter().any(|p| p.numero_pedido == pedido.numero_pedido) {
            return Err(pedido_duplicado(&pedido.numero_pedido));
        }
        let status_nome = dados.status_nome(status_id)?;

        let webhook = dados.insert_webhook(webhook);
        let agora = Utc::now();
        let novo = Pedido {
            id: dados.next_id(),
            numero_pedido: pedido.numero_pedido,
            titulo: pedido.titulo,
            valor_pedido: pedido.valor_pedido,
            custo_envio: pedido.custo_envio,
            etiqueta_envio: pedido.etiqueta_envio,
            metodo_envio: pedido.metodo_envio,
            nome_cliente: pedido.nome_cliente,
            documento_cliente: pedido.documento_cliente,
            email_cliente: pedido.email_cliente,
            produtos: Json(pedido.produtos),
            endereco_envio: Json(pedido.endereco_envio),
            informacoes_adicionais: Json(pedido.informacoes_adicionais),
            status_id,
            status_nome,
            webhook_id: Some(webhook.id),
            criado_em: agora,
            atualizado_em: agora,
        };
        dados.pedidos.push(novo.clone());

        Ok((webhook, novo))
    }

    async fn get_pedido(&self, id: i64) -> StoreResult<Pedido> {
        let dados = self.dados.read().await;
        dados
            .pedidos
            .iter()
            .find(|p| p.id == id)
            .cloned()
            .ok_or_else(|| nao_encontrado("Pedido", id))
    }

    async fn list_pedidos(&self, filtro: &PedidoFiltro) -> StoreResult<Pagina<Pedido>> {
        let dados = self.dados.read().await;
        let termo = filtro.search_term();

        let mut encontrados: Vec<Pedido> = dados
            .pedidos
            .iter()
            .filter(|p| pedido_casa_filtro(p, filtro, termo.as_deref()))
            .cloned()
            .collect();
        ordenar(&mut encontrados, filtro.ordenacao());

        let count = encontrados.len() as u64;
        let pagina: Vec<Pedido> = encontrados
            .into_iter()
            .skip(filtro.offset() as usize)
            .take(filtro.page_size() as usize)
            .collect();

        Ok(Pagina::new(pagina, count, filtro))
    }

    async fn update_pedido_status(&self, pedido_id: i64, status_id: i64) -> StoreResult<Pedido> {
        let mut dados = self.dados.write().await;
        let status_nome = dados.status_nome(status_id)?;

        let pedido = dados
            .pedidos
            .iter_mut()
            .find(|p| p.id == pedido_id)
            .ok_or_else(|| nao_encontrado("Pedido", pedido_id))?;
        pedido.status_id = status_id;
        pedido.status_nome = status_nome;
        pedido.atualizado_em = Utc::now();

        Ok(pedido.clone())
    }

    async fn active_webhook_secret(&self) -> StoreResult<Option<String>> {
        let dados = self.dados.read().await;
        Ok(dados
            .configs
            .iter()
            .rev()
            .find(|c| c.ativo)
            .map(|c| c.secret_key.clone()))
    }

    async fn list_webhook_configs(&self) -> StoreResult<Vec<WebhookConfig>> {
        let dados = self.dados.read().await;
        Ok(dados.configs.iter().rev().cloned().collect())
    }

    async fn create_webhook_config(&self, config: NovoWebhookConfig) -> StoreResult<WebhookConfig> {
        let mut dados = self.dados.write().await;
        let agora = Utc::now();
        let nova = WebhookConfig {
            id: dados.next_id(),
            secret_key: config.secret_key,
            ativo: config.ativo,
            criado_em: agora,
            atualizado_em: agora,
        };
        dados.configs.push(nova.clone());
        Ok(nova)
    }

    async fn list_endpoints(&self) -> StoreResult<Vec<WebhookEndpointConfig>> {
        let dados = self.dados.read().await;
        let mut endpoints = dados.endpoints.clone();
        endpoints.sort_by(|a, b| (&a.nome, a.id).cmp(&(&b.nome, b.id)));
        Ok(endpoints)
    }

    async fn dispatch_endpoints(&self) -> StoreResult<Vec<WebhookEndpointConfig>> {
        let mut endpoints = self.list_endpoints().await?;
        endpoints.retain(|e| e.ativo && e.auto_enviar);
        Ok(endpoints)
    }

    async fn get_endpoint(&self, id: i64) -> StoreResult<WebhookEndpointConfig> {
        let dados = self.dados.read().await;
        dados
            .endpoints
            .iter()
            .find(|e| e.id == id)
            .cloned()
            .ok_or_else(|| nao_encontrado("Endpoint", id))
    }

    async fn create_endpoint(&self, d: DadosEndpoint) -> StoreResult<WebhookEndpointConfig> {
        let mut dados = self.dados.write().await;
        let agora = Utc::now();
        let endpoint = WebhookEndpointConfig {
            id: dados.next_id(),
            nome: d.nome,
            url: d.url,
            ativo: d.ativo,
            auto_enviar: d.auto_enviar,
            access_token: d.access_token,
            token_autenticacao: d.token_autenticacao,
            headers_adicionais: d.headers_adicionais,
            criado_em: agora,
            atualizado_em: agora,
        };
        dados.endpoints.push(endpoint.clone());
        Ok(endpoint)
    }

    async fn update_endpoint(&self, id: i64, d: DadosEndpoint) -> StoreResult<WebhookEndpointConfig> {
        let mut dados = self.dados.write().await;
        let endpoint = dados
            .endpoints
            .iter_mut()
            .find(|e| e.id == id)
            .ok_or_else(|| nao_encontrado("Endpoint", id))?;

        endpoint.nome = d.nome;
        endpoint.url = d.url;
        endpoint.ativo = d.ativo;
        endpoint.auto_enviar = d.auto_enviar;
        endpoint.access_token = d.access_token;
        endpoint.token_autenticacao = d.token_autenticacao;
        endpoint.headers_adicionais = d.headers_adicionais;
        endpoint.atualizado_em = Utc::now();

        Ok(endpoint.clone())
    }

    async fn delete_endpoint(&self, id: i64) -> StoreResult<()> {
        let mut dados = self.dados.write().await;
        let antes = dados.endpoints.len();
        dados.endpoints.retain(|e| e.id != id);
        if dados.endpoints.len() == antes {
            return Err(nao_encontrado("Endpoint", id));
        }
        Ok(())
    }

    async fn record_envio(&self, envio: NovoEnvio) -> StoreResult<WebhookStatusEnviado> {
        let mut dados = self.dados.write().await;
        if !dados.pedidos.iter().any(|p| p.id == envio.pedido_id) {
            return Err(nao_encontrado("Pedido", envio.pedido_id));
        }
        let registro = WebhookStatusEnviado {
            id: dados.next_id(),
            pedido_id: envio.pedido_id,
            status: envio.status,
            url_destino: envio.url_destino,
            payload: envio.payload,
            resposta: envio.resposta,
            codigo_http: envio.codigo_http,
            sucesso: envio.sucesso,
            tentativa_numero: envio.tentativa_numero,
            enviado_em: Utc::now(),
        };
        dados.envios.push(registro.clone());
        Ok(registro)
    }

    async fn list_envios(&self, pedido_id: i64) -> StoreResult<Vec<WebhookStatusEnviado>> {
        let dados = self.dados.read().await;
        Ok(dados
            .envios
            .iter()
            .rev()
            .filter(|e| e.pedido_id == pedido_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl FormularioStore for MemoryStore {
    async fn create_formulario(&self, d: NovoFormulario, cod_op: &str) -> StoreResult<Formulario> {
        let mut dados = self.dados.write().await;
        if dados.formularios.iter().any(|f| f.cod_op == cod_op) {
            return Err(StoreError::Duplicate(format!("cod_op {} já existe", cod_op)));
        }

        let id = dados.next_id();
        let unidades = dados.unidades(id, &d.unidades);
        let agora = Utc::now();
        let form = Formulario {
            id,
            marca: d.marca.slug().to_string(),
            nome: d.nome,
            email: d.email,
            unidade_nome: d.unidade_nome,
            unidade_quantidade: d.unidade_quantidade,
            titulo: d.titulo,
            data_entrega: d.data_entrega,
            observacoes: d.observacoes,
            formato: d.formato,
            cor_impressao: d.cor_impressao,
            impressao: d.impressao,
            cod_op: cod_op.to_string(),
            link_download: None,
            web_view_link: None,
            json_link: None,
            criado_em: agora,
            atualizado_em: agora,
            unidades,
            arquivos: Vec::new(),
        };
        dados.formularios.push(form.clone());
        Ok(form)
    }

    async fn get_formulario(&self, marca: Marca, cod_op: &str) -> StoreResult<Formulario> {
        let dados = self.dados.read().await;
        dados
            .formularios
            .iter()
            .find(|f| f.marca == marca.slug() && f.cod_op == cod_op)
            .cloned()
            .ok_or_else(|| nao_encontrado("Formulário", cod_op))
    }

    async fn list_formularios(&self, marca: Marca) -> StoreResult<Vec<Formulario>> {
        let dados = self.dados.read().await;
        let mut forms: Vec<Formulario> = dados
            .formularios
            .iter()
            .filter(|f| f.marca == marca.slug())
            .cloned()
            .collect();
        forms.sort_by(|a, b| (b.criado_em, b.id).cmp(&(a.criado_em, a.id)));
        Ok(forms)
    }

    async fn update_formulario(
        &self,
        marca: Marca,
        cod_op: &str,
        patch: FormularioPatch,
    ) -> StoreResult<Formulario> {
        let mut dados = self.dados.write().await;
        let id = dados.formulario_mut(marca, cod_op)?.id;
        let unidades = patch.unidades.as_deref().map(|u| dados.unidades(id, u));

        let form = dados.formulario_mut(marca, cod_op)?;
        if let Some(v) = patch.nome {
            form.nome = v;
        }
        if let Some(v) = patch.email {
            form.email = v;
        }
        if let Some(v) = patch.unidade_nome {
            form.unidade_nome = v;
        }
        if let Some(v) = patch.unidade_quantidade {
            form.unidade_quantidade = Some(v);
        }
        if let Some(v) = patch.titulo {
            form.titulo = v;
        }
        if let Some(v) = patch.data_entrega {
            form.data_entrega = v;
        }
        if let Some(v) = patch.observacoes {
            form.observacoes = v;
        }
        if let Some(v) = patch.formato {
            form.formato = v;
        }
        if let Some(v) = patch.cor_impressao {
            form.cor_impressao = v;
        }
        if let Some(v) = patch.impressao {
            form.impressao = v;
        }
        if let Some(unidades) = unidades {
            form.unidades = unidades;
        }
        form.atualizado_em = Utc::now();

        Ok(form.clone())
    }

    async fn set_links(&self, formulario_id: i64, links: LinksFormulario) -> StoreResult<()> {
        let mut dados = self.dados.write().await;
        let form = dados
            .formularios
            .iter_mut()
            .find(|f| f.id == formulario_id)
            .ok_or_else(|| nao_encontrado("Formulário", formulario_id))?;
        form.link_download = links.link_download;
        form.web_view_link = links.web_view_link;
        form.json_link = links.json_link;
        form.atualizado_em = Utc::now();
        Ok(())
    }

    async fn add_arquivo(&self, formulario_id: i64, arquivo: NovoArquivo) -> StoreResult<ArquivoPdf> {
        let mut dados = self.dados.write().await;
        let id = dados.next_id();
        let form = dados
            .formularios
            .iter_mut()
            .find(|f| f.id == formulario_id)
            .ok_or_else(|| nao_encontrado("Formulário", formulario_id))?;

        let registro = ArquivoPdf {
            id,
            formulario_id,
            nome: arquivo.nome,
            link_download: arquivo.link_download,
            web_view_link: arquivo.web_view_link,
            json_link: arquivo.json_link,
            criado_em: Utc::now(),
        };
        form.arquivos.push(registro.clone());
        Ok(registro)
    }

    async fn delete_formulario(&self, marca: Marca, cod_op: &str) -> StoreResult<()> {
        let mut dados = self.dados.write().await;
        let antes = dados.formularios.len();
        dados
            .formularios
            .retain(|f| !(f.marca == marca.slug() && f.cod_op == cod_op));
        if dados.formularios.len() == antes {
            return Err(nao_encontrado("Formulário", cod_op));
        }
        Ok(())
    }
}
