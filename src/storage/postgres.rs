//! Implementação PostgreSQL dos stores (sqlx, queries em tempo de execução)

use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::types::Json;
use sqlx::{Postgres, QueryBuilder, Transaction};
use std::collections::HashMap;
use std::time::Duration;

use super::{nao_encontrado, pedido_duplicado, FormularioStore, PedidoStore, StoreError, StoreResult};
use crate::models::{
    ArquivoPdf, DadosEndpoint, Formulario, FormularioPatch, LinksFormulario, Marca, NovaUnidade,
    NovoArquivo, NovoEnvio, NovoFormulario, NovoPedido, NovoStatus, NovoWebhook, NovoWebhookConfig,
    Pagina, Pedido, PedidoFiltro, StatusPedido, Unidade, Webhook, WebhookConfig,
    WebhookEndpointConfig, WebhookStatusEnviado,
};

const PEDIDO_SELECT: &str = r#"
    SELECT p.id, p.numero_pedido, p.titulo, p.valor_pedido, p.custo_envio, p.etiqueta_envio,
           p.metodo_envio, p.nome_cliente, p.documento_cliente, p.email_cliente, p.produtos,
           p.endereco_envio, p.informacoes_adicionais, p.status_id, s.nome AS status_nome,
           p.webhook_id, p.criado_em, p.atualizado_em
    FROM pedido p
    JOIN status_pedido s ON s.id = p.status_id
"#;

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
}

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Conecta ao banco e aplica as migrações de `migrations/` se pedido
    pub async fn connect(url: &str, max_connections: u32, run_migrations: bool) -> StoreResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(5))
            .connect(url)
            .await?;

        if run_migrations {
            sqlx::migrate!("./migrations").run(&pool).await?;
            tracing::info!("✅ Migrações aplicadas");
        }

        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn fetch_pedido<'e, E>(executor: E, id: i64) -> StoreResult<Pedido>
    where
        E: sqlx::Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, Pedido>(&format!("{} WHERE p.id = $1", PEDIDO_SELECT))
            .bind(id)
            .fetch_optional(executor)
            .await?
            .ok_or_else(|| nao_encontrado("Pedido", id))
    }

    async fn insert_webhook(tx: &mut Transaction<'_, Postgres>, webhook: &NovoWebhook) -> StoreResult<Webhook> {
        let row = sqlx::query_as::<_, Webhook>(
            r#"
            INSERT INTO webhook (evento, payload, assinatura, verificado, status_code, erro, processado)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(&webhook.evento)
        .bind(&webhook.payload)
        .bind(&webhook.assinatura)
        .bind(webhook.verificado)
        .bind(webhook.status_code)
        .bind(&webhook.erro)
        .bind(webhook.processado)
        .fetch_one(&mut **tx)
        .await?;
        Ok(row)
    }

    async fn insert_unidades(
        tx: &mut Transaction<'_, Postgres>,
        formulario_id: i64,
        unidades: &[NovaUnidade],
    ) -> StoreResult<()> {
        for unidade in unidades {
            sqlx::query("INSERT INTO unidade (formulario_id, nome, quantidade) VALUES ($1, $2, $3)")
                .bind(formulario_id)
                .bind(&unidade.nome)
                .bind(unidade.quantidade)
                .execute(&mut **tx)
                .await?;
        }
        Ok(())
    }

    /// Carrega unidades e arquivos de uma lista de formulários
    async fn load_children(&self, formularios: &mut [Formulario]) -> StoreResult<()> {
        if formularios.is_empty() {
            return Ok(());
        }
        let ids: Vec<i64> = formularios.iter().map(|f| f.id).collect();

        let unidades = sqlx::query_as::<_, Unidade>(
            "SELECT * FROM unidade WHERE formulario_id = ANY($1) ORDER BY id",
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?;

        let arquivos = sqlx::query_as::<_, ArquivoPdf>(
            "SELECT * FROM arquivo_pdf WHERE formulario_id = ANY($1) ORDER BY id",
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?;

        let mut unidades_por_form: HashMap<i64, Vec<Unidade>> = HashMap::new();
        for u in unidades {
            unidades_por_form.entry(u.formulario_id).or_default().push(u);
        }
        let mut arquivos_por_form: HashMap<i64, Vec<ArquivoPdf>> = HashMap::new();
        for a in arquivos {
            arquivos_por_form.entry(a.formulario_id).or_default().push(a);
        }

        for form in formularios.iter_mut() {
            form.unidades = unidades_por_form.remove(&form.id).unwrap_or_default();
            form.arquivos = arquivos_por_form.remove(&form.id).unwrap_or_default();
        }
        Ok(())
    }
}

fn aplicar_filtros(qb: &mut QueryBuilder<'_, Postgres>, filtro: &PedidoFiltro) {
    if let Some(term) = filtro.search_term() {
        let like = format!("%{}%", term);
        qb.push(" AND (LOWER(p.numero_pedido) LIKE ")
            .push_bind(like.clone())
            .push(" OR LOWER(p.nome_cliente) LIKE ")
            .push_bind(like.clone())
            .push(" OR LOWER(p.email_cliente) LIKE ")
            .push_bind(like)
            .push(")");
    }
    if let Some(status_id) = filtro.status {
        qb.push(" AND p.status_id = ").push_bind(status_id);
    }
    if let Some(inicio) = filtro.data_inicio {
        qb.push(" AND p.criado_em::date >= ").push_bind(inicio);
    }
    if let Some(fim) = filtro.data_fim {
        qb.push(" AND p.criado_em::date <= ").push_bind(fim);
    }
}

#[async_trait]
impl PedidoStore for PgStore {
    async fn ping(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn ensure_status(&self, status: NovoStatus) -> StoreResult<StatusPedido> {
        let row = sqlx::query_as::<_, StatusPedido>(
            r#"
            INSERT INTO status_pedido (nome, descricao, cor_css, ordem, ativo)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (nome) DO UPDATE SET nome = EXCLUDED.nome
            RETURNING *
            "#,
        )
        .bind(&status.nome)
        .bind(&status.descricao)
        .bind(&status.cor_css)
        .bind(status.ordem)
        .bind(status.ativo)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    async fn create_status(&self, status: NovoStatus) -> StoreResult<StatusPedido> {
        sqlx::query_as::<_, StatusPedido>(
            r#"
            INSERT INTO status_pedido (nome, descricao, cor_css, ordem, ativo)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(&status.nome)
        .bind(&status.descricao)
        .bind(&status.cor_css)
        .bind(status.ordem)
        .bind(status.ativo)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                StoreError::Duplicate(format!("Status '{}' já existe", status.nome))
            } else {
                e.into()
            }
        })
    }

    async fn get_status(&self, id: i64) -> StoreResult<StatusPedido> {
        sqlx::query_as::<_, StatusPedido>("SELECT * FROM status_pedido WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| nao_encontrado("Status", id))
    }

    async fn list_status(&self, apenas_ativos: bool) -> StoreResult<Vec<StatusPedido>> {
        let rows = sqlx::query_as::<_, StatusPedido>(
            "SELECT * FROM status_pedido WHERE ($1 = FALSE OR ativo) ORDER BY ordem, id",
        )
        .bind(apenas_ativos)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn record_webhook(&self, webhook: NovoWebhook) -> StoreResult<Webhook> {
        let mut tx = self.pool.begin().await?;
        let row = Self::insert_webhook(&mut tx, &webhook).await?;
        tx.commit().await?;
        Ok(row)
    }

    async fn list_webhooks(&self, limit: u32) -> StoreResult<Vec<Webhook>> {
        let rows = sqlx::query_as::<_, Webhook>(
            "SELECT * FROM webhook ORDER BY recebido_em DESC, id DESC LIMIT $1",
        )
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn create_pedido_from_webhook(
        &self,
        webhook: NovoWebhook,
        pedido: NovoPedido,
        status_id: i64,
    ) -> StoreResult<(Webhook, Pedido)> {
        let mut tx = self.pool.begin().await?;

        let existente: Option<i64> = sqlx::query_scalar("SELECT id FROM pedido WHERE numero_pedido = $1")
            .bind(&pedido.numero_pedido)
            .fetch_optional(&mut *tx)
            .await?;
        if existente.is_some() {
            tx.rollback().await?;
            return Err(pedido_duplicado(&pedido.numero_pedido));
        }

        let webhook_row = Self::insert_webhook(&mut tx, &webhook).await?;

        let inserted: Result<i64, sqlx::Error> = sqlx::query_scalar(
            r#"
            INSERT INTO pedido (
                numero_pedido, titulo, valor_pedido, custo_envio, etiqueta_envio, metodo_envio,
                nome_cliente, documento_cliente, email_cliente, produtos, endereco_envio,
                informacoes_adicionais, status_id, webhook_id
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            RETURNING id
            "#,
        )
        .bind(&pedido.numero_pedido)
        .bind(&pedido.titulo)
        .bind(pedido.valor_pedido)
        .bind(pedido.custo_envio)
        .bind(&pedido.etiqueta_envio)
        .bind(&pedido.metodo_envio)
        .bind(&pedido.nome_cliente)
        .bind(&pedido.documento_cliente)
        .bind(&pedido.email_cliente)
        .bind(Json(&pedido.produtos))
        .bind(Json(&pedido.endereco_envio))
        .bind(Json(&pedido.informacoes_adicionais))
        .bind(status_id)
        .bind(webhook_row.id)
        .fetch_one(&mut *tx)
        .await;

        let pedido_id = match inserted {
            Ok(id) => id,
            // Corrida com outro webhook do mesmo pedido
            Err(e) if is_unique_violation(&e) => {
                tx.rollback().await?;
                return Err(pedido_duplicado(&pedido.numero_pedido));
            }
            Err(e) => return Err(e.into()),
        };

        let pedido_row = Self::fetch_pedido(&mut *tx, pedido_id).await?;
        tx.commit().await?;

        Ok((webhook_row, pedido_row))
    }

    async fn get_pedido(&self, id: i64) -> StoreResult<Pedido> {
        Self::fetch_pedido(&self.pool, id).await
    }

    async fn list_pedidos(&self, filtro: &PedidoFiltro) -> StoreResult<Pagina<Pedido>> {
        let mut count_qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM pedido p WHERE 1 = 1");
        aplicar_filtros(&mut count_qb, filtro);
        let count: i64 = count_qb.build_query_scalar().fetch_one(&self.pool).await?;

        let mut qb = QueryBuilder::<Postgres>::new(PEDIDO_SELECT);
        qb.push(" WHERE 1 = 1");
        aplicar_filtros(&mut qb, filtro);
        qb.push(" ORDER BY ")
            .push(filtro.ordenacao().sql())
            .push(" LIMIT ")
            .push_bind(i64::from(filtro.page_size()))
            .push(" OFFSET ")
            .push_bind(filtro.offset() as i64);

        let rows = qb.build_query_as::<Pedido>().fetch_all(&self.pool).await?;

        Ok(Pagina::new(rows, count.max(0) as u64, filtro))
    }

    async fn update_pedido_status(&self, pedido_id: i64, status_id: i64) -> StoreResult<Pedido> {
        let result = sqlx::query("UPDATE pedido SET status_id = $1, atualizado_em = NOW() WHERE id = $2")
            .bind(status_id)
            .bind(pedido_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(nao_encontrado("Pedido", pedido_id));
        }

        Self::fetch_pedido(&self.pool, pedido_id).await
    }

    async fn active_webhook_secret(&self) -> StoreResult<Option<String>> {
        let secret = sqlx::query_scalar(
            "SELECT secret_key FROM webhook_config WHERE ativo ORDER BY atualizado_em DESC, id DESC LIMIT 1",
        )
        .fetch_optional(&self.pool)
        .await?;
        Ok(secret)
    }

    async fn list_webhook_configs(&self) -> StoreResult<Vec<WebhookConfig>> {
        let rows = sqlx::query_as::<_, WebhookConfig>("SELECT * FROM webhook_config ORDER BY id DESC")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn create_webhook_config(&self, config: NovoWebhookConfig) -> StoreResult<WebhookConfig> {
        let row = sqlx::query_as::<_, WebhookConfig>(
            "INSERT INTO webhook_config (secret_key, ativo) VALUES ($1, $2) RETURNING *",
        )
        .bind(&config.secret_key)
        .bind(config.ativo)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    async fn list_endpoints(&self) -> StoreResult<Vec<WebhookEndpointConfig>> {
        let rows = sqlx::query_as::<_, WebhookEndpointConfig>(
            "SELECT * FROM webhook_endpoint_config ORDER BY nome, id",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn dispatch_endpoints(&self) -> StoreResult<Vec<WebhookEndpointConfig>> {
        let rows = sqlx::query_as::<_, WebhookEndpointConfig>(
            "SELECT * FROM webhook_endpoint_config WHERE ativo AND auto_enviar ORDER BY nome, id",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn get_endpoint(&self, id: i64) -> StoreResult<WebhookEndpointConfig> {
        sqlx::query_as::<_, WebhookEndpointConfig>("SELECT * FROM webhook_endpoint_config WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| nao_encontrado("Endpoint", id))
    }

    async fn create_endpoint(&self, dados: DadosEndpoint) -> StoreResult<WebhookEndpointConfig> {
        let row = sqlx::query_as::<_, WebhookEndpointConfig>(
            r#"
            INSERT INTO webhook_endpoint_config
                (nome, url, ativo, auto_enviar, access_token, token_autenticacao, headers_adicionais)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(&dados.nome)
        .bind(&dados.url)
        .bind(dados.ativo)
        .bind(dados.auto_enviar)
        .bind(&dados.access_token)
        .bind(&dados.token_autenticacao)
        .bind(&dados.headers_adicionais)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    async fn update_endpoint(&self, id: i64, dados: DadosEndpoint) -> StoreResult<WebhookEndpointConfig> {
        sqlx::query_as::<_, WebhookEndpointConfig>(
            r#"
            UPDATE webhook_endpoint_config
            SET nome = $1, url = $2, ativo = $3, auto_enviar = $4, access_token = $5,
                token_autenticacao = $6, headers_adicionais = $7, atualizado_em = NOW()
            WHERE id = $8
            RETURNING *
            "#,
        )
        .bind(&dados.nome)
        .bind(&dados.url)
        .bind(dados.ativo)
        .bind(dados.auto_enviar)
        .bind(&dados.access_token)
        .bind(&dados.token_autenticacao)
        .bind(&dados.headers_adicionais)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| nao_encontrado("Endpoint", id))
    }

    async fn delete_endpoint(&self, id: i64) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM webhook_endpoint_config WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(nao_encontrado("Endpoint", id));
        }
        Ok(())
    }

    async fn record_envio(&self, envio: NovoEnvio) -> StoreResult<WebhookStatusEnviado> {
        let row = sqlx::query_as::<_, WebhookStatusEnviado>(
            r#"
            INSERT INTO webhook_status_enviado
                (pedido_id, status, url_destino, payload, resposta, codigo_http, sucesso, tentativa_numero)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *
            "#,
        )
        .bind(envio.pedido_id)
        .bind(&envio.status)
        .bind(&envio.url_destino)
        .bind(&envio.payload)
        .bind(&envio.resposta)
        .bind(envio.codigo_http)
        .bind(envio.sucesso)
        .bind(envio.tentativa_numero)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    async fn list_envios(&self, pedido_id: i64) -> StoreResult<Vec<WebhookStatusEnviado>> {
        let rows = sqlx::query_as::<_, WebhookStatusEnviado>(
            "SELECT * FROM webhook_status_enviado WHERE pedido_id = $1 ORDER BY enviado_em DESC, id DESC",
        )
        .bind(pedido_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}

#[async_trait]
impl FormularioStore for PgStore {
    async fn create_formulario(&self, dados: NovoFormulario, cod_op: &str) -> StoreResult<Formulario> {
        let mut tx = self.pool.begin().await?;

        let inserted: Result<i64, sqlx::Error> = sqlx::query_scalar(
            r#"
            INSERT INTO formulario (
                marca, nome, email, unidade_nome, unidade_quantidade, titulo, data_entrega,
                observacoes, formato, cor_impressao, impressao, cod_op
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            RETURNING id
            "#,
        )
        .bind(dados.marca.slug())
        .bind(&dados.nome)
        .bind(&dados.email)
        .bind(&dados.unidade_nome)
        .bind(dados.unidade_quantidade)
        .bind(&dados.titulo)
        .bind(dados.data_entrega)
        .bind(&dados.observacoes)
        .bind(&dados.formato)
        .bind(&dados.cor_impressao)
        .bind(&dados.impressao)
        .bind(cod_op)
        .fetch_one(&mut *tx)
        .await;

        let id = match inserted {
            Ok(id) => id,
            Err(e) if is_unique_violation(&e) => {
                tx.rollback().await?;
                return Err(StoreError::Duplicate(format!("cod_op {} já existe", cod_op)));
            }
            Err(e) => return Err(e.into()),
        };

        Self::insert_unidades(&mut tx, id, &dados.unidades).await?;
        tx.commit().await?;

        self.get_formulario(dados.marca, cod_op).await
    }

    async fn get_formulario(&self, marca: Marca, cod_op: &str) -> StoreResult<Formulario> {
        let form = sqlx::query_as::<_, Formulario>(
            "SELECT * FROM formulario WHERE marca = $1 AND cod_op = $2",
        )
        .bind(marca.slug())
        .bind(cod_op)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| nao_encontrado("Formulário", cod_op))?;

        let mut forms = vec![form];
        self.load_children(&mut forms).await?;
        forms.pop().ok_or_else(|| nao_encontrado("Formulário", cod_op))
    }

    async fn list_formularios(&self, marca: Marca) -> StoreResult<Vec<Formulario>> {
        let mut forms = sqlx::query_as::<_, Formulario>(
            "SELECT * FROM formulario WHERE marca = $1 ORDER BY criado_em DESC, id DESC",
        )
        .bind(marca.slug())
        .fetch_all(&self.pool)
        .await?;

        self.load_children(&mut forms).await?;
        Ok(forms)
    }

    async fn update_formulario(
        &self,
        marca: Marca,
        cod_op: &str,
        patch: FormularioPatch,
    ) -> StoreResult<Formulario> {
        let mut tx = self.pool.begin().await?;

        let id: i64 = sqlx::query_scalar(
            r#"
            UPDATE formulario SET
                nome = COALESCE($1, nome),
                email = COALESCE($2, email),
                unidade_nome = COALESCE($3, unidade_nome),
                unidade_quantidade = COALESCE($4, unidade_quantidade),
                titulo = COALESCE($5, titulo),
                data_entrega = COALESCE($6, data_entrega),
                observacoes = COALESCE($7, observacoes),
                formato = COALESCE($8, formato),
                cor_impressao = COALESCE($9, cor_impressao),
                impressao = COALESCE($10, impressao),
                atualizado_em = NOW()
            WHERE marca = $11 AND cod_op = $12
            RETURNING id
            "#,
        )
        .bind(&patch.nome)
        .bind(&patch.email)
        .bind(&patch.unidade_nome)
        .bind(patch.unidade_quantidade)
        .bind(&patch.titulo)
        .bind(patch.data_entrega)
        .bind(&patch.observacoes)
        .bind(&patch.formato)
        .bind(&patch.cor_impressao)
        .bind(&patch.impressao)
        .bind(marca.slug())
        .bind(cod_op)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| nao_encontrado("Formulário", cod_op))?;

        if let Some(unidades) = &patch.unidades {
            sqlx::query("DELETE FROM unidade WHERE formulario_id = $1")
                .bind(id)
                .execute(&mut *tx)
                .await?;
            Self::insert_unidades(&mut tx, id, unidades).await?;
        }

        tx.commit().await?;
        self.get_formulario(marca, cod_op).await
    }

    async fn set_links(&self, formulario_id: i64, links: LinksFormulario) -> StoreResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE formulario
            SET link_download = $1, web_view_link = $2, json_link = $3, atualizado_em = NOW()
            WHERE id = $4
            "#,
        )
        .bind(&links.link_download)
        .bind(&links.web_view_link)
        .bind(&links.json_link)
        .bind(formulario_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(nao_encontrado("Formulário", formulario_id));
        }
        Ok(())
    }

    async fn add_arquivo(&self, formulario_id: i64, arquivo: NovoArquivo) -> StoreResult<ArquivoPdf> {
        let row = sqlx::query_as::<_, ArquivoPdf>(
            r#"
            INSERT INTO arquivo_pdf (formulario_id, nome, link_download, web_view_link, json_link)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(formulario_id)
        .bind(&arquivo.nome)
        .bind(&arquivo.link_download)
        .bind(&arquivo.web_view_link)
        .bind(&arquivo.json_link)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    async fn delete_formulario(&self, marca: Marca, cod_op: &str) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM formulario WHERE marca = $1 AND cod_op = $2")
            .bind(marca.slug())
            .bind(cod_op)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(nao_encontrado("Formulário", cod_op));
        }
        Ok(())
    }
}
