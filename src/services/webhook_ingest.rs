//! Recebimento dos webhooks de pedidos da Montink
//!
//! Fluxo: assinatura -> JSON -> validação -> gravação (webhook + pedido numa
//! transação). Toda rejeição também deixa um registro `Webhook` de auditoria.

use serde_json::{Map, Value};

use crate::config::settings::WebhookSettings;
use crate::models::{
    Designs, EnderecoEnvio, InformacoesAdicionais, Mockups, NovoPedido, NovoStatus, NovoWebhook,
    Pedido, PedidoPayload, Produto, EVENTO_PADRAO,
};
use crate::services::signature;
use crate::storage::PedidoStore;
use crate::utils::logging::*;
use crate::utils::{truncate_with_suffix, AppError, AppResult};

const PAIS_PADRAO: &str = "Brasil";

/// Processa um webhook recebido e devolve o pedido criado
pub async fn receber_pedido(
    store: &dyn PedidoStore,
    settings: &WebhookSettings,
    body: &[u8],
    assinatura: Option<&str>,
) -> AppResult<Pedido> {
    let payload_text = String::from_utf8_lossy(body).into_owned();
    let assinatura = assinatura.map(str::trim).filter(|s| !s.is_empty());

    let mut registro = NovoWebhook {
        evento: EVENTO_PADRAO.to_string(),
        payload: payload_text.clone(),
        assinatura: assinatura.map(str::to_string),
        ..Default::default()
    };

    // 1. Assinatura
    let secret = match store.active_webhook_secret().await? {
        Some(secret) if !secret.is_empty() => Some(secret),
        _ => settings.secret.clone().filter(|s| !s.is_empty()),
    };

    match (assinatura, secret.as_deref()) {
        (Some(sig), Some(secret)) => {
            if !signature::verify(body, sig, secret) {
                return Err(rejeitar(store, registro, AppError::Unauthorized("Assinatura inválida".to_string())).await);
            }
            registro.verificado = true;
        }
        // Assinatura sem secret para conferir nunca é aceita
        (Some(_), None) => {
            let err = AppError::Unauthorized("Nenhum secret de webhook configurado".to_string());
            return Err(rejeitar(store, registro, err).await);
        }
        (None, _) if settings.exigir_assinatura => {
            let err = AppError::Unauthorized("Assinatura ausente".to_string());
            return Err(rejeitar(store, registro, err).await);
        }
        _ => {
            log_warning("⚠️ Webhook aceito sem verificação de assinatura");
        }
    }

    // 2. JSON
    let raiz: Value = match serde_json::from_str(&payload_text) {
        Ok(v) => v,
        Err(e) => {
            log_warning(&format!(
                "Payload inválido: {}",
                truncate_with_suffix(&payload_text, 200, "...")
            ));
            let err = AppError::ValidationError(format!("JSON inválido: {}", e));
            return Err(rejeitar(store, registro, err).await);
        }
    };

    if let Some(evento) = raiz.get("evento").and_then(Value::as_str).filter(|e| !e.is_empty()) {
        registro.evento = evento.to_string();
    }
    log_webhook_received(&registro.evento, registro.verificado, body.len());

    // O pedido pode vir na raiz ou dentro de "pedido"
    let dados_pedido = match raiz.get("pedido") {
        Some(p @ Value::Object(_)) => p.clone(),
        _ => raiz.clone(),
    };

    // 3. Validação
    let novo = match validar_pedido(dados_pedido) {
        Ok(novo) => novo,
        Err(erros) => {
            log_validation_error("pedido", &erros.join("; "));
            let err = AppError::ValidationError(format!("Dados do pedido inválidos: {}", erros.join("; ")));
            return Err(rejeitar(store, registro, err).await);
        }
    };

    // 4. Gravação
    let status = match store.ensure_status(NovoStatus::inicial()).await {
        Ok(status) => status,
        Err(e) => return Err(rejeitar(store, registro, AppError::from(e)).await),
    };
    registro.status_code = Some(201);
    registro.processado = true;

    match store
        .create_pedido_from_webhook(registro.clone(), novo, status.id)
        .await
    {
        Ok((webhook, pedido)) => {
            log_info(&format!("Webhook #{} processado", webhook.id));
            log_pedido_created(pedido.id, &pedido.numero_pedido);
            Ok(pedido)
        }
        Err(e) => {
            registro.status_code = None;
            Err(rejeitar(store, registro, AppError::from(e)).await)
        }
    }
}

/// Grava o webhook rejeitado e devolve o erro original
async fn rejeitar(store: &dyn PedidoStore, registro: NovoWebhook, err: AppError) -> AppError {
    let mensagem = err.message();
    log_webhook_rejected(&mensagem);

    let registro = registro.rejeitado(err.status_code().as_u16(), mensagem);
    if let Err(e) = store.record_webhook(registro).await {
        log_error(&format!("Falha ao registrar webhook rejeitado: {}", e));
    }
    err
}

// ============================================================================
// Validação
// ============================================================================

/// Valida o pedido e lista todos os campos com problema de uma vez
pub fn validar_pedido(dados: Value) -> Result<NovoPedido, Vec<String>> {
    let payload: PedidoPayload = match serde_json::from_value(dados) {
        Ok(p) => p,
        Err(e) => return Err(vec![format!("estrutura do pedido: {}", e)]),
    };

    let mut erros = Vec::new();

    let numero_pedido = match &payload.numero_pedido {
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => {
            erros.push("numero_pedido: obrigatório".to_string());
            None
        }
    };

    if payload.valor_pedido.is_none() {
        erros.push("valor_pedido: obrigatório".to_string());
    }

    let nome_cliente = obrigatorio(&payload.nome_cliente, "nome_cliente", &mut erros);
    let documento_cliente = obrigatorio(&payload.documento_cliente, "documento_cliente", &mut erros);
    let email_cliente = obrigatorio(&payload.email_cliente, "email_cliente", &mut erros);

    let endereco = validar_endereco(payload.endereco_envio.as_ref(), &mut erros);
    let informacoes = validar_informacoes(payload.informacoes_adicionais.as_ref(), &mut erros);
    let produtos = validar_produtos(payload.produtos.as_deref(), &mut erros);

    if !erros.is_empty() {
        return Err(erros);
    }

    // Sem erros, todos os obrigatórios estão presentes
    match (numero_pedido, payload.valor_pedido, endereco, informacoes) {
        (Some(numero_pedido), Some(valor_pedido), Some(endereco_envio), Some(informacoes_adicionais)) => {
            let titulo = payload
                .titulo
                .filter(|t| !t.trim().is_empty())
                .unwrap_or_else(|| format!("Pedido #{}", numero_pedido));
            Ok(NovoPedido {
                numero_pedido,
                titulo,
                valor_pedido,
                custo_envio: payload.custo_envio,
                etiqueta_envio: payload.etiqueta_envio,
                metodo_envio: payload.metodo_envio,
                nome_cliente,
                documento_cliente,
                email_cliente,
                produtos,
                endereco_envio,
                informacoes_adicionais,
            })
        }
        _ => Err(vec!["pedido incompleto".to_string()]),
    }
}

fn obrigatorio(valor: &Option<String>, campo: &str, erros: &mut Vec<String>) -> String {
    match valor.as_deref().map(str::trim) {
        Some(v) if !v.is_empty() => v.to_string(),
        _ => {
            erros.push(format!("{}: obrigatório", campo));
            String::new()
        }
    }
}

/// Texto de um campo do objeto; números são aceitos e convertidos
fn texto(obj: &Map<String, Value>, campo: &str) -> Option<String> {
    match obj.get(campo) {
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    }
}

fn texto_obrigatorio(obj: &Map<String, Value>, prefixo: &str, campo: &str, erros: &mut Vec<String>) -> String {
    texto(obj, campo).unwrap_or_else(|| {
        erros.push(format!("{}.{}: obrigatório", prefixo, campo));
        String::new()
    })
}

fn validar_endereco(valor: Option<&Value>, erros: &mut Vec<String>) -> Option<EnderecoEnvio> {
    let Some(obj) = valor.and_then(Value::as_object) else {
        erros.push("endereco_envio: obrigatório".to_string());
        return None;
    };

    let p = "endereco_envio";
    let endereco = EnderecoEnvio {
        nome_destinatario: texto_obrigatorio(obj, p, "nome_destinatario", erros),
        endereco: texto_obrigatorio(obj, p, "endereco", erros),
        numero: texto_obrigatorio(obj, p, "numero", erros),
        complemento: texto(obj, "complemento"),
        cidade: texto_obrigatorio(obj, p, "cidade", erros),
        uf: texto_obrigatorio(obj, p, "uf", erros).to_uppercase(),
        cep: texto_obrigatorio(obj, p, "cep", erros),
        bairro: texto_obrigatorio(obj, p, "bairro", erros),
        telefone: texto_obrigatorio(obj, p, "telefone", erros),
        pais: texto(obj, "pais").unwrap_or_else(|| PAIS_PADRAO.to_string()),
    };

    if !endereco.uf.is_empty()
        && (endereco.uf.chars().count() != 2 || !endereco.uf.chars().all(|c| c.is_ascii_alphabetic()))
    {
        erros.push("endereco_envio.uf: deve ter 2 letras".to_string());
    }

    Some(endereco)
}

fn validar_informacoes(valor: Option<&Value>, erros: &mut Vec<String>) -> Option<InformacoesAdicionais> {
    let Some(obj) = valor.and_then(Value::as_object) else {
        erros.push("informacoes_adicionais: obrigatório".to_string());
        return None;
    };

    let p = "informacoes_adicionais";
    Some(InformacoesAdicionais {
        nome: texto_obrigatorio(obj, p, "nome", erros),
        telefone: texto_obrigatorio(obj, p, "telefone", erros),
        email: texto_obrigatorio(obj, p, "email", erros),
    })
}

fn validar_produtos(valor: Option<&[Value]>, erros: &mut Vec<String>) -> Vec<Produto> {
    let itens = match valor {
        Some(itens) if !itens.is_empty() => itens,
        _ => {
            erros.push("produtos: informe ao menos um produto".to_string());
            return Vec::new();
        }
    };

    let mut produtos = Vec::with_capacity(itens.len());
    for (i, item) in itens.iter().enumerate() {
        let p = format!("produtos[{}]", i);
        let Some(obj) = item.as_object() else {
            erros.push(format!("{}: deve ser um objeto", p));
            continue;
        };

        let nome = texto_obrigatorio(obj, &p, "nome", erros);
        let sku = texto_obrigatorio(obj, &p, "sku", erros);

        let quantidade = obj.get("quantidade").and_then(Value::as_i64).unwrap_or(0);
        if quantidade <= 0 || quantidade > i64::from(i32::MAX) {
            erros.push(format!("{}.quantidade: deve ser maior que zero", p));
        }

        let designs = obj.get("designs").and_then(Value::as_object);
        let capa_frente_design = designs.and_then(|d| texto(d, "capa_frente"));
        if capa_frente_design.is_none() {
            erros.push(format!("{}.designs.capa_frente: obrigatório", p));
        }

        let mockups = obj.get("mockups").and_then(Value::as_object);
        let capa_frente_mockup = mockups.and_then(|m| texto(m, "capa_frente"));
        if capa_frente_mockup.is_none() {
            erros.push(format!("{}.mockups.capa_frente: obrigatório", p));
        }

        produtos.push(Produto {
            nome,
            sku,
            quantidade: i32::try_from(quantidade).unwrap_or(0),
            id_sku: texto(obj, "id_sku"),
            arquivo_pdf: texto(obj, "arquivo_pdf"),
            designs: Designs {
                capa_frente: capa_frente_design.unwrap_or_default(),
                capa_verso: designs.and_then(|d| texto(d, "capa_verso")),
            },
            mockups: Mockups {
                capa_frente: capa_frente_mockup.unwrap_or_default(),
                capa_costas: mockups.and_then(|m| texto(m, "capa_costas")),
            },
        });
    }

    produtos
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        DadosEndpoint, NovoEnvio, NovoWebhookConfig, Pagina, PedidoFiltro, StatusPedido, Webhook,
        WebhookConfig, WebhookEndpointConfig, WebhookStatusEnviado,
    };
    use crate::storage::{MemoryStore, StoreError, StoreResult};
    use rust_decimal::Decimal;
    use serde_json::json;

    fn pedido_json(numero: Value) -> Value {
        json!({
            "numero_pedido": numero,
            "valor_pedido": "149.90",
            "custo_envio": 15.5,
            "metodo_envio": "SEDEX",
            "nome_cliente": "Maria Silva",
            "documento_cliente": "123.456.789-00",
            "email_cliente": "maria@example.com",
            "produtos": [{
                "nome": "Caderno personalizado",
                "sku": "CAD-001",
                "quantidade": 2,
                "designs": {"capa_frente": "https://cdn.example.com/d/frente.png"},
                "mockups": {"capa_frente": "https://cdn.example.com/m/frente.png"}
            }],
            "endereco_envio": {
                "nome_destinatario": "Maria Silva",
                "endereco": "Rua das Flores",
                "numero": 100,
                "cidade": "Niterói",
                "uf": "rj",
                "cep": "24000-000",
                "bairro": "Icaraí",
                "telefone": "21999990000"
            },
            "informacoes_adicionais": {
                "nome": "Maria",
                "telefone": "21999990000",
                "email": "maria@example.com"
            }
        })
    }

    fn settings(secret: Option<&str>, exigir: bool) -> WebhookSettings {
        WebhookSettings {
            secret: secret.map(str::to_string),
            exigir_assinatura: exigir,
            ..Default::default()
        }
    }

    #[test]
    fn test_validar_pedido_normalizes_fields() {
        let novo = validar_pedido(pedido_json(json!(12345))).unwrap();
        assert_eq!(novo.numero_pedido, "12345");
        assert_eq!(novo.titulo, "Pedido #12345");
        assert_eq!(novo.valor_pedido, Decimal::new(14990, 2));
        assert_eq!(novo.endereco_envio.uf, "RJ");
        assert_eq!(novo.endereco_envio.numero, "100");
        assert_eq!(novo.endereco_envio.pais, "Brasil");
        assert_eq!(novo.produtos[0].quantidade, 2);
    }

    #[test]
    fn test_validar_pedido_lists_every_problem() {
        let mut dados = pedido_json(json!("A-1"));
        dados["email_cliente"] = json!("");
        dados["endereco_envio"]["uf"] = json!("RJX");
        dados["produtos"][0]["quantidade"] = json!(0);
        dados["produtos"][0]["mockups"] = json!({});

        let erros = validar_pedido(dados).unwrap_err();
        assert!(erros.iter().any(|e| e.starts_with("email_cliente")));
        assert!(erros.iter().any(|e| e.starts_with("endereco_envio.uf")));
        assert!(erros.iter().any(|e| e.starts_with("produtos[0].quantidade")));
        assert!(erros.iter().any(|e| e.starts_with("produtos[0].mockups.capa_frente")));
    }

    #[test]
    fn test_validar_pedido_requires_products() {
        let mut dados = pedido_json(json!("A-1"));
        dados["produtos"] = json!([]);
        let erros = validar_pedido(dados).unwrap_err();
        assert_eq!(erros, vec!["produtos: informe ao menos um produto".to_string()]);
    }

    #[tokio::test]
    async fn test_signed_webhook_creates_pedido() {
        let store = MemoryStore::new();
        let body = serde_json::to_vec(&pedido_json(json!("12345"))).unwrap();
        let sig = signature::sign(&body, "segredo");

        let pedido = receber_pedido(&store, &settings(Some("segredo"), true), &body, Some(&sig))
            .await
            .unwrap();

        assert_eq!(pedido.numero_pedido, "12345");
        assert_eq!(pedido.status_nome, "Pedido Novo");
        let webhooks = store.list_webhooks(10).await.unwrap();
        assert_eq!(webhooks.len(), 1);
        assert!(webhooks[0].verificado);
        assert!(webhooks[0].processado);
        assert_eq!(webhooks[0].evento, "pedido.novo");
    }

    #[tokio::test]
    async fn test_duplicate_numero_is_conflict() {
        let store = MemoryStore::new();
        let cfg = settings(Some("segredo"), true);
        let body = serde_json::to_vec(&pedido_json(json!("12345"))).unwrap();
        let sig = signature::sign(&body, "segredo");

        receber_pedido(&store, &cfg, &body, Some(&sig)).await.unwrap();
        let err = receber_pedido(&store, &cfg, &body, Some(&sig)).await.unwrap_err();

        assert!(matches!(err, AppError::Conflict(_)));
        assert!(err.message().contains("Pedido com número 12345 já existe"));

        let webhooks = store.list_webhooks(10).await.unwrap();
        assert_eq!(webhooks.len(), 2);
        assert_eq!(webhooks[0].status_code, Some(409));
        assert!(!webhooks[0].processado);
    }

    #[tokio::test]
    async fn test_bad_signature_is_rejected_and_recorded() {
        let store = MemoryStore::new();
        let body = serde_json::to_vec(&pedido_json(json!("1"))).unwrap();

        let err = receber_pedido(&store, &settings(Some("segredo"), false), &body, Some("deadbeef"))
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Unauthorized(_)));
        let webhooks = store.list_webhooks(10).await.unwrap();
        assert_eq!(webhooks[0].status_code, Some(401));
        assert!(store.list_pedidos(&Default::default()).await.unwrap().results.is_empty());
    }

    #[tokio::test]
    async fn test_missing_signature_depends_on_setting() {
        let store = MemoryStore::new();
        let body = serde_json::to_vec(&pedido_json(json!("7"))).unwrap();

        let err = receber_pedido(&store, &settings(Some("segredo"), true), &body, None)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));

        let pedido = receber_pedido(&store, &settings(Some("segredo"), false), &body, None)
            .await
            .unwrap();
        assert_eq!(pedido.numero_pedido, "7");
        let webhooks = store.list_webhooks(1).await.unwrap();
        assert!(!webhooks[0].verificado);
    }

    #[tokio::test]
    async fn test_signature_without_secret_is_always_rejected() {
        let store = MemoryStore::new();
        let body = serde_json::to_vec(&pedido_json(json!("9"))).unwrap();

        for exigir in [true, false] {
            let err = receber_pedido(&store, &settings(None, exigir), &body, Some("deadbeef"))
                .await
                .unwrap_err();
            assert!(matches!(err, AppError::Unauthorized(_)));
        }

        let webhooks = store.list_webhooks(10).await.unwrap();
        assert_eq!(webhooks.len(), 2);
        assert!(webhooks.iter().all(|w| w.status_code == Some(401) && !w.processado));
        assert_eq!(
            store.list_pedidos(&Default::default()).await.unwrap().count,
            0
        );
    }

    #[tokio::test]
    async fn test_database_secret_takes_precedence() {
        let store = MemoryStore::new();
        store
            .create_webhook_config(crate::models::NovoWebhookConfig {
                secret_key: "do-banco".to_string(),
                ativo: true,
            })
            .await
            .unwrap();
        let body = serde_json::to_vec(&pedido_json(json!("8"))).unwrap();

        let sig = signature::sign(&body, "do-arquivo");
        let err = receber_pedido(&store, &settings(Some("do-arquivo"), true), &body, Some(&sig))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));

        let sig = signature::sign(&body, "do-banco");
        assert!(receber_pedido(&store, &settings(Some("do-arquivo"), true), &body, Some(&sig))
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_nested_pedido_and_custom_evento() {
        let store = MemoryStore::new();
        let body = serde_json::to_vec(&json!({
            "evento": "pedido.criado",
            "pedido": pedido_json(json!("55"))
        }))
        .unwrap();
        let sig = signature::sign(&body, "s");

        let pedido = receber_pedido(&store, &settings(Some("s"), true), &body, Some(&sig))
            .await
            .unwrap();
        assert_eq!(pedido.numero_pedido, "55");
        assert_eq!(store.list_webhooks(1).await.unwrap()[0].evento, "pedido.criado");
    }

    #[tokio::test]
    async fn test_invalid_json_is_bad_request() {
        let store = MemoryStore::new();
        let body = b"{not json";
        let sig = signature::sign(body, "s");

        let err = receber_pedido(&store, &settings(Some("s"), true), body, Some(&sig))
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), axum::http::StatusCode::BAD_REQUEST);
        assert_eq!(store.list_webhooks(1).await.unwrap()[0].status_code, Some(400));
    }

    /// Store que falha ao gravar o pedido, delegando o resto à memória
    struct StoreSemGravacao(MemoryStore);

    #[async_trait::async_trait]
    impl PedidoStore for StoreSemGravacao {
        async fn ping(&self) -> StoreResult<()> {
            self.0.ping().await
        }
        async fn ensure_status(&self, status: NovoStatus) -> StoreResult<StatusPedido> {
            self.0.ensure_status(status).await
        }
        async fn create_status(&self, status: NovoStatus) -> StoreResult<StatusPedido> {
            self.0.create_status(status).await
        }
        async fn get_status(&self, id: i64) -> StoreResult<StatusPedido> {
            self.0.get_status(id).await
        }
        async fn list_status(&self, apenas_ativos: bool) -> StoreResult<Vec<StatusPedido>> {
            self.0.list_status(apenas_ativos).await
        }
        async fn record_webhook(&self, webhook: NovoWebhook) -> StoreResult<Webhook> {
            self.0.record_webhook(webhook).await
        }
        async fn list_webhooks(&self, limit: u32) -> StoreResult<Vec<Webhook>> {
            self.0.list_webhooks(limit).await
        }
        async fn create_pedido_from_webhook(
            &self,
            _webhook: NovoWebhook,
            _pedido: NovoPedido,
            _status_id: i64,
        ) -> StoreResult<(Webhook, Pedido)> {
            Err(StoreError::Database(sqlx::Error::PoolTimedOut))
        }
        async fn get_pedido(&self, id: i64) -> StoreResult<Pedido> {
            self.0.get_pedido(id).await
        }
        async fn list_pedidos(&self, filtro: &PedidoFiltro) -> StoreResult<Pagina<Pedido>> {
            self.0.list_pedidos(filtro).await
        }
        async fn update_pedido_status(&self, pedido_id: i64, status_id: i64) -> StoreResult<Pedido> {
            self.0.update_pedido_status(pedido_id, status_id).await
        }
        async fn active_webhook_secret(&self) -> StoreResult<Option<String>> {
            self.0.active_webhook_secret().await
        }
        async fn list_webhook_configs(&self) -> StoreResult<Vec<WebhookConfig>> {
            self.0.list_webhook_configs().await
        }
        async fn create_webhook_config(&self, config: NovoWebhookConfig) -> StoreResult<WebhookConfig> {
            self.0.create_webhook_config(config).await
        }
        async fn list_endpoints(&self) -> StoreResult<Vec<WebhookEndpointConfig>> {
            self.0.list_endpoints().await
        }
        async fn dispatch_endpoints(&self) -> StoreResult<Vec<WebhookEndpointConfig>> {
            self.0.dispatch_endpoints().await
        }
        async fn get_endpoint(&self, id: i64) -> StoreResult<WebhookEndpointConfig> {
            self.0.get_endpoint(id).await
        }
        async fn create_endpoint(&self, dados: DadosEndpoint) -> StoreResult<WebhookEndpointConfig> {
            self.0.create_endpoint(dados).await
        }
        async fn update_endpoint(&self, id: i64, dados: DadosEndpoint) -> StoreResult<WebhookEndpointConfig> {
            self.0.update_endpoint(id, dados).await
        }
        async fn delete_endpoint(&self, id: i64) -> StoreResult<()> {
            self.0.delete_endpoint(id).await
        }
        async fn record_envio(&self, envio: NovoEnvio) -> StoreResult<WebhookStatusEnviado> {
            self.0.record_envio(envio).await
        }
        async fn list_envios(&self, pedido_id: i64) -> StoreResult<Vec<WebhookStatusEnviado>> {
            self.0.list_envios(pedido_id).await
        }
    }

    #[tokio::test]
    async fn test_storage_failure_is_recorded() {
        let store = StoreSemGravacao(MemoryStore::new());
        let body = serde_json::to_vec(&pedido_json(json!("77"))).unwrap();
        let sig = signature::sign(&body, "s");

        let err = receber_pedido(&store, &settings(Some("s"), true), &body, Some(&sig))
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), axum::http::StatusCode::INTERNAL_SERVER_ERROR);

        let webhooks = store.list_webhooks(1).await.unwrap();
        assert_eq!(webhooks.len(), 1);
        assert_eq!(webhooks[0].status_code, Some(500));
        assert!(!webhooks[0].processado);
        assert!(webhooks[0].verificado);
    }
}
