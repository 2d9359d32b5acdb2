//! Envio das mudanças de status para os endpoints configurados
//!
//! O status do pedido só muda quando todos os envios dão certo. Sem endpoints
//! ativos a mudança é sempre aplicada. Cada tentativa vira uma linha de
//! `WebhookStatusEnviado`, com ou sem sucesso.

use std::time::Duration;

use chrono::Utc;
use serde::Serialize;
use serde_json::json;

use crate::config::settings::WebhookSettings;
use crate::models::{NovoEnvio, Pedido, StatusPedido, WebhookEndpointConfig, WebhookStatusEnviado};
use crate::storage::PedidoStore;
use crate::utils::logging::*;
use crate::utils::{truncate_chars, AppError, AppResult};

/// Resultado do envio de um status para todos os endpoints
#[derive(Debug, Clone, Serialize)]
pub struct ResultadoEnvio {
    pub total: usize,
    pub sucessos: usize,
    pub falhas: usize,
    pub envios: Vec<WebhookStatusEnviado>,
}

impl ResultadoEnvio {
    pub fn todos_ok(&self) -> bool {
        self.falhas == 0
    }
}

/// Resultado de uma mudança de status
#[derive(Debug, Clone, Serialize)]
pub struct AtualizacaoStatus {
    pub pedido: Pedido,
    /// `false` quando algum envio falhou e o status foi mantido
    pub aplicado: bool,
    pub envio: ResultadoEnvio,
}

/// Item do resultado de uma atualização em lote
#[derive(Debug, Clone, Serialize)]
pub struct ItemLote {
    pub pedido_id: i64,
    pub aplicado: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub erro: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub envio: Option<ResultadoEnvio>,
}

#[derive(Clone)]
pub struct StatusDispatcher {
    http_client: reqwest::Client,
    max_resposta_chars: usize,
}

impl StatusDispatcher {
    pub fn new(settings: &WebhookSettings) -> AppResult<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_envio_segundos))
            .build()
            .map_err(|e| AppError::ConfigError(format!("Falha ao criar cliente HTTP: {}", e)))?;

        Ok(Self {
            http_client,
            max_resposta_chars: settings.max_resposta_chars,
        })
    }

    /// Corpo enviado a cada endpoint
    pub fn payload(pedido: &Pedido, status: &StatusPedido, endpoint: &WebhookEndpointConfig) -> serde_json::Value {
        json!({
            "data": Utc::now().to_rfc3339(),
            "access_token": endpoint.access_token.clone().unwrap_or_default(),
            "json": {
                "casa_grafica_id": pedido.id.to_string(),
                "status_id": status.id,
                "status": status.nome,
            }
        })
    }

    /// Envia `status` do pedido para todos os endpoints `ativo && auto_enviar`
    ///
    /// Não altera o pedido. Erros de transporte e respostas não-2xx contam
    /// como falha e ficam registrados na auditoria.
    pub async fn enviar(
        &self,
        store: &dyn PedidoStore,
        pedido: &Pedido,
        status: &StatusPedido,
    ) -> AppResult<ResultadoEnvio> {
        let endpoints = store.dispatch_endpoints().await?;
        log_status_dispatch(pedido.id, &status.nome, endpoints.len());

        let anteriores = if endpoints.is_empty() {
            Vec::new()
        } else {
            store.list_envios(pedido.id).await?
        };

        let mut resultado = ResultadoEnvio {
            total: endpoints.len(),
            sucessos: 0,
            falhas: 0,
            envios: Vec::with_capacity(endpoints.len()),
        };

        for endpoint in &endpoints {
            let tentativa = anteriores
                .iter()
                .filter(|e| e.url_destino == endpoint.url && e.status == status.nome)
                .count() as i32
                + 1;

            let envio = self.enviar_para(pedido, status, endpoint, tentativa).await;
            let registro = store.record_envio(envio).await?;

            if registro.sucesso {
                resultado.sucessos += 1;
            } else {
                resultado.falhas += 1;
            }
            resultado.envios.push(registro);
        }

        Ok(resultado)
    }

    async fn enviar_para(
        &self,
        pedido: &Pedido,
        status: &StatusPedido,
        endpoint: &WebhookEndpointConfig,
        tentativa_numero: i32,
    ) -> NovoEnvio {
        let payload = Self::payload(pedido, status, endpoint).to_string();
        self.postar(endpoint, pedido.id, &status.nome, payload, tentativa_numero)
            .await
    }

    /// POST do corpo já serializado; monta a linha de auditoria
    async fn postar(
        &self,
        endpoint: &WebhookEndpointConfig,
        pedido_id: i64,
        status: &str,
        payload: String,
        tentativa_numero: i32,
    ) -> NovoEnvio {
        let mut request = self.http_client.post(&endpoint.url).body(payload.clone());
        for (name, value) in endpoint.headers() {
            request = request.header(name, value);
        }

        let (codigo_http, resposta, sucesso) = match request.send().await {
            Ok(response) => {
                let code = response.status();
                let text = response.text().await.unwrap_or_default();
                (Some(code.as_u16()), text, code.is_success())
            }
            Err(e) => {
                log_error(&format!("Erro ao enviar webhook para {}: {}", endpoint.url, e));
                (None, e.to_string(), false)
            }
        };

        log_delivery_result(&endpoint.nome, codigo_http, sucesso);

        NovoEnvio {
            pedido_id,
            status: status.to_string(),
            url_destino: endpoint.url.clone(),
            payload,
            resposta: Some(truncate_chars(&resposta, self.max_resposta_chars).to_string()),
            codigo_http: codigo_http.map(i32::from),
            sucesso,
            tentativa_numero,
        }
    }

    /// Envio manual de um corpo livre para um endpoint
    ///
    /// Sem `endpoint_id` usa o primeiro endpoint `ativo && auto_enviar` (por
    /// nome). Não altera o pedido; a tentativa fica registrada na auditoria.
    pub async fn enviar_manual(
        &self,
        store: &dyn PedidoStore,
        pedido_id: i64,
        status: &str,
        payload: &serde_json::Value,
        endpoint_id: Option<i64>,
    ) -> AppResult<WebhookStatusEnviado> {
        let pedido = store.get_pedido(pedido_id).await?;

        let endpoint = match endpoint_id {
            Some(id) => store
                .get_endpoint(id)
                .await
                .ok()
                .filter(|e| e.ativo)
                .ok_or_else(|| {
                    AppError::NotFound(format!("Endpoint com ID {} não encontrado ou inativo", id))
                })?,
            None => store
                .dispatch_endpoints()
                .await?
                .into_iter()
                .next()
                .ok_or_else(|| {
                    AppError::ValidationError("Nenhum endpoint ativo configurado para envio".to_string())
                })?,
        };

        let tentativa = store
            .list_envios(pedido.id)
            .await?
            .iter()
            .filter(|e| e.url_destino == endpoint.url && e.status == status)
            .count() as i32
            + 1;

        log_info(&format!(
            "📤 Envio manual do pedido {} ({}) para '{}'",
            pedido.id, status, endpoint.nome
        ));
        let envio = self
            .postar(&endpoint, pedido.id, status, payload.to_string(), tentativa)
            .await;
        Ok(store.record_envio(envio).await?)
    }

    /// Envia o novo status e só então grava a mudança, se todos confirmaram
    pub async fn atualizar_status(
        &self,
        store: &dyn PedidoStore,
        pedido_id: i64,
        status_id: i64,
    ) -> AppResult<AtualizacaoStatus> {
        let pedido = store.get_pedido(pedido_id).await?;
        let status = store.get_status(status_id).await?;

        let envio = self.enviar(store, &pedido, &status).await?;

        if !envio.todos_ok() {
            log_warning(&format!(
                "⚠️ Status do pedido #{} mantido em '{}': {} de {} envio(s) falharam",
                pedido.id, pedido.status_nome, envio.falhas, envio.total
            ));
            return Ok(AtualizacaoStatus {
                pedido,
                aplicado: false,
                envio,
            });
        }

        let pedido = store.update_pedido_status(pedido_id, status_id).await?;
        log_info(&format!("✅ Pedido #{} agora está em '{}'", pedido.id, pedido.status_nome));

        Ok(AtualizacaoStatus {
            pedido,
            aplicado: true,
            envio,
        })
    }

    /// Reenvia o status atual sem alterá-lo
    pub async fn reenviar(&self, store: &dyn PedidoStore, pedido_id: i64) -> AppResult<ResultadoEnvio> {
        let pedido = store.get_pedido(pedido_id).await?;
        let status = store.get_status(pedido.status_id).await?;
        self.enviar(store, &pedido, &status).await
    }

    /// Aplica o mesmo status a vários pedidos, um de cada vez
    pub async fn atualizar_lote(
        &self,
        store: &dyn PedidoStore,
        pedido_ids: &[i64],
        status_id: i64,
    ) -> AppResult<Vec<ItemLote>> {
        // Status inexistente invalida o lote inteiro
        store.get_status(status_id).await?;

        let mut itens = Vec::with_capacity(pedido_ids.len());
        for &pedido_id in pedido_ids {
            let item = match self.atualizar_status(store, pedido_id, status_id).await {
                Ok(r) => ItemLote {
                    pedido_id,
                    aplicado: r.aplicado,
                    erro: (!r.aplicado).then(|| "Falha no envio para um ou mais endpoints".to_string()),
                    envio: Some(r.envio),
                },
                Err(e) => ItemLote {
                    pedido_id,
                    aplicado: false,
                    erro: Some(e.message()),
                    envio: None,
                },
            };
            itens.push(item);
        }

        Ok(itens)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        DadosEndpoint, EnderecoEnvio, InformacoesAdicionais, NovoPedido, NovoStatus, NovoWebhook,
    };
    use crate::storage::MemoryStore;
    use httpmock::prelude::*;
    use rust_decimal::Decimal;

    async fn store_com_pedido() -> (MemoryStore, Pedido, StatusPedido) {
        let store = MemoryStore::new();
        let inicial = store.ensure_status(NovoStatus::inicial()).await.unwrap();
        let novo = NovoPedido {
            numero_pedido: "12345".to_string(),
            titulo: "Pedido #12345".to_string(),
            valor_pedido: Decimal::new(10000, 2),
            custo_envio: None,
            etiqueta_envio: None,
            metodo_envio: None,
            nome_cliente: "Maria".to_string(),
            documento_cliente: "1".to_string(),
            email_cliente: "maria@example.com".to_string(),
            produtos: Vec::new(),
            endereco_envio: EnderecoEnvio {
                nome_destinatario: "Maria".to_string(),
                endereco: "Rua".to_string(),
                numero: "1".to_string(),
                complemento: None,
                cidade: "Rio".to_string(),
                uf: "RJ".to_string(),
                cep: "20000-000".to_string(),
                bairro: "Centro".to_string(),
                telefone: "21".to_string(),
                pais: "Brasil".to_string(),
            },
            informacoes_adicionais: InformacoesAdicionais {
                nome: "Maria".to_string(),
                telefone: "21".to_string(),
                email: "maria@example.com".to_string(),
            },
        };
        let (_, pedido) = store
            .create_pedido_from_webhook(NovoWebhook::default(), novo, inicial.id)
            .await
            .unwrap();

        let producao = store
            .create_status(NovoStatus {
                nome: "Em Produção".to_string(),
                descricao: None,
                cor_css: "#f39c12".to_string(),
                ordem: 2,
                ativo: true,
            })
            .await
            .unwrap();

        (store, pedido, producao)
    }

    async fn add_endpoint(store: &MemoryStore, nome: &str, url: String, token: Option<&str>) {
        store
            .create_endpoint(DadosEndpoint {
                nome: nome.to_string(),
                url,
                ativo: true,
                auto_enviar: true,
                access_token: Some("acc-123".to_string()),
                token_autenticacao: token.map(str::to_string),
                headers_adicionais: Some(r#"{"X-Origem": "cdg"}"#.to_string()),
            })
            .await
            .unwrap();
    }

    fn dispatcher() -> StatusDispatcher {
        StatusDispatcher::new(&WebhookSettings::default()).unwrap()
    }

    #[tokio::test]
    async fn test_no_endpoints_always_applies() {
        let (store, pedido, producao) = store_com_pedido().await;

        let r = dispatcher()
            .atualizar_status(&store, pedido.id, producao.id)
            .await
            .unwrap();

        assert!(r.aplicado);
        assert_eq!(r.envio.total, 0);
        assert_eq!(store.get_pedido(pedido.id).await.unwrap().status_nome, "Em Produção");
        assert!(store.list_envios(pedido.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_all_deliveries_ok_applies_status() {
        let (store, pedido, producao) = store_com_pedido().await;

        let server = MockServer::start_async().await;
        let corpo_esperado = json!({
            "access_token": "acc-123",
            "json": {
                "casa_grafica_id": pedido.id.to_string(),
                "status_id": producao.id,
                "status": "Em Produção"
            }
        });
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/status")
                    .header("Authorization", "Bearer tok")
                    .header("X-Origem", "cdg")
                    .json_body_partial(corpo_esperado.to_string());
                then.status(200).body("ok");
            })
            .await;
        add_endpoint(&store, "ERP", server.url("/status"), Some("tok")).await;

        let r = dispatcher()
            .atualizar_status(&store, pedido.id, producao.id)
            .await
            .unwrap();

        assert!(r.aplicado);
        assert_eq!(r.envio.sucessos, 1);
        assert_eq!(r.pedido.status_id, producao.id);
        mock.assert_hits_async(1).await;

        let envios = store.list_envios(pedido.id).await.unwrap();
        assert_eq!(envios.len(), 1);
        assert!(envios[0].sucesso);
        assert_eq!(envios[0].codigo_http, Some(200));
        assert_eq!(envios[0].resposta.as_deref(), Some("ok"));
    }

    #[tokio::test]
    async fn test_one_failure_keeps_status() {
        let ok = MockServer::start_async().await;
        ok.mock_async(|when, then| {
            when.method(POST);
            then.status(204);
        })
        .await;
        let falha = MockServer::start_async().await;
        falha
            .mock_async(|when, then| {
                when.method(POST);
                then.status(500).body("x".repeat(5000));
            })
            .await;

        let (store, pedido, producao) = store_com_pedido().await;
        add_endpoint(&store, "A", ok.url("/"), None).await;
        add_endpoint(&store, "B", falha.url("/"), None).await;

        let r = dispatcher()
            .atualizar_status(&store, pedido.id, producao.id)
            .await
            .unwrap();

        assert!(!r.aplicado);
        assert_eq!(r.envio.sucessos, 1);
        assert_eq!(r.envio.falhas, 1);
        assert_eq!(store.get_pedido(pedido.id).await.unwrap().status_nome, "Pedido Novo");

        let envios = store.list_envios(pedido.id).await.unwrap();
        assert_eq!(envios.len(), 2);
        let falhou = envios.iter().find(|e| !e.sucesso).unwrap();
        assert_eq!(falhou.codigo_http, Some(500));
        assert_eq!(falhou.resposta.as_ref().unwrap().chars().count(), 1000);
    }

    #[tokio::test]
    async fn test_transport_error_is_recorded() {
        let (store, pedido, producao) = store_com_pedido().await;
        // Porta fechada
        add_endpoint(&store, "Fora do ar", "http://127.0.0.1:1/status".to_string(), None).await;

        let r = dispatcher()
            .atualizar_status(&store, pedido.id, producao.id)
            .await
            .unwrap();

        assert!(!r.aplicado);
        let envios = store.list_envios(pedido.id).await.unwrap();
        assert_eq!(envios[0].codigo_http, None);
        assert!(!envios[0].sucesso);
        assert!(envios[0].resposta.is_some());
    }

    #[tokio::test]
    async fn test_reenviar_counts_attempts_and_keeps_status() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST).path("/hook");
                then.status(200);
            })
            .await;

        let (store, pedido, _) = store_com_pedido().await;
        add_endpoint(&store, "ERP", server.url("/hook"), None).await;

        let d = dispatcher();
        d.reenviar(&store, pedido.id).await.unwrap();
        let r = d.reenviar(&store, pedido.id).await.unwrap();

        assert_eq!(r.envios[0].tentativa_numero, 2);
        assert_eq!(r.envios[0].status, "Pedido Novo");
        mock.assert_hits_async(2).await;
        assert_eq!(store.get_pedido(pedido.id).await.unwrap().status_nome, "Pedido Novo");
    }

    #[tokio::test]
    async fn test_lote_reports_each_pedido() {
        let (store, pedido, producao) = store_com_pedido().await;

        let itens = dispatcher()
            .atualizar_lote(&store, &[pedido.id, 9999], producao.id)
            .await
            .unwrap();

        assert_eq!(itens.len(), 2);
        assert!(itens[0].aplicado);
        assert!(!itens[1].aplicado);
        assert!(itens[1].erro.as_deref().unwrap().contains("não encontrado"));
    }

    #[tokio::test]
    async fn test_unknown_status_is_not_found() {
        let (store, pedido, _) = store_com_pedido().await;
        let err = dispatcher()
            .atualizar_status(&store, pedido.id, 9999)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_enviar_manual_posts_raw_payload() {
        let (store, pedido, _) = store_com_pedido().await;

        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/manual")
                    .header("X-Origem", "cdg")
                    .json_body(json!({"rastreio": "BR123"}));
                then.status(201).body("criado");
            })
            .await;
        add_endpoint(&store, "Transportadora", server.url("/manual"), None).await;

        let corpo = json!({"rastreio": "BR123"});
        let envio = dispatcher()
            .enviar_manual(&store, pedido.id, "Enviado", &corpo, None)
            .await
            .unwrap();
        assert!(envio.sucesso);
        assert_eq!(envio.codigo_http, Some(201));
        assert_eq!(envio.status, "Enviado");
        assert_eq!(envio.tentativa_numero, 1);

        let envio = dispatcher()
            .enviar_manual(&store, pedido.id, "Enviado", &corpo, None)
            .await
            .unwrap();
        assert_eq!(envio.tentativa_numero, 2);
        mock.assert_hits_async(2).await;

        // O status do pedido não muda
        assert_eq!(store.get_pedido(pedido.id).await.unwrap().status_nome, "Pedido Novo");
    }

    #[tokio::test]
    async fn test_enviar_manual_endpoint_errors() {
        let (store, pedido, _) = store_com_pedido().await;
        let corpo = json!({"a": 1});

        let err = dispatcher()
            .enviar_manual(&store, pedido.id, "Enviado", &corpo, None)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::ValidationError(_)));

        let inativo = store
            .create_endpoint(DadosEndpoint {
                nome: "Desligado".to_string(),
                url: "http://127.0.0.1:1/x".to_string(),
                ativo: false,
                auto_enviar: true,
                access_token: None,
                token_autenticacao: None,
                headers_adicionais: None,
            })
            .await
            .unwrap();
        let err = dispatcher()
            .enviar_manual(&store, pedido.id, "Enviado", &corpo, Some(inativo.id))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(ref m) if m.contains("inativo")));

        let err = dispatcher()
            .enviar_manual(&store, 9999, "Enviado", &corpo, Some(inativo.id))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
        assert!(store.list_envios(pedido.id).await.unwrap().is_empty());
    }
}
