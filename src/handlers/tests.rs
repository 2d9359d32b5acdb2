use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

use crate::config::Settings;
use crate::routes::build_router;
use crate::services::signature;
use crate::AppState;

const SECRET: &str = "segredo-montink";

fn app_with(settings: Settings) -> Router {
    let state = AppState::in_memory(settings).unwrap();
    build_router(Arc::new(state))
}

fn app() -> Router {
    let mut settings = Settings::default();
    settings.webhook.secret = Some(SECRET.to_string());
    app_with(settings)
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, body)
}

fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("Content-Type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn pedido(numero: Value) -> Value {
    json!({
        "numero_pedido": numero,
        "valor_pedido": 89.9,
        "nome_cliente": "João Pereira",
        "documento_cliente": "987.654.321-00",
        "email_cliente": "joao@example.com",
        "produtos": [{
            "nome": "Agenda",
            "sku": "AG-2024",
            "quantidade": 1,
            "designs": {"capa_frente": "https://cdn.example.com/a.png"},
            "mockups": {"capa_frente": "https://cdn.example.com/b.png"}
        }],
        "endereco_envio": {
            "nome_destinatario": "João Pereira",
            "endereco": "Av. Brasil",
            "numero": "2000",
            "cidade": "Rio de Janeiro",
            "uf": "RJ",
            "cep": "21000-000",
            "bairro": "Penha",
            "telefone": "21988887777"
        },
        "informacoes_adicionais": {
            "nome": "João",
            "telefone": "21988887777",
            "email": "joao@example.com"
        }
    })
}

fn webhook_request(body: &Value, secret: &str) -> Request<Body> {
    let raw = body.to_string();
    let sig = signature::sign(raw.as_bytes(), secret);
    Request::builder()
        .method("POST")
        .uri("/api/webhooks/receber/")
        .header("Content-Type", "application/json")
        .header("X-Webhook-Signature", format!("sha256={}", sig))
        .body(Body::from(raw))
        .unwrap()
}

#[tokio::test]
async fn test_health() {
    let (status, body) = send(&app(), get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");

    let (status, body) = send(&app(), get("/ready")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["dependencies"]["storage"]["kind"], "memory");
}

#[tokio::test]
async fn test_signed_webhook_then_duplicate() {
    let app = app();
    let payload = pedido(json!(12345));

    let (status, body) = send(&app, webhook_request(&payload, SECRET)).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["numero_pedido"], "12345");
    assert_eq!(body["status_nome"], "Pedido Novo");

    let (status, body) = send(&app, webhook_request(&payload, SECRET)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["error"].as_str().unwrap().contains("já existe"));

    let (_, recebidos) = send(&app, get("/api/webhooks/recebidos/")).await;
    assert_eq!(recebidos.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_webhook_with_wrong_secret_is_401() {
    let (status, body) = send(&app(), webhook_request(&pedido(json!("1")), "errado")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["status"], 401);
}

#[tokio::test]
async fn test_webhook_validation_is_400() {
    let mut payload = pedido(json!("2"));
    payload["produtos"] = json!([]);
    let (status, body) = send(&app(), webhook_request(&payload, SECRET)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("produtos"));
}

#[tokio::test]
async fn test_list_and_patch_status_without_endpoints() {
    let app = app();
    send(&app, webhook_request(&pedido(json!("100")), SECRET)).await;
    send(&app, webhook_request(&pedido(json!("101")), SECRET)).await;

    let (status, novo) = send(
        &app,
        json_request("POST", "/api/status/", json!({"nome": "Enviado", "ordem": 5})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, pagina) = send(&app, get("/api/pedidos/?search=101&page_size=5")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(pagina["count"], 1);
    assert_eq!(pagina["page_size"], 5);
    let id = pagina["results"][0]["id"].as_i64().unwrap();

    let (status, body) = send(
        &app,
        json_request(
            "PATCH",
            &format!("/api/pedidos/{}/status/", id),
            json!({"status_id": novo["id"]}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["aplicado"], true);
    assert_eq!(body["pedido"]["status_nome"], "Enviado");

    let (status, _) = send(&app, get("/api/pedidos/9999/")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_patch_status_with_failing_endpoint_is_502() {
    let app = app();
    let (_, pedido) = send(&app, webhook_request(&pedido(json!("300")), SECRET)).await;
    let id = pedido["id"].as_i64().unwrap();

    let (status, _) = send(
        &app,
        json_request(
            "POST",
            "/api/webhooks/endpoints/",
            json!({"nome": "ERP fora do ar", "url": "http://127.0.0.1:1/hook"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (_, lista) = send(&app, get("/api/status/")).await;
    let status_id = lista[0]["id"].clone();

    let (status, body) = send(
        &app,
        json_request("PATCH", &format!("/api/pedidos/{}/status/", id), json!({"status_id": status_id})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["envio"]["falhas"], 1);

    let (_, envios) = send(&app, get(&format!("/api/pedidos/{}/envios/", id))).await;
    assert_eq!(envios.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_endpoint_crud_masks_token() {
    let app = app();
    let (status, criado) = send(
        &app,
        json_request(
            "POST",
            "/api/webhooks/endpoints/",
            json!({
                "nome": "ERP",
                "url": "https://erp.example.com/status",
                "token_autenticacao": "token-secreto",
                "headers_adicionais": {"X-Loja": "cdg"}
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(criado["token_autenticacao"], "toke****");
    let id = criado["id"].as_i64().unwrap();

    let (status, atualizado) = send(
        &app,
        json_request(
            "PATCH",
            &format!("/api/webhooks/endpoints/{}/", id),
            json!({"auto_enviar": false}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(atualizado["auto_enviar"], false);
    assert_eq!(atualizado["nome"], "ERP");

    let request = Request::builder()
        .method("DELETE")
        .uri(format!("/api/webhooks/endpoints/{}/", id))
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(&app, request).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send(
        &app,
        json_request("POST", "/api/webhooks/endpoints/", json!({"nome": "X", "url": "ftp://x"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_admin_routes_require_key_when_configured() {
    let mut settings = Settings::default();
    settings.admin.api_key = Some("chave-admin".to_string());
    let app = app_with(settings);

    let (status, _) = send(&app, get("/api/pedidos/")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let request = Request::builder()
        .uri("/api/pedidos/")
        .header("X-Admin-Key", "chave-admin")
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(&app, request).await;
    assert_eq!(status, StatusCode::OK);

    // Rotas públicas continuam abertas
    let (status, _) = send(&app, get("/zerohum/")).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_admin_routes_blocked_in_production_without_key() {
    let mut settings = Settings::default();
    settings.admin.producao = true;
    let (status, _) = send(&app_with(settings), get("/api/status/")).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_formulario_json_lifecycle() {
    let app = app();
    let (status, criado) = send(
        &app,
        json_request(
            "POST",
            "/pensi/",
            json!({
                "nome": "Carla",
                "email": "carla@pensi.com.br",
                "unidade_nome": "BANGU",
                "titulo": "Lista de exercícios",
                "data_entrega": "2024-05-20",
                "impressao": "2_lados",
                "unidades": [{"nome": "BANGU", "quantidade": 40}]
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(criado["detail"], "Formulário criado com sucesso");
    assert_eq!(criado["link_download"], Value::Null);
    let cod_op = criado["cod_op"].as_str().unwrap().to_string();
    assert!(cod_op.starts_with("PS"));
    assert_eq!(cod_op.len(), 14);

    let (status, form) = send(&app, get(&format!("/pensi/{}/", cod_op))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(form["impressao"], "2_LADOS");
    assert_eq!(form["unidades"][0]["quantidade"], 40);

    // Outra marca não enxerga o formulário
    let (status, _) = send(&app, get(&format!("/elite/{}/", cod_op))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, form) = send(
        &app,
        json_request(
            "PUT",
            &format!("/pensi/{}/", cod_op),
            json!({"observacoes": "Grampear", "cod_op": "PS000000000000"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(form["observacoes"], "Grampear");
    assert_eq!(form["cod_op"], cod_op.as_str());

    let (_, lista) = send(&app, get("/pensi/")).await;
    assert_eq!(lista.as_array().unwrap().len(), 1);

    let request = Request::builder()
        .method("DELETE")
        .uri(format!("/pensi/{}/", cod_op))
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(&app, request).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send(&app, get(&format!("/pensi/{}/", cod_op))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_formulario_multipart_with_pdf() {
    let boundary = "cdgboundary";
    let body = format!(
        "--{b}\r\nContent-Disposition: form-data; name=\"nome\"\r\n\r\nBeto\r\n\
         --{b}\r\nContent-Disposition: form-data; name=\"email\"\r\n\r\nbeto@elite.com\r\n\
         --{b}\r\nContent-Disposition: form-data; name=\"unidade_nome\"\r\n\r\nMEIER\r\n\
         --{b}\r\nContent-Disposition: form-data; name=\"titulo\"\r\n\r\nProva bimestral\r\n\
         --{b}\r\nContent-Disposition: form-data; name=\"data_entrega\"\r\n\r\n2024-06-01\r\n\
         --{b}\r\nContent-Disposition: form-data; name=\"unidades\"\r\n\r\n[{{\"nome\": \"MEIER\", \"quantidade\": 10}}]\r\n\
         --{b}\r\nContent-Disposition: form-data; name=\"arquivo\"; filename=\"prova.pdf\"\r\n\
         Content-Type: application/pdf\r\n\r\n%PDF-1.4 teste\r\n\
         --{b}--\r\n",
        b = boundary
    );
    let request = Request::builder()
        .method("POST")
        .uri("/elite/")
        .header("Content-Type", format!("multipart/form-data; boundary={}", boundary))
        .body(Body::from(body))
        .unwrap();

    let (status, criado) = send(&app(), request).await;
    assert_eq!(status, StatusCode::CREATED);
    assert!(criado["cod_op"].as_str().unwrap().starts_with("EL"));
    // Sem Drive configurado o PDF não gera links
    assert_eq!(criado["formulario"]["arquivos"], json!([]));
    assert_eq!(criado["formulario"]["unidades"][0]["nome"], "MEIER");
}

#[tokio::test]
async fn test_formulario_missing_fields_is_400() {
    let (status, body) = send(&app(), json_request("POST", "/coleguium/", json!({"nome": "Só nome"}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let erro = body["error"].as_str().unwrap();
    assert!(erro.contains("email"));
    assert!(erro.contains("data_entrega"));
}

#[tokio::test]
async fn test_webhook_configuracoes() {
    let app = app();
    let (status, cfg) = send(
        &app,
        json_request("POST", "/api/webhooks/configuracoes/", json!({"secret_key": "novo-segredo"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(cfg["secret_key"], "novo****");

    // O secret do banco passa a valer no lugar do configurado
    let (status, _) = send(&app, webhook_request(&pedido(json!("900")), SECRET)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _) = send(&app, webhook_request(&pedido(json!("900")), "novo-segredo")).await;
    assert_eq!(status, StatusCode::CREATED);
}

#[tokio::test]
async fn test_lote() {
    let app = app();
    let (_, p) = send(&app, webhook_request(&pedido(json!("500")), SECRET)).await;
    let (_, lista) = send(&app, get("/api/status/")).await;

    let (status, itens) = send(
        &app,
        json_request(
            "POST",
            "/api/pedidos/status/lote/",
            json!({"pedido_ids": [p["id"], 777], "status_id": lista[0]["id"]}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(itens[0]["aplicado"], true);
    assert_eq!(itens[1]["aplicado"], false);

    let (status, _) = send(
        &app,
        json_request("POST", "/api/pedidos/status/lote/", json!({"pedido_ids": [], "status_id": 1})),
    )
    .await;
    tokio_test::assert_ok!(if status == StatusCode::BAD_REQUEST { Ok(()) } else { Err(status) });
}

#[tokio::test]
async fn test_malformed_admin_bodies_are_400_json() {
    let app = app();
    let (_, pedido) = send(&app, webhook_request(&pedido(json!("610")), SECRET)).await;
    let id = pedido["id"].as_i64().unwrap();

    let (status, body) = send(
        &app,
        json_request("PATCH", &format!("/api/pedidos/{}/status/", id), json!({"status_id": "x"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["status"], 400);
    assert!(body["error"].as_str().unwrap().starts_with("JSON inválido"));

    let (status, body) = send(
        &app,
        json_request("POST", "/api/webhooks/endpoints/", json!({"url": "http://x"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("nome"));

    let request = Request::builder()
        .method("POST")
        .uri("/api/status/")
        .header("Content-Type", "application/json")
        .body(Body::from("{oops"))
        .unwrap();
    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["status"], 400);

    let (status, body) = send(&app, get("/api/pedidos/?page=abc")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().starts_with("Parâmetros inválidos"));

    let (status, body) = send(&app, get("/api/pedidos/abc/")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["status"], 400);
}

#[tokio::test]
async fn test_manual_send_to_endpoint() {
    let app = app();
    let (_, pedido) = send(&app, webhook_request(&pedido(json!("720")), SECRET)).await;
    let id = pedido["id"].as_i64().unwrap();

    let (status, body) = send(
        &app,
        json_request(
            "POST",
            "/api/webhooks/enviar/",
            json!({"pedido_id": id, "status": "Enviado", "payload": {"a": 1}}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("endpoint"));

    let (_, endpoint) = send(
        &app,
        json_request(
            "POST",
            "/api/webhooks/endpoints/",
            json!({"nome": "ERP", "url": "http://127.0.0.1:1/hook"}),
        ),
    )
    .await;

    let (status, body) = send(
        &app,
        json_request(
            "POST",
            "/api/webhooks/enviar/",
            json!({
                "pedido_id": id,
                "status": "Enviado",
                "payload": {"a": 1},
                "endpoint_id": endpoint["id"]
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["envio"]["status"], "Enviado");
    assert_eq!(body["envio"]["payload"], r#"{"a":1}"#);

    let (status, _) = send(
        &app,
        json_request(
            "POST",
            "/api/webhooks/enviar/",
            json!({"pedido_id": id, "status": " ", "payload": {"a": 1}}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &app,
        json_request(
            "POST",
            "/api/webhooks/enviar/",
            json!({"pedido_id": id, "status": "Enviado", "payload": {}, "endpoint_id": 9999}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
