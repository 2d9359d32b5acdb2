use tracing::{debug, error, info, warn};

pub fn log_request_received(endpoint: &str, method: &str) {
    info!("Request received: {} {}", method, endpoint);
}

pub fn log_request_processed(endpoint: &str, status: u16, duration_ms: u64) {
    info!("Request processed: {} - Status: {} - Duration: {}ms",
          endpoint, status, duration_ms);
}

pub fn log_webhook_received(evento: &str, signed: bool, bytes: usize) {
    info!("📥 Webhook recebido: evento={} assinado={} tamanho={}B", evento, signed, bytes);
}

pub fn log_webhook_rejected(reason: &str) {
    warn!("❌ Webhook rejeitado: {}", reason);
}

pub fn log_pedido_created(pedido_id: i64, numero_pedido: &str) {
    info!("✅ Pedido #{} criado (numero_pedido: {})", pedido_id, numero_pedido);
}

pub fn log_status_dispatch(pedido_id: i64, status: &str, endpoints: usize) {
    info!("📤 Enviando status '{}' do pedido #{} para {} endpoint(s)", status, pedido_id, endpoints);
}

pub fn log_delivery_result(endpoint: &str, codigo_http: Option<u16>, sucesso: bool) {
    if sucesso {
        info!("Webhook enviado para {} - Status: {:?}", endpoint, codigo_http);
    } else {
        warn!("Falha no envio para {} - Status: {:?}", endpoint, codigo_http);
    }
}

pub fn log_formulario_created(marca: &str, cod_op: &str) {
    info!("📝 Formulário {} criado: {}", marca, cod_op);
}

pub fn log_drive_upload(file_name: &str, link: Option<&str>) {
    info!("☁️ PDF '{}' enviado ao Drive - link: {}", file_name, link.unwrap_or("-"));
}

pub fn log_drive_error(operation: &str, error: &str) {
    error!("Google Drive error: {} - Error: {}", operation, error);
}

pub fn log_config_loaded(env: &str) {
    info!("Configuration loaded successfully for environment: {}", env);
}

pub fn log_server_startup(port: u16) {
    info!("🚀 CDG Produção backend starting on port {}", port);
}

pub fn log_server_ready(port: u16) {
    info!("✅ Server ready and listening on http://0.0.0.0:{}", port);
}

pub fn log_health_check() {
    debug!("Health check requested");
}

pub fn log_validation_error(field: &str, message: &str) {
    warn!("Validation error: {} - {}", field, message);
}

pub fn log_info(message: &str) {
    info!("{}", message);
}

pub fn log_error(message: &str) {
    error!("{}", message);
}

pub fn log_warning(message: &str) {
    warn!("{}", message);
}
