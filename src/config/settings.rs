use serde::{Deserialize, Serialize};
use config::{Config, ConfigError, Environment, File};

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct Settings {
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub database: DatabaseSettings,
    #[serde(default)]
    pub webhook: WebhookSettings,
    #[serde(default)]
    pub drive: DriveSettings,
    #[serde(default)]
    pub admin: AdminSettings,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct DatabaseSettings {
    pub url: Option<String>,  // Sem URL => store em memória
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_true")]
    pub run_migrations: bool,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            url: None,
            max_connections: default_max_connections(),
            run_migrations: true,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct WebhookSettings {
    pub secret: Option<String>,  // Fallback quando não há WebhookConfig ativo no banco
    #[serde(default = "default_true")]
    pub exigir_assinatura: bool,
    #[serde(default = "default_timeout_envio")]
    pub timeout_envio_segundos: u64,
    #[serde(default = "default_max_resposta")]
    pub max_resposta_chars: usize,
}

impl Default for WebhookSettings {
    fn default() -> Self {
        Self {
            secret: None,
            exigir_assinatura: true,
            timeout_envio_segundos: default_timeout_envio(),
            max_resposta_chars: default_max_resposta(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct DriveSettings {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_credentials_file")]
    pub credentials_file: String,
    pub pasta_raiz_id: Option<String>,  // Pastas das marcas ficam dentro desta, se definida
    pub api_base: Option<String>,
    pub upload_base: Option<String>,
}

impl Default for DriveSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            credentials_file: default_credentials_file(),
            pasta_raiz_id: None,
            api_base: None,
            upload_base: None,
        }
    }
}

/// Acesso às rotas administrativas (header `X-Admin-Key`)
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct AdminSettings {
    pub api_key: Option<String>,
    /// Em produção, sem `api_key` as rotas administrativas ficam bloqueadas
    #[serde(default)]
    pub producao: bool,
}

fn default_true() -> bool {
    true
}

fn default_max_connections() -> u32 {
    5
}

fn default_timeout_envio() -> u64 {
    10
}

fn default_max_resposta() -> usize {
    1000
}

fn default_credentials_file() -> String {
    "credentials/google_drive_credentials.json".to_string()
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let mut builder = Config::builder()
            // Arquivo de configuração base
            .add_source(File::with_name("config/default").required(false))
            // Arquivo específico do ambiente
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false));

        // Variáveis de ambiente conhecidas
        if let Ok(url) = std::env::var("DATABASE_URL") {
            builder = builder.set_override("database.url", url)?;
        }
        if let Ok(secret) = std::env::var("WEBHOOK_SECRET") {
            builder = builder.set_override("webhook.secret", secret)?;
        }
        if let Ok(path) = std::env::var("GOOGLE_CREDENTIALS_FILE") {
            builder = builder.set_override("drive.credentials_file", path)?;
        }
        if let Some(port) = std::env::var("PORT").ok().and_then(|p| p.parse::<u16>().ok()) {
            builder = builder.set_override("server.port", i64::from(port))?;
        }
        if let Ok(key) = std::env::var("ADMIN_API_KEY") {
            builder = builder.set_override("admin.api_key", key)?;
        }
        let is_production = std::env::var("RUST_ENV").map_or(false, |env| env == "production");
        builder = builder.set_default("admin.producao", is_production)?;

        // CDG__WEBHOOK__EXIGIR_ASSINATURA=false, CDG__SERVER__PORT=9000, ...
        builder = builder.add_source(Environment::with_prefix("CDG").separator("__"));

        let s = builder.build()?;

        s.try_deserialize()
    }
}
