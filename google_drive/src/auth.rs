//! Autenticação OAuth2 com conta de serviço
//!
//! Fluxo "JWT bearer": assina uma asserção RS256 com a chave privada da conta
//! de serviço e troca por um access token em `token_uri`. O token fica em
//! cache até 60s antes de expirar.

use crate::error::{DriveError, Result};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};
use tokio::sync::RwLock;

pub const DRIVE_SCOPE: &str = "https://www.googleapis.com/auth/drive";
pub const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const ASSERTION_TTL_SECS: u64 = 3600;
const EXPIRY_MARGIN: Duration = Duration::from_secs(60);

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

/// Credenciais de conta de serviço (formato do JSON baixado no console GCP)
#[derive(Clone, Deserialize)]
pub struct ServiceAccountCredentials {
    #[serde(rename = "type", default)]
    pub account_type: Option<String>,
    #[serde(default)]
    pub project_id: Option<String>,
    #[serde(default)]
    pub private_key_id: Option<String>,
    pub private_key: String,
    pub client_email: String,
    #[serde(default)]
    pub client_id: Option<String>,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

impl std::fmt::Debug for ServiceAccountCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceAccountCredentials")
            .field("project_id", &self.project_id)
            .field("client_email", &self.client_email)
            .field("private_key", &"<redacted>")
            .finish()
    }
}

impl ServiceAccountCredentials {
    /// Lê o JSON de credenciais de um arquivo
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        let creds: Self = serde_json::from_str(&raw)?;
        creds.validate()?;
        Ok(creds)
    }

    /// Monta as credenciais a partir das variáveis `GOOGLE_*`
    ///
    /// Retorna `Ok(None)` quando `GOOGLE_PRIVATE_KEY` ou `GOOGLE_CLIENT_EMAIL`
    /// não estão definidas.
    pub fn from_env() -> Result<Option<Self>> {
        let (private_key, client_email) = match (
            std::env::var("GOOGLE_PRIVATE_KEY").ok(),
            std::env::var("GOOGLE_CLIENT_EMAIL").ok(),
        ) {
            (Some(key), Some(email)) if !key.is_empty() && !email.is_empty() => (key, email),
            _ => return Ok(None),
        };

        let creds = Self {
            account_type: std::env::var("GOOGLE_TYPE").ok(),
            project_id: std::env::var("GOOGLE_PROJECT_ID").ok(),
            private_key_id: std::env::var("GOOGLE_PRIVATE_KEY_ID").ok(),
            // Chaves vindas de .env costumam ter "\n" literal
            private_key: private_key.replace("\\n", "\n"),
            client_email,
            client_id: std::env::var("GOOGLE_CLIENT_ID").ok(),
            token_uri: std::env::var("GOOGLE_TOKEN_URI").unwrap_or_else(|_| default_token_uri()),
        };
        creds.validate()?;
        Ok(Some(creds))
    }

    /// Variáveis de ambiente primeiro, arquivo JSON como alternativa
    pub fn load(file: Option<&Path>) -> Result<Option<Self>> {
        if let Some(creds) = Self::from_env()? {
            tracing::info!("🔐 Credenciais do Google Drive carregadas das variáveis de ambiente");
            return Ok(Some(creds));
        }

        match file {
            Some(path) if path.exists() => {
                tracing::info!("🔐 Credenciais do Google Drive carregadas de {}", path.display());
                Self::from_file(path).map(Some)
            }
            _ => Ok(None),
        }
    }

    fn validate(&self) -> Result<()> {
        if !self.private_key.contains("PRIVATE KEY") {
            return Err(DriveError::CredentialsError(
                "private_key não está em formato PEM".to_string(),
            ));
        }
        if !self.client_email.contains('@') {
            return Err(DriveError::CredentialsError(format!(
                "client_email inválido: {}",
                self.client_email
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Serialize)]
struct AssertionClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: u64,
    exp: u64,
}

/// Assina a asserção JWT usada na troca por access token
pub fn sign_assertion(creds: &ServiceAccountCredentials, scope: &str, issued_at: u64) -> Result<String> {
    let mut header = Header::new(Algorithm::RS256);
    header.kid = creds.private_key_id.clone();

    let claims = AssertionClaims {
        iss: &creds.client_email,
        scope,
        aud: &creds.token_uri,
        iat: issued_at,
        exp: issued_at + ASSERTION_TTL_SECS,
    };

    let key = EncodingKey::from_rsa_pem(creds.private_key.as_bytes())?;
    Ok(encode(&header, &claims, &key)?)
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: u64,
}

fn default_expires_in() -> u64 {
    ASSERTION_TTL_SECS
}

/// Access token em cache com instante de expiração
#[derive(Debug, Clone)]
pub struct CachedToken {
    value: String,
    expires_at: Instant,
}

impl CachedToken {
    fn is_fresh(&self) -> bool {
        Instant::now() + EXPIRY_MARGIN < self.expires_at
    }
}

/// Fonte de access tokens para a API do Drive
#[derive(Clone)]
pub enum DriveAuth {
    /// Conta de serviço com cache de token
    ServiceAccount {
        credentials: Arc<ServiceAccountCredentials>,
        cache: Arc<RwLock<Option<CachedToken>>>,
    },
    /// Token fixo (desenvolvimento local e testes)
    Static(String),
}

impl DriveAuth {
    pub fn service_account(credentials: ServiceAccountCredentials) -> Self {
        Self::ServiceAccount {
            credentials: Arc::new(credentials),
            cache: Arc::new(RwLock::new(None)),
        }
    }

    pub fn static_token(token: impl Into<String>) -> Self {
        Self::Static(token.into())
    }

    /// Retorna um access token válido, renovando se necessário
    pub async fn access_token(&self, http: &reqwest::Client) -> Result<String> {
        let (credentials, cache) = match self {
            Self::Static(token) => return Ok(token.clone()),
            Self::ServiceAccount { credentials, cache } => (credentials, cache),
        };

        {
            let cached = cache.read().await;
            if let Some(token) = cached.as_ref().filter(|t| t.is_fresh()) {
                return Ok(token.value.clone());
            }
        }

        let mut cached = cache.write().await;
        // Outra task pode ter renovado enquanto esperávamos o lock
        if let Some(token) = cached.as_ref().filter(|t| t.is_fresh()) {
            return Ok(token.value.clone());
        }

        let token = exchange_assertion(http, credentials).await?;
        let value = token.access_token.clone();
        *cached = Some(CachedToken {
            value: token.access_token,
            expires_at: Instant::now() + Duration::from_secs(token.expires_in),
        });
        tracing::debug!("Novo access token do Google obtido (expira em {}s)", token.expires_in);

        Ok(value)
    }
}

async fn exchange_assertion(
    http: &reqwest::Client,
    credentials: &ServiceAccountCredentials,
) -> Result<TokenResponse> {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| DriveError::AuthError(format!("Relógio do sistema inválido: {}", e)))?
        .as_secs();
    let assertion = sign_assertion(credentials, DRIVE_SCOPE, now)?;

    let response = http
        .post(&credentials.token_uri)
        .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
        .send()
        .await?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<Value>(&body)
            .ok()
            .and_then(|json| {
                json.get("error_description")
                    .or_else(|| json.get("error"))
                    .and_then(|v| v.as_str())
                    .map(str::to_string)
            })
            .unwrap_or(body);
        tracing::error!("Troca de token do Google falhou ({}): {}", status.as_u16(), message);
        return Err(DriveError::AuthError(message));
    }

    Ok(response.json().await?)
}
