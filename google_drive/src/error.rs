//! Tipos de erro para o crate google_drive

use thiserror::Error;

/// Erros do cliente Google Drive
#[derive(Debug, Error)]
pub enum DriveError {
    /// Erro de requisição HTTP
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    /// Erro da API do Drive (status code não-2xx)
    #[error("Google Drive API error (status {status}): {message}")]
    ApiError { status: u16, message: String },

    /// Falha ao obter access token
    #[error("Authentication failed: {0}")]
    AuthError(String),

    /// Credenciais ausentes ou malformadas
    #[error("Invalid credentials: {0}")]
    CredentialsError(String),

    /// Erro de parsing JSON
    #[error("JSON parsing failed: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Erro ao ler arquivo de credenciais
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Erro ao assinar o JWT da conta de serviço
    #[error("JWT signing failed: {0}")]
    JwtError(#[from] jsonwebtoken::errors::Error),

    /// Erro de configuração do cliente
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Tipo Result padrão para o crate
pub type Result<T> = std::result::Result<T, DriveError>;
