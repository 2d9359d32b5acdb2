//! Cliente mínimo da API Google Drive v3
//!
//! Funcionalidades usadas pelo backend de produção:
//!
//! - Autenticação por conta de serviço (JWT RS256 → access token, com cache)
//! - Busca e criação de pastas (com cache de IDs por nome)
//! - Upload multipart de PDFs
//! - Permissões de compartilhamento (`anyone` / `reader`)
//!
//! # Exemplo Básico
//!
//! ```rust,ignore
//! use google_drive::{DriveAuth, DriveClient, Permission, ServiceAccountCredentials};
//!
//! let creds = ServiceAccountCredentials::load(Some("credentials/google_drive_credentials.json".as_ref()))?
//!     .expect("credenciais não configuradas");
//! let client = DriveClient::new(DriveAuth::service_account(creds))?;
//!
//! let pasta = client.ensure_folder("ZeroHum", None).await?;
//! let arquivo = client.upload_pdf("ZeroHum_ZH202401011234.pdf", bytes, &pasta).await?;
//! client.grant_permission(&arquivo.id, &Permission::anyone_reader()).await?;
//! ```

pub mod auth;
pub mod client;
pub mod error;
pub mod types;

pub use auth::{DriveAuth, ServiceAccountCredentials};
pub use client::DriveClient;
pub use error::{DriveError, Result};
pub use types::{DriveFile, Permission};
