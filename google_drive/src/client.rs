//! Cliente HTTP para a API Google Drive v3

use crate::auth::DriveAuth;
use crate::error::{DriveError, Result};
use crate::types::{DriveFile, FileList, FileMetadata, Permission, FOLDER_MIME_TYPE, PDF_MIME_TYPE};
use reqwest::{Client as HttpClient, Response};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

const DEFAULT_API_BASE: &str = "https://www.googleapis.com/drive/v3";
const DEFAULT_UPLOAD_BASE: &str = "https://www.googleapis.com/upload/drive/v3";
const FILE_FIELDS: &str = "id,name,mimeType,webViewLink,webContentLink";

/// Cliente para a API do Google Drive
///
/// Mantém um cache de IDs de pasta por nome (e pasta pai), compartilhado
/// entre clones do cliente.
#[derive(Clone)]
pub struct DriveClient {
    http_client: HttpClient,
    auth: DriveAuth,
    api_base: String,
    upload_base: String,
    folder_cache: Arc<RwLock<HashMap<String, String>>>,
}

impl DriveClient {
    /// Cria um novo cliente
    ///
    /// # Timeouts
    ///
    /// - Total: 60s (uploads de PDF)
    /// - Connect: 5s
    pub fn new(auth: DriveAuth) -> Result<Self> {
        let http_client = HttpClient::builder()
            .timeout(Duration::from_secs(60))
            .connect_timeout(Duration::from_secs(5))
            .build()
            .map_err(|e| DriveError::ConfigError(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            auth,
            api_base: DEFAULT_API_BASE.to_string(),
            upload_base: DEFAULT_UPLOAD_BASE.to_string(),
            folder_cache: Arc::new(RwLock::new(HashMap::new())),
        })
    }

    /// Sobrescreve as URLs base (usado para apontar para um servidor de testes)
    pub fn with_base_urls(mut self, api_base: impl Into<String>, upload_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self.upload_base = upload_base.into().trim_end_matches('/').to_string();
        self
    }

    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    async fn bearer(&self) -> Result<String> {
        let token = self.auth.access_token(&self.http_client).await?;
        Ok(format!("Bearer {}", token))
    }

    /// Procura uma pasta pelo nome, opcionalmente dentro de `parent_id`
    pub async fn find_folder(&self, name: &str, parent_id: Option<&str>) -> Result<Option<DriveFile>> {
        let mut query = format!(
            "mimeType='{}' and name='{}' and trashed=false",
            FOLDER_MIME_TYPE,
            escape_query_value(name)
        );
        if let Some(parent) = parent_id {
            query.push_str(&format!(" and '{}' in parents", escape_query_value(parent)));
        }

        let url = format!("{}/files", self.api_base);
        tracing::debug!("GET {} q={}", url, query);

        let response = self
            .http_client
            .get(&url)
            .header("Authorization", self.bearer().await?)
            .query(&[
                ("q", query.as_str()),
                ("fields", "files(id,name,mimeType)"),
                ("spaces", "drive"),
            ])
            .send()
            .await?;

        let list: FileList = handle_response(response).await?.json().await?;
        Ok(list.files.into_iter().next())
    }

    /// Cria uma pasta e retorna seus metadados
    pub async fn create_folder(&self, name: &str, parent_id: Option<&str>) -> Result<DriveFile> {
        let metadata = FileMetadata {
            name,
            mime_type: FOLDER_MIME_TYPE,
            parents: parent_id.into_iter().collect(),
        };

        let url = format!("{}/files", self.api_base);
        tracing::debug!("POST {} (pasta '{}')", url, name);

        let response = self
            .http_client
            .post(&url)
            .header("Authorization", self.bearer().await?)
            .query(&[("fields", "id,name,mimeType")])
            .json(&metadata)
            .send()
            .await?;

        let folder: DriveFile = handle_response(response).await?.json().await?;
        tracing::info!("📁 Pasta '{}' criada no Google Drive (id: {})", name, folder.id);
        Ok(folder)
    }

    /// Retorna o ID da pasta, buscando ou criando quando não está em cache
    pub async fn ensure_folder(&self, name: &str, parent_id: Option<&str>) -> Result<String> {
        let cache_key = format!("{}/{}", parent_id.unwrap_or(""), name);

        if let Some(id) = self.folder_cache.read().await.get(&cache_key) {
            return Ok(id.clone());
        }

        let id = match self.find_folder(name, parent_id).await? {
            Some(folder) => {
                tracing::info!("📁 Pasta '{}' encontrada no Google Drive (id: {})", name, folder.id);
                folder.id
            }
            None => self.create_folder(name, parent_id).await?.id,
        };

        self.folder_cache.write().await.insert(cache_key, id.clone());
        Ok(id)
    }

    /// Envia um PDF via upload multipart (metadados + conteúdo)
    pub async fn upload_pdf(&self, file_name: &str, content: Vec<u8>, folder_id: &str) -> Result<DriveFile> {
        let metadata = FileMetadata {
            name: file_name,
            mime_type: PDF_MIME_TYPE,
            parents: vec![folder_id],
        };
        let boundary = format!("cdg_{}", uuid::Uuid::new_v4().simple());
        let body = multipart_related_body(&boundary, &serde_json::to_vec(&metadata)?, PDF_MIME_TYPE, &content);

        let url = format!("{}/files", self.upload_base);
        tracing::debug!("POST {} ({} bytes, '{}')", url, content.len(), file_name);

        let response = self
            .http_client
            .post(&url)
            .header("Authorization", self.bearer().await?)
            .header("Content-Type", format!("multipart/related; boundary={}", boundary))
            .query(&[("uploadType", "multipart"), ("fields", FILE_FIELDS)])
            .body(body)
            .send()
            .await?;

        let file: DriveFile = handle_response(response).await?.json().await?;
        tracing::info!("📤 Arquivo '{}' enviado ao Google Drive (id: {})", file_name, file.id);
        Ok(file)
    }

    /// Concede uma permissão ao arquivo
    pub async fn grant_permission(&self, file_id: &str, permission: &Permission) -> Result<()> {
        let url = format!("{}/files/{}/permissions", self.api_base, file_id);
        tracing::debug!("POST {} ({}/{})", url, permission.kind, permission.role);

        let response = self
            .http_client
            .post(&url)
            .header("Authorization", self.bearer().await?)
            .json(permission)
            .send()
            .await?;

        handle_response(response).await?;
        Ok(())
    }

    /// Busca metadados atualizados de um arquivo (links incluídos)
    pub async fn get_file(&self, file_id: &str) -> Result<DriveFile> {
        let url = format!("{}/files/{}", self.api_base, file_id);

        let response = self
            .http_client
            .get(&url)
            .header("Authorization", self.bearer().await?)
            .query(&[("fields", FILE_FIELDS)])
            .send()
            .await?;

        Ok(handle_response(response).await?.json().await?)
    }
}

fn escape_query_value(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "\\'")
}

fn multipart_related_body(boundary: &str, metadata: &[u8], mime_type: &str, content: &[u8]) -> Vec<u8> {
    let mut body = Vec::with_capacity(metadata.len() + content.len() + 256);
    body.extend_from_slice(format!("--{}\r\n", boundary).as_bytes());
    body.extend_from_slice(b"Content-Type: application/json; charset=UTF-8\r\n\r\n");
    body.extend_from_slice(metadata);
    body.extend_from_slice(format!("\r\n--{}\r\n", boundary).as_bytes());
    body.extend_from_slice(format!("Content-Type: {}\r\n\r\n", mime_type).as_bytes());
    body.extend_from_slice(content);
    body.extend_from_slice(format!("\r\n--{}--\r\n", boundary).as_bytes());
    body
}

async fn handle_response(response: Response) -> Result<Response> {
    let status = response.status();

    if status.is_success() {
        return Ok(response);
    }

    let status_code = status.as_u16();
    let error_body = response.text().await.unwrap_or_else(|_| "Unknown error".to_string());

    tracing::error!("Google Drive API error ({}): {}", status_code, error_body);

    // Formato padrão do Google: {"error": {"code": 404, "message": "..."}}
    let message = serde_json::from_str::<Value>(&error_body)
        .ok()
        .and_then(|json| {
            json.get("error")
                .and_then(|e| e.get("message").or(Some(e)))
                .and_then(|v| v.as_str())
                .map(str::to_string)
        })
        .unwrap_or(error_body);

    Err(DriveError::ApiError {
        status: status_code,
        message,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;

    fn client_for(server: &MockServer) -> DriveClient {
        DriveClient::new(DriveAuth::static_token("token-teste"))
            .unwrap()
            .with_base_urls(server.url("/drive/v3"), server.url("/upload/drive/v3"))
    }

    #[test]
    fn test_escape_query_value() {
        assert_eq!(escape_query_value("D'Ávila"), "D\\'Ávila");
        assert_eq!(escape_query_value("ZeroHum"), "ZeroHum");
    }

    #[test]
    fn test_multipart_related_body_layout() {
        let body = multipart_related_body("b1", br#"{"name":"x.pdf"}"#, PDF_MIME_TYPE, b"%PDF-1.4");
        let text = String::from_utf8(body).unwrap();

        assert!(text.starts_with("--b1\r\nContent-Type: application/json"));
        assert!(text.contains("{\"name\":\"x.pdf\"}\r\n--b1\r\nContent-Type: application/pdf\r\n\r\n%PDF-1.4"));
        assert!(text.ends_with("\r\n--b1--\r\n"));
    }

    #[tokio::test]
    async fn test_ensure_folder_creates_once_and_caches() {
        let server = MockServer::start_async().await;
        let search = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/drive/v3/files")
                    .header("Authorization", "Bearer token-teste")
                    .query_param_exists("q");
                then.status(200).json_body(json!({"files": []}));
            })
            .await;
        let create = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/drive/v3/files")
                    .json_body_partial(r#"{"name": "ZeroHum", "mimeType": "application/vnd.google-apps.folder"}"#);
                then.status(200).json_body(json!({"id": "pasta-zh", "name": "ZeroHum"}));
            })
            .await;

        let client = client_for(&server);
        assert_eq!(client.ensure_folder("ZeroHum", None).await.unwrap(), "pasta-zh");
        assert_eq!(client.ensure_folder("ZeroHum", None).await.unwrap(), "pasta-zh");

        search.assert_hits_async(1).await;
        create.assert_hits_async(1).await;
    }

    #[tokio::test]
    async fn test_ensure_folder_reuses_existing() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/drive/v3/files");
                then.status(200)
                    .json_body(json!({"files": [{"id": "pasta-existente", "name": "Pensi"}]}));
            })
            .await;

        let client = client_for(&server);
        assert_eq!(client.ensure_folder("Pensi", None).await.unwrap(), "pasta-existente");
    }

    #[tokio::test]
    async fn test_upload_pdf_sends_multipart_related() {
        let server = MockServer::start_async().await;
        let upload = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/upload/drive/v3/files")
                    .query_param("uploadType", "multipart")
                    .header_exists("Content-Type")
                    .body_contains("\"name\":\"ZeroHum_ZH202401010001.pdf\"")
                    .body_contains("%PDF-1.4");
                then.status(200).json_body(json!({
                    "id": "arquivo-1",
                    "name": "ZeroHum_ZH202401010001.pdf",
                    "webViewLink": "https://drive.google.com/file/d/arquivo-1/view"
                }));
            })
            .await;

        let client = client_for(&server);
        let file = client
            .upload_pdf("ZeroHum_ZH202401010001.pdf", b"%PDF-1.4 teste".to_vec(), "pasta-zh")
            .await
            .unwrap();

        upload.assert_async().await;
        assert_eq!(file.id, "arquivo-1");
        assert_eq!(
            file.web_view_link.as_deref(),
            Some("https://drive.google.com/file/d/arquivo-1/view")
        );
    }

    #[tokio::test]
    async fn test_api_error_message_is_extracted() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/drive/v3/files/abc/permissions");
                then.status(403)
                    .json_body(json!({"error": {"code": 403, "message": "Insufficient permissions"}}));
            })
            .await;

        let client = client_for(&server);
        let err = client
            .grant_permission("abc", &Permission::anyone_reader())
            .await
            .unwrap_err();

        match err {
            DriveError::ApiError { status, message } => {
                assert_eq!(status, 403);
                assert_eq!(message, "Insufficient permissions");
            }
            other => panic!("erro inesperado: {:?}", other),
        }
    }
}
