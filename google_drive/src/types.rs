//! Estruturas da API Google Drive v3 usadas pelo cliente

use serde::{Deserialize, Serialize};

pub const FOLDER_MIME_TYPE: &str = "application/vnd.google-apps.folder";
pub const PDF_MIME_TYPE: &str = "application/pdf";

/// Arquivo ou pasta retornado pela API
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DriveFile {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub mime_type: Option<String>,
    #[serde(default)]
    pub web_view_link: Option<String>,
    #[serde(default)]
    pub web_content_link: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct FileList {
    #[serde(default)]
    pub files: Vec<DriveFile>,
}

/// Metadados enviados na criação de arquivos e pastas
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct FileMetadata<'a> {
    pub name: &'a str,
    pub mime_type: &'a str,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub parents: Vec<&'a str>,
}

/// Permissão de compartilhamento
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Permission {
    #[serde(rename = "type")]
    pub kind: String,
    pub role: String,
}

impl Permission {
    /// Qualquer pessoa com o link pode visualizar
    pub fn anyone_reader() -> Self {
        Self {
            kind: "anyone".to_string(),
            role: "reader".to_string(),
        }
    }
}
