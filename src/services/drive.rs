//! Integração dos formulários com o Google Drive
//!
//! Cada marca tem uma pasta própria (opcionalmente dentro de
//! `drive.pasta_raiz_id`). Os IDs das pastas ficam em cache no `DriveClient`.

use std::path::Path;

use google_drive::{DriveAuth, DriveClient, DriveFile, Permission, ServiceAccountCredentials};

use crate::config::settings::DriveSettings;
use crate::models::Marca;
use crate::utils::logging::*;

#[derive(Clone)]
pub struct DriveService {
    client: DriveClient,
    pasta_raiz_id: Option<String>,
}

impl DriveService {
    pub fn new(client: DriveClient, pasta_raiz_id: Option<String>) -> Self {
        Self { client, pasta_raiz_id }
    }

    /// Monta o serviço a partir da configuração
    ///
    /// Retorna `Ok(None)` quando o Drive está desabilitado ou não há
    /// credenciais; os formulários continuam sendo gravados sem links.
    pub fn from_settings(settings: &DriveSettings) -> google_drive::Result<Option<Self>> {
        if !settings.enabled {
            log_info("Google Drive desabilitado na configuração");
            return Ok(None);
        }

        let Some(credentials) = ServiceAccountCredentials::load(Some(Path::new(&settings.credentials_file)))? else {
            log_warning("⚠️ Credenciais do Google Drive não encontradas - PDFs não serão enviados");
            return Ok(None);
        };

        let mut client = DriveClient::new(DriveAuth::service_account(credentials))?;
        if settings.api_base.is_some() || settings.upload_base.is_some() {
            let api_base = settings.api_base.clone().unwrap_or_else(|| client.api_base().to_string());
            let upload_base = settings.upload_base.clone().unwrap_or_else(|| api_base.clone());
            client = client.with_base_urls(api_base, upload_base);
        }

        Ok(Some(Self::new(client, settings.pasta_raiz_id.clone())))
    }

    /// ID da pasta da marca, criando se necessário
    pub async fn pasta_marca(&self, marca: Marca) -> google_drive::Result<String> {
        self.client
            .ensure_folder(marca.pasta(), self.pasta_raiz_id.as_deref())
            .await
    }

    /// Garante as pastas de todas as marcas
    pub async fn preparar_pastas(&self) -> google_drive::Result<Vec<(Marca, String)>> {
        let mut pastas = Vec::with_capacity(Marca::TODAS.len());
        for marca in Marca::TODAS {
            pastas.push((marca, self.pasta_marca(marca).await?));
        }
        Ok(pastas)
    }

    /// Envia o PDF de um formulário e libera leitura para quem tiver o link
    pub async fn enviar_pdf(&self, marca: Marca, cod_op: &str, conteudo: Vec<u8>) -> google_drive::Result<DriveFile> {
        let nome = nome_pdf(marca, cod_op);
        let pasta_id = self.pasta_marca(marca).await?;

        let mut arquivo = self.client.upload_pdf(&nome, conteudo, &pasta_id).await?;
        self.client
            .grant_permission(&arquivo.id, &Permission::anyone_reader())
            .await?;

        if arquivo.web_view_link.is_none() {
            arquivo = self.client.get_file(&arquivo.id).await?;
        }

        log_drive_upload(&nome, arquivo.web_view_link.as_deref());
        Ok(arquivo)
    }
}

/// `{PASTA}_{cod_op}.pdf`
pub fn nome_pdf(marca: Marca, cod_op: &str) -> String {
    format!("{}_{}.pdf", marca.pasta(), cod_op)
}
