// Biblioteca do backend CDG Produção
// Expõe módulos para o servidor, o binário setup_drive_folders e os testes

pub mod config;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod storage;
pub mod utils;

use std::sync::Arc;

use services::{DriveService, StatusDispatcher};
use storage::{FormularioStore, MemoryStore, PedidoStore};

// AppState é definido aqui para ser compartilhado
#[derive(Clone)]
pub struct AppState {
    pub settings: config::Settings,
    pub pedidos: Arc<dyn PedidoStore>,
    pub formularios: Arc<dyn FormularioStore>,
    pub dispatcher: StatusDispatcher,
    /// `None` quando o Google Drive não está configurado
    pub drive: Option<DriveService>,
}

impl AppState {
    /// Estado com store em memória e sem Drive (desenvolvimento e testes)
    pub fn in_memory(settings: config::Settings) -> utils::AppResult<Self> {
        let store = Arc::new(MemoryStore::new());
        let dispatcher = StatusDispatcher::new(&settings.webhook)?;
        Ok(Self {
            settings,
            pedidos: store.clone(),
            formularios: store,
            dispatcher,
            drive: None,
        })
    }
}
