pub mod drive;
pub mod formularios;
pub mod signature;
pub mod status_dispatch;
pub mod webhook_ingest;

pub use drive::DriveService;
pub use status_dispatch::{AtualizacaoStatus, ItemLote, ResultadoEnvio, StatusDispatcher};
