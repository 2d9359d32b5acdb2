/// Servidor da casa gráfica CDG Produção
///
/// - Formulários das marcas (ZeroHum, Pensi, Elite, Coleguium) com upload do PDF no Drive
/// - Webhooks de pedidos da Montink verificados por HMAC-SHA256
/// - Mudança de status distribuída para os endpoints configurados
///
/// Sem `database.url` o servidor sobe com store em memória (dados somem ao reiniciar).

use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

use cdg_producao::{
    config::Settings,
    routes::build_router,
    services::{DriveService, StatusDispatcher},
    storage::{FormularioStore, MemoryStore, PedidoStore, PgStore},
    utils::logging::*,
    AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // .env só existe em desenvolvimento; em produção as variáveis vêm do ambiente
    let dotenv_loaded = dotenvy::dotenv().is_ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    if dotenv_loaded {
        tracing::info!("✅ Arquivo .env carregado com sucesso");
    } else {
        tracing::debug!("Arquivo .env não encontrado - usando variáveis de ambiente do sistema");
    }

    let settings = Settings::new()?;
    log_config_loaded(&std::env::var("RUST_ENV").unwrap_or_else(|_| "development".to_string()));

    let (pedidos, formularios): (Arc<dyn PedidoStore>, Arc<dyn FormularioStore>) =
        match settings.database.url.as_deref() {
            Some(url) => {
                let store = Arc::new(
                    PgStore::connect(
                        url,
                        settings.database.max_connections,
                        settings.database.run_migrations,
                    )
                    .await?,
                );
                log_info("🐘 PostgreSQL conectado");
                (store.clone(), store)
            }
            None => {
                log_warning("⚠️ DATABASE_URL não configurada - usando store em memória");
                let store = Arc::new(MemoryStore::new());
                (store.clone(), store)
            }
        };

    let drive = match DriveService::from_settings(&settings.drive) {
        Ok(Some(drive)) => {
            log_info("✅ Google Drive configurado");
            Some(drive)
        }
        Ok(None) => None,
        Err(e) => {
            log_warning(&format!("⚠️ Falha ao configurar o Google Drive: {}. Uploads desabilitados.", e));
            None
        }
    };

    let dispatcher = StatusDispatcher::new(&settings.webhook)?;

    let addr = format!("{}:{}", settings.server.host, settings.server.port);
    let port = settings.server.port;

    let state = Arc::new(AppState {
        settings,
        pedidos,
        formularios,
        dispatcher,
        drive,
    });
    let app = build_router(state);

    let listener = TcpListener::bind(&addr).await?;
    log_server_startup(port);
    log_server_ready(port);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    log_info("🛑 Server shut down gracefully");
    Ok(())
}

/// Signal handler para graceful shutdown
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            log_error(&format!("Falha ao instalar o handler de Ctrl+C: {}", e));
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                log_error(&format!("Falha ao instalar o handler de SIGTERM: {}", e));
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            log_info("🛑 Received Ctrl+C, shutting down gracefully...");
        },
        _ = terminate => {
            log_info("🛑 Received SIGTERM, shutting down gracefully...");
        }
    }
}
