/// Cria (ou encontra) as pastas das marcas no Google Drive e imprime os IDs
/// Execute com: cargo run --bin setup_drive_folders

use anyhow::{bail, Context};
use tracing_subscriber::EnvFilter;

use cdg_producao::{config::Settings, services::DriveService};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let settings = Settings::new().context("Falha ao carregar a configuração")?;

    let Some(drive) = DriveService::from_settings(&settings.drive)? else {
        bail!("Google Drive desabilitado ou sem credenciais (drive.enabled / drive.credentials_file)");
    };

    println!("\n{}", "=".repeat(60));
    println!("Pastas das marcas no Google Drive");
    match settings.drive.pasta_raiz_id.as_deref() {
        Some(raiz) => println!("Pasta raiz: {}", raiz),
        None => println!("Pasta raiz: (Meu Drive)"),
    }
    println!("{}\n", "=".repeat(60));

    let pastas = drive
        .preparar_pastas()
        .await
        .context("Falha ao preparar as pastas")?;

    for (marca, id) in pastas {
        println!("✅ {:<10} {}", marca.pasta(), id);
    }

    println!();
    Ok(())
}
