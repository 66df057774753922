use abacus::AbacusEguiApp;
use abacus_core::auth::AuthFlow;
use abacus_core::client::SessionClient;
use abacus_core::credentials::{CredentialStore, FileCredentialStore};
use abacus_core::settings::{ClientSettings, SettingsError};
use abacus_core::telemetry;
use abacus_core::tier::SessionState;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::runtime::Runtime;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "Abacus", version)]
struct Cli {
    /// Issuer base URL; overrides abacus.yaml.
    #[arg(long)]
    base_url: Option<String>,
    /// Credential file location; overrides abacus.yaml.
    #[arg(long)]
    credentials: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    telemetry::init_tracing(EnvFilter::from_default_env())?;

    let cli = Cli::parse();
    let settings = match ClientSettings::load() {
        Ok(settings) => settings,
        Err(SettingsError::Missing) => ClientSettings::default(),
        Err(err) => return Err(anyhow::anyhow!(err.user_message())),
    };

    let base_url = cli.base_url.unwrap_or(settings.base_url);
    let credentials_path = cli
        .credentials
        .or(settings.credentials_path)
        .unwrap_or_else(FileCredentialStore::default_path);

    let store: Arc<dyn CredentialStore> = Arc::new(FileCredentialStore::new(credentials_path));
    let auth = Arc::new(AuthFlow::new(base_url.clone(), store.clone()));
    let client = Arc::new(SessionClient::new(base_url, store));
    let session = SessionState::new();
    let runtime = Arc::new(Runtime::new()?);

    let native_options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size(egui::vec2(1024.0, 720.0))
            .with_min_inner_size(egui::vec2(800.0, 600.0)),
        follow_system_theme: true,
        ..Default::default()
    };

    eframe::run_native(
        "Abacus",
        native_options,
        Box::new(move |_cc| Box::new(AbacusEguiApp::new(session, auth, client, runtime))),
    )
    .map_err(|err| anyhow::anyhow!(err.to_string()))?;

    Ok(())
}
