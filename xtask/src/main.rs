use abacus_core::auth::{role_label, Principal};
use abacus_core::credentials::{CredentialStore, FileCredentialStore, TokenKind};
use abacus_core::telemetry;
use abacus_core::tier::{SessionState, Tier};
use anyhow::{ensure, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "xtask", version, about = "Automation helpers for Abacus")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run a lightweight smoke test that exercises the session core.
    Smoke,
}

fn main() -> Result<()> {
    telemetry::init_tracing(EnvFilter::new("info"))?;
    let cli = Cli::parse();

    match cli.command {
        Commands::Smoke => smoke_test(),
    }
}

fn smoke_test() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let store = FileCredentialStore::new(dir.path().join("credentials.json"));

    store.set(TokenKind::Access, "smoke-access");
    store.set(TokenKind::Refresh, "smoke-refresh");
    ensure!(store.get(TokenKind::Access) == "smoke-access");
    ensure!(store.get(TokenKind::Refresh) == "smoke-refresh");
    store.clear();
    ensure!(store.get(TokenKind::Access).is_empty());
    ensure!(store.get(TokenKind::Refresh).is_empty());
    info!("credential store round trip ok");

    let session = SessionState::new();
    session.reveal_login();
    session.complete_login(Principal {
        username: "smoke".into(),
        display_name: "Smoke".into(),
        role: "OBSERVER".into(),
    });
    ensure!(session.tier() == Tier::Authenticated);
    session.raise_overlay();
    ensure!(session.overlay_raised());
    session.logout();
    ensure!(session.tier() == Tier::Facade);
    ensure!(!session.overlay_raised());
    info!(
        "label" = role_label("OBSERVER"),
        "tier walk ok, smoke test passed"
    );

    Ok(())
}
