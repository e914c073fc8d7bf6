//! Credential Authority
//! Mission: Register users, log them in per app and vouch for the tokens it issues

use anyhow::{Context, Result};
use clap::Parser;
use credential_authority::{
    auth::{api, models::App, AuthService, AuthState, PasswordHasher, UserStore},
    config::{self, AppConfig, Cli, Command, ServeConfig},
};
use std::path::Path;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    config::load_env();
    init_tracing();

    let cli = Cli::parse();
    match cli.command {
        Command::Serve(cfg) => serve(&cli.db_path, cfg).await,
        Command::ProvisionApp(app) => provision_app(&cli.db_path, app),
    }
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "credential_authority=debug,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

async fn serve(db_path: &Path, cfg: ServeConfig) -> Result<()> {
    info!("🔐 Credential Authority starting");

    let store = Arc::new(UserStore::new(db_path).context("Failed to open user store")?);
    info!("💾 User store ready at {}", db_path.display());

    let hasher = PasswordHasher::new(cfg.bcrypt_cost).context("Invalid bcrypt cost")?;
    let service = AuthService::new(store.clone(), store.clone(), store, cfg.token_ttl())
        .with_hasher(hasher);

    let app = api::router(AuthState::new(Arc::new(service)), cfg.request_timeout());

    let listener = TcpListener::bind(cfg.listen_addr)
        .await
        .with_context(|| format!("Failed to bind {}", cfg.listen_addr))?;
    info!(
        token_ttl_secs = cfg.token_ttl_secs,
        bcrypt_cost = cfg.bcrypt_cost,
        request_timeout_ms = cfg.request_timeout_ms,
        "🌐 Listening on {}",
        cfg.listen_addr
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("🛑 Gracefully stopped");
    Ok(())
}

fn provision_app(db_path: &Path, app: AppConfig) -> Result<()> {
    let store = UserStore::new(db_path).context("Failed to open user store")?;
    store.upsert_app(&App {
        id: app.id,
        name: app.name,
        secret: app.secret,
    })
}

/// Resolve on SIGINT, or SIGTERM on unix.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
