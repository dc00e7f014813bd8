//! Storefront CLI
//!
//! Command-line front end for the storefront REST backend:
//! 1. Loads config (TOML file, env overrides)
//! 2. Opens the on-disk credential store
//! 3. Runs one subcommand through the authenticated client
//! 4. Prints the JSON result to stdout

mod args;
mod commands;
mod config;
mod error;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use storefront_api::{ApiClient, AuthApi, LogRedirect, UnauthenticatedHandler};
use storefront_session::{Credentials, FileStore};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::commands::Commands;
use crate::config::Config;

#[derive(Parser)]
#[command(name = "storefront")]
#[command(about = "Authenticated client for the storefront API")]
#[command(version)]
struct Cli {
    /// Path to the TOML config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Initialize tracing with LOG_LEVEL / RUST_LOG support. Logs go to stderr so
/// stdout carries only command output; JSON when LOG_FORMAT=json.
fn init_tracing() {
    let filter = EnvFilter::try_from_env("LOG_LEVEL")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);

    if std::env::var("LOG_FORMAT").is_ok_and(|f| f.eq_ignore_ascii_case("json")) {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let config_path = Config::resolve_path(cli.config.as_deref());
    let config = Config::load(&config_path)
        .with_context(|| format!("failed to load config from {}", config_path.display()))?;

    info!(
        base_url = %config.api.base_url,
        timeout_secs = config.api.timeout_secs,
        headers = config.api.headers.len(),
        refresh_policy = ?config.session.refresh_policy,
        "configuration loaded"
    );

    let store = FileStore::load(config.session.credentials_path.clone())
        .await
        .with_context(|| {
            format!(
                "failed to open credential store {}",
                config.session.credentials_path.display()
            )
        })?;
    debug!(path = %store.path().display(), "credential store opened");
    let credentials = Credentials::new(Arc::new(store));
    let on_unauthenticated: Arc<dyn UnauthenticatedHandler> = Arc::new(LogRedirect);

    let client = ApiClient::builder(config.api.base_url.clone())
        .timeout(config.api.timeout())
        .headers(config.api.headers.clone())
        .credentials(credentials.clone())
        .on_unauthenticated(on_unauthenticated.clone())
        .login_path(config.session.login_path.clone())
        .refresh_policy(config.session.refresh_policy)
        .build()
        .context("failed to build API client")?;
    let auth = AuthApi::new(client.clone(), credentials, on_unauthenticated);

    let output = cli.command.execute(&client, &auth).await?;
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
