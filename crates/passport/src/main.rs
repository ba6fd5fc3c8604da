//! Passport HTTP server entry point

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, Level};

use passport::auth::SigningKey;
use passport::core::SystemClock;
use passport::store::{Ledger, MemoryStore, SqliteStore};
use passport::{http, Passport, PassportConfig, StoreBackend, TokenKeys};

#[derive(Parser)]
#[command(name = "passport-server")]
#[command(about = "Conference passport stamping service", long_about = None)]
struct Cli {
    /// Configuration file (TOML). Defaults are used when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Address to listen on, overriding the configured host and port
    #[arg(short, long)]
    bind: Option<String>,

    /// Log at debug level
    #[arg(short, long)]
    verbose: bool,

    /// Print a fresh Ed25519 seed and public key for the token config, then exit
    #[arg(long)]
    generate_key: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.generate_key {
        let key = SigningKey::generate_ed25519();
        let seed = key.ed25519_seed_hex().context("generated key is not ed25519")?;
        let public = key
            .verifier_key()
            .ed25519_public_hex()
            .context("generated key is not ed25519")?;
        println!(
            "# [token] algorithm = \"ed25519\"; export the seed as {}",
            passport::config::SECRET_ENV
        );
        println!("seed = {seed}");
        println!("public_key = {public}");
        return Ok(());
    }

    // Load configuration
    let config = match &cli.config {
        Some(path) => PassportConfig::from_file(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => {
            let mut config = PassportConfig::default();
            config.token.secret = std::env::var(passport::config::SECRET_ENV).ok();
            config
        }
    };

    // Initialize logging
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        config
            .log_level
            .parse()
            .with_context(|| format!("invalid log_level {:?}", config.log_level))?
    };
    tracing_subscriber::fmt().with_max_level(level).init();

    let keys = config.token.build_keys()?;
    let addr = cli.bind.clone().unwrap_or_else(|| config.bind_address());

    match config.store.backend {
        StoreBackend::Memory => {
            info!("using in-memory store; data is lost on exit");
            serve(MemoryStore::new(), keys, &addr).await
        }
        StoreBackend::Sqlite => {
            let store = SqliteStore::open(&config.store.path)
                .with_context(|| format!("opening {}", config.store.path.display()))?;
            info!(path = %config.store.path.display(), "opened sqlite store");
            serve(store, keys, &addr).await
        }
    }
}

async fn serve<L: Ledger + 'static>(ledger: L, keys: TokenKeys, addr: &str) -> Result<()> {
    let passport = Arc::new(Passport::new(ledger, keys, Arc::new(SystemClock)));
    let app = http::router(passport);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    info!(addr = %addr, "passport server listening");

    axum::serve(listener, app).await?;
    Ok(())
}
