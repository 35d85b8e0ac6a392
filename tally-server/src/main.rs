//! tally-server binary: load configuration, wire the engine, serve.

use anyhow::{Context, Result};
use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tally_cluster::{cache, ClaimCache, HeaderNames, IncrLoader, PeerPool, PeerTransport};
use tally_core::store::Shutdown;
use tally_core::{Config, LocalStore, RemoteStoreRegistry};
use tally_server::api::server::{listen_addr, ApiServer};
use tally_server::{AppState, GROUP_NAME};
use uuid::Uuid;

/// Cluster-coordinated monotonic counter service.
#[derive(Parser)]
#[command(name = "tally-server", version, about, long_about = None)]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Increase verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = Config::load(&cli.config)
        .with_context(|| format!("loading config {}", cli.config.display()))?;

    let server_id = Uuid::new_v4().to_string();
    tracing::info!(server_id = %server_id, environment = %config.environment, "starting tally");

    let local =
        Arc::new(LocalStore::open(&config.datastore.local).context("opening local store")?);

    let registry = RemoteStoreRegistry::with_builtin();
    let (remote_name, remote) = registry
        .build(&config.datastore)
        .context("building remote store")?;

    let addr = listen_addr(&config.server.ports.http)?;
    let self_url = resolve_self_url(&config, addr);

    let pool = Arc::new(PeerPool::new(self_url.clone(), config.cache.replicas));
    pool.set_peers(config.cache.pool.clone());

    let transport = PeerTransport::new(
        &config.cache.base_path,
        HeaderNames::from(&config.cache.header),
    );
    let loader = Arc::new(IncrLoader::new(Arc::clone(&local), Arc::clone(&remote)));
    let claim_cache = Arc::new(ClaimCache::new(
        GROUP_NAME,
        pool,
        transport,
        loader,
        cache::DEFAULT_CAPACITY,
    ));

    let state = Arc::new(AppState::new(
        server_id,
        Arc::clone(&local),
        remote,
        claim_cache,
        &config,
    ));

    if config.show_config {
        show_config(&config, &remote_name, &self_url);
    }

    // Shutdown hooks run in registration order once the server has drained.
    let shutdown_hooks: Vec<Arc<dyn Shutdown>> = vec![local];

    let mut server = ApiServer::bind(addr, state).await?;
    let handle = server.shutdown_handle();
    tokio::spawn(async move {
        let _ = tokio::signal::ctrl_c().await;
        tracing::info!("shutdown signal received");
        if let Some(tx) = handle {
            let _ = tx.send(());
        }
    });

    server.run().await?;

    for hook in shutdown_hooks {
        if let Err(e) = hook.shutdown() {
            tracing::warn!(error = %e, "shutdown hook failed");
        }
    }

    Ok(())
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// This node's reachable URL: configured, or localhost on the listen port.
fn resolve_self_url(config: &Config, addr: SocketAddr) -> String {
    match config.cache.self_url.as_deref().filter(|s| !s.is_empty()) {
        Some(url) => url.trim_end_matches('/').to_string(),
        None => {
            let fallback = format!("http://localhost:{}", addr.port());
            tracing::warn!(
                fallback = %fallback,
                "cache.self is not set; peers must be able to reach this node at the fallback"
            );
            fallback
        }
    }
}

fn show_config(config: &Config, remote_name: &str, self_url: &str) {
    tracing::info!(value = %config.environment, "[config] environment");
    tracing::info!(value = %config.server.ports.http, "[config] http port");
    tracing::info!(value = %config.server.urls.healthcheck, "[config] healthcheck url");
    tracing::info!(value = %config.server.api.public_prefix, "[config] public prefix");
    tracing::info!(value = ?config.server.api.domains, "[config] api domains");
    tracing::info!(value = %self_url, "[config] cache self");
    tracing::info!(value = ?config.cache.pool, "[config] cache pool");
    tracing::info!(value = %config.cache.replicas, "[config] cache replicas");
    tracing::info!(value = %config.cache.base_path, "[config] cache base path");
    tracing::info!(value = %config.cache.header.id, "[config] cache header id");
    tracing::info!(value = %config.cache.header.ts, "[config] cache header ts");
    tracing::info!(value = %config.cache.header.kind, "[config] cache header kind");
    tracing::info!(value = %config.datastore.local.bucket, "[config] local bucket");
    tracing::info!(value = %config.datastore.local.cleanup_db_file, "[config] local cleanup on shutdown");
    tracing::info!(value = %remote_name, "[config] remote store");
}
