//! Initiative Viewer server
//!
//! Web front end for building Jira initiative hierarchies and exporting them.

use anyhow::{Context, Result};
use clap::Parser;
use initiative::{DiskCacheStore, JiraConnector, ResultCache, ViewerConfig};
use initiative_server::{create_routes, AppContext};
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "initiative-server")]
#[command(about = "Web front end for the Jira initiative viewer", version)]
struct Args {
    /// Address to bind
    #[arg(long, env = "INITIATIVE_VIEWER_HOST", default_value = "0.0.0.0")]
    host: String,

    /// Port to listen on
    #[arg(short, long, env = "INITIATIVE_VIEWER_PORT", default_value_t = 5001)]
    port: u16,

    /// TOML configuration file
    #[arg(long, env = "INITIATIVE_VIEWER_CONFIG")]
    config: Option<PathBuf>,

    /// Always serve matching cached results before querying Jira
    #[arg(long)]
    cached: bool,

    /// Cache directory (overrides the configuration file)
    #[arg(long, env = "INITIATIVE_VIEWER_CACHE_DIR")]
    cache_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .compact()
        .init();

    info!("Starting Initiative Viewer...");

    let config = match &args.config {
        Some(path) => {
            info!("Loading configuration from {}", path.display());
            ViewerConfig::load(path)?
        }
        None => ViewerConfig::default(),
    };

    let cache_dir = args.cache_dir.clone().unwrap_or_else(|| config.cache.dir());
    let store = DiskCacheStore::open(&cache_dir).map_err(|e| {
        anyhow::anyhow!(
            "Failed to initialize cache: {:#}\n\n\
             Pass --cache-dir or set [cache] dir in the configuration file to a writable directory.",
            e
        )
    })?;
    info!(
        "Caching results in {} (TTL {}s)",
        cache_dir.display(),
        config.cache.ttl().num_seconds()
    );
    if args.cached {
        info!("Cached mode: matching cached results are served first");
    }

    let cache = ResultCache::new(store, config.cache.ttl());
    let connector = Arc::new(JiraConnector::new(config.jira.clone()));
    let context = AppContext::new(config, connector, cache)?.with_always_cached(args.cached);

    // Build CORS layer for local development
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = create_routes(Arc::new(context))
        .layer(cors)
        .layer(tower_http::trace::TraceLayer::new_for_http());

    let addr = format!("{}:{}", args.host, args.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("Server listening on http://{}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
