use anyhow::Result;
use clap::Parser;
use devcamper::prelude::*;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "devcamper-server")]
#[command(about = "DevCamper bootcamp directory API")]
struct Cli {
    /// YAML configuration file
    #[arg(long)]
    config: Option<String>,

    /// Import the seed files of this directory before serving
    #[arg(long, value_name = "DIR")]
    seed: Option<PathBuf>,

    /// Delete every record and exit
    #[arg(long)]
    destroy: bool,
}

fn in_memory_store() -> Arc<dyn DocumentStore> {
    tracing::info!("using the in-memory store");
    Arc::new(InMemoryStore::new())
}

#[cfg(feature = "mongodb_backend")]
async fn open_store(config: &AppConfig) -> Result<Arc<dyn DocumentStore>> {
    let Some(uri) = &config.database.mongo_uri else {
        return Ok(in_memory_store());
    };
    let store = MongoStore::connect(uri, &config.database.name).await?;
    tracing::info!(database = %config.database.name, "connected to MongoDB");
    Ok(Arc::new(store))
}

#[cfg(not(feature = "mongodb_backend"))]
async fn open_store(config: &AppConfig) -> Result<Arc<dyn DocumentStore>> {
    if config.database.mongo_uri.is_some() {
        tracing::warn!("MONGO_URI is set but the mongodb_backend feature is disabled");
    }
    Ok(in_memory_store())
}

async fn run(cli: Cli) -> Result<()> {
    let config = AppConfig::load(cli.config.as_deref())?;
    let address = config.bind_address();

    let store = open_store(&config).await?;
    let state = AppState::new(store, config);
    ensure_indexes(&state).await?;

    if cli.destroy {
        devcamper::seed::destroy(&state).await?;
        return Ok(());
    }
    if let Some(dir) = &cli.seed {
        devcamper::seed::import_dir(&state, dir).await?;
    }

    register_resources(ServerBuilder::new(state))
        .serve(&address)
        .await
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Err(e) = run(Cli::parse()).await {
        tracing::error!(error = %e, "server failed");
        std::process::exit(1);
    }
}
