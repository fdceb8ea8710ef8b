//! doc-bridge binary entry point

use anyhow::Context;
use clap::Parser;
use doc_bridge::config::{ConfigLoader, LogFormat};
use doc_bridge::handlers::document::engines::MemoryConnector;
use doc_bridge::handlers::document::StoreConnector;
use doc_bridge::{DocumentHandler, HttpBridgeServer};
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Debug, Parser)]
#[command(name = "doc-bridge", version, about = "HTTP bridge to MongoDB")]
struct Cli {
    /// Configuration file (TOML)
    #[arg(short, long, env = "DOC_BRIDGE_CONFIG")]
    config: Option<String>,

    /// Address to listen on
    #[arg(short, long, env = "DOC_BRIDGE_BIND")]
    bind: Option<String>,

    /// Log level or filter directive
    #[arg(long, env = "DOC_BRIDGE_LOG_LEVEL")]
    log_level: Option<String>,

    /// Log output format
    #[arg(long, value_enum)]
    log_format: Option<LogFormat>,

    /// Serve an in-memory store instead of connecting to MongoDB
    #[arg(long)]
    memory: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = ConfigLoader::new()
        .load_from_file(cli.config.as_deref())
        .load_from_env()
        .build()?;

    if let Some(bind) = cli.bind {
        config.server.bind_addr = bind;
    }
    if let Some(level) = cli.log_level {
        config.logging.level = level;
    }
    if let Some(format) = cli.log_format {
        config.logging.format = format;
    }

    let _guard = doc_bridge::logging::init_logging(&config.logging)?;

    let connector = select_connector(cli.memory, &config);
    let handler = DocumentHandler::new(&config, connector);
    let server = HttpBridgeServer::new(&config.server, handler)?;

    info!(version = env!("CARGO_PKG_VERSION"), "starting doc-bridge");
    server
        .serve(&config.server.bind_addr)
        .await
        .with_context(|| format!("server on {} failed", config.server.bind_addr))?;

    Ok(())
}

#[cfg(feature = "mongodb-backend")]
fn select_connector(memory: bool, config: &doc_bridge::config::BridgeConfig) -> Arc<dyn StoreConnector> {
    use doc_bridge::handlers::document::engines::{MongoConnectionOptions, MongoConnector};

    if memory {
        warn!("serving the in-memory store; data is lost on restart");
        return Arc::new(MemoryConnector::new());
    }
    Arc::new(MongoConnector::new(
        MongoConnectionOptions::from_store_config(&config.store),
    ))
}

#[cfg(not(feature = "mongodb-backend"))]
fn select_connector(memory: bool, _config: &doc_bridge::config::BridgeConfig) -> Arc<dyn StoreConnector> {
    if !memory {
        warn!("built without mongodb-backend; serving the in-memory store");
    }
    Arc::new(MemoryConnector::new())
}
