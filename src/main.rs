//! Coin Arena Server
//!
//! Serves the arena over WebSocket. Configured from `ARENA_*` environment
//! variables; logging from `RUST_LOG`.

use std::sync::Arc;
use anyhow::{Context, Result};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use coin_arena::{
    VERSION,
    store::{DocumentStore, MemoryStore, SledStore},
    network::{GameServer, GameService, ServerConfig},
};

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Coin Arena Server v{}", VERSION);

    let config = ServerConfig::from_env().context("reading configuration")?;

    let store: Arc<dyn DocumentStore> = match &config.data_dir {
        Some(dir) => Arc::new(
            SledStore::open(dir).with_context(|| format!("opening store at {}", dir.display()))?,
        ),
        None => {
            info!("ARENA_DATA_DIR not set; games and leaderboard are kept in memory");
            Arc::new(MemoryStore::new())
        }
    };

    if config.service.admin_token.is_none() {
        warn!("ARENA_ADMIN_TOKEN not set; any client can reset the game");
    }

    let service = Arc::new(GameService::new(store, config.service.clone()));
    let server = Arc::new(GameServer::new(config, service));

    let signal_server = server.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            signal_server.shutdown();
        }
    });

    server.run().await?;
    info!("Server stopped");

    Ok(())
}
