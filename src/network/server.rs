//! WebSocket Game Server
//!
//! Accepts WebSocket connections, turns each text frame into one service
//! call and one reply, and fans game events out to every connection.

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use chrono::Utc;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, RwLock, broadcast};
use tokio_tungstenite::{accept_async, tungstenite::Message};
use futures_util::{SinkExt, StreamExt};
use tracing::{info, warn, error, debug, instrument};

use crate::network::protocol::{
    ClientMessage, ServerMessage, ServerError, ErrorCode, DEFAULT_LEADERBOARD_LIMIT,
};
use crate::network::service::{GameService, ServiceConfig, ServiceError};

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address.
    pub bind_addr: SocketAddr,
    /// Maximum concurrent connections.
    pub max_connections: usize,
    /// Sled directory; `None` keeps everything in memory.
    pub data_dir: Option<PathBuf>,
    /// Service settings.
    pub service: ServiceConfig,
    /// Server version string.
    pub version: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            max_connections: 1000,
            data_dir: None,
            service: ServiceConfig::default(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

impl ServerConfig {
    /// Read `ARENA_*` environment variables over the defaults.
    pub fn from_env() -> Result<Self, GameServerError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; unset keys keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, GameServerError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(addr) = parse_var(&lookup, "ARENA_BIND_ADDR")? {
            config.bind_addr = addr;
        }
        if let Some(max) = parse_var(&lookup, "ARENA_MAX_CONNECTIONS")? {
            config.max_connections = max;
        }
        config.data_dir = lookup("ARENA_DATA_DIR")
            .filter(|dir| !dir.is_empty())
            .map(PathBuf::from);
        config.service.admin_token = lookup("ARENA_ADMIN_TOKEN").filter(|t| !t.is_empty());
        if let Some(secs) = parse_var::<i64, _>(&lookup, "ARENA_STALE_AFTER_SECS")? {
            config.service.stale_after = chrono::Duration::seconds(secs);
        }
        if let Some(attempts) = parse_var::<u32, _>(&lookup, "ARENA_MAX_WRITE_ATTEMPTS")? {
            config.service.max_write_attempts = attempts.max(1);
        }

        Ok(config)
    }
}

fn parse_var<T, F>(lookup: &F, key: &'static str) -> Result<Option<T>, GameServerError>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| GameServerError::InvalidConfig { key, value }),
        None => Ok(None),
    }
}

/// Game server errors.
#[derive(Debug, thiserror::Error)]
pub enum GameServerError {
    /// Failed to bind to address.
    #[error("Failed to bind: {0}")]
    BindFailed(#[from] std::io::Error),

    /// WebSocket error.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// Environment variable did not parse.
    #[error("Invalid value for {key}: {value:?}")]
    InvalidConfig {
        /// Variable name
        key: &'static str,
        /// Raw value
        value: String,
    },
}

/// Connected client state.
struct ConnectedClient {
    /// Connection time.
    connected_at: Instant,
    /// Requests handled.
    requests: u64,
}

/// The game server.
pub struct GameServer {
    /// Server configuration.
    config: ServerConfig,
    /// Request handler.
    service: Arc<GameService>,
    /// Connected clients.
    clients: Arc<RwLock<BTreeMap<SocketAddr, ConnectedClient>>>,
    /// Shutdown signal.
    shutdown_tx: broadcast::Sender<()>,
}

impl GameServer {
    /// Create a new game server.
    pub fn new(config: ServerConfig, service: Arc<GameService>) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);

        Self {
            config,
            service,
            clients: Arc::new(RwLock::new(BTreeMap::new())),
            shutdown_tx,
        }
    }

    /// Bind and serve until shutdown.
    #[instrument(skip(self))]
    pub async fn run(&self) -> Result<(), GameServerError> {
        let listener = TcpListener::bind(&self.config.bind_addr).await?;
        self.serve(listener).await
    }

    /// Serve on an already bound listener until shutdown.
    pub async fn serve(&self, listener: TcpListener) -> Result<(), GameServerError> {
        info!(
            "Coin arena server v{} listening on {}",
            self.config.version,
            listener.local_addr()?
        );

        let mut shutdown_rx = self.shutdown_tx.subscribe();

        loop {
            tokio::select! {
                result = listener.accept() => {
                    match result {
                        Ok((stream, addr)) => {
                            let clients_count = self.clients.read().await.len();
                            if clients_count >= self.config.max_connections {
                                warn!("Connection limit reached, rejecting {}", addr);
                                continue;
                            }

                            info!("New connection from {}", addr);
                            self.handle_connection(stream, addr);
                        }
                        Err(e) => {
                            error!("Accept error: {}", e);
                        }
                    }
                }
                _ = shutdown_rx.recv() => {
                    info!("Shutdown signal received");
                    break;
                }
            }
        }

        Ok(())
    }

    /// Handle a new WebSocket connection.
    fn handle_connection(&self, stream: TcpStream, addr: SocketAddr) {
        let clients = self.clients.clone();
        let service = self.service.clone();
        let mut shutdown_rx = self.shutdown_tx.subscribe();
        let mut events = service.subscribe();

        tokio::spawn(async move {
            let ws_stream = match accept_async(stream).await {
                Ok(ws) => ws,
                Err(e) => {
                    error!("WebSocket handshake failed for {}: {}", addr, e);
                    return;
                }
            };

            let (mut ws_sender, mut ws_receiver) = ws_stream.split();
            let (msg_tx, mut msg_rx) = mpsc::channel::<ServerMessage>(64);

            clients.write().await.insert(addr, ConnectedClient {
                connected_at: Instant::now(),
                requests: 0,
            });

            // Single writer per socket; replies and events share the queue
            let sender_task = tokio::spawn(async move {
                while let Some(msg) = msg_rx.recv().await {
                    let text = match msg.to_json() {
                        Ok(t) => t,
                        Err(e) => {
                            error!("Failed to serialize message: {}", e);
                            continue;
                        }
                    };
                    if ws_sender.send(Message::Text(text)).await.is_err() {
                        break;
                    }
                }
                let _ = ws_sender.close().await;
            });

            loop {
                tokio::select! {
                    msg = ws_receiver.next() => {
                        match msg {
                            Some(Ok(Message::Text(text))) => {
                                let reply = match ClientMessage::from_json(&text) {
                                    Ok(request) => {
                                        if let Some(client) = clients.write().await.get_mut(&addr) {
                                            client.requests += 1;
                                        }
                                        debug!("{} from {}", request.kind(), addr);
                                        handle_message(&service, request).await
                                    }
                                    Err(e) => {
                                        debug!("Invalid message from {}: {}", addr, e);
                                        ServerMessage::Error(ServerError::new(
                                            ErrorCode::InvalidMessage,
                                            format!("Invalid message format: {}", e),
                                        ))
                                    }
                                };
                                if msg_tx.send(reply).await.is_err() {
                                    break;
                                }
                            }
                            Some(Ok(Message::Close(_))) | None => {
                                debug!("Client {} disconnected", addr);
                                break;
                            }
                            Some(Err(e)) => {
                                error!("WebSocket error for {}: {}", addr, e);
                                break;
                            }
                            // Ping/pong frames are answered by tungstenite
                            _ => {}
                        }
                    }
                    event = events.recv() => {
                        match event {
                            Ok(event) => {
                                if msg_tx.send(ServerMessage::Event(event)).await.is_err() {
                                    break;
                                }
                            }
                            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                                warn!("Client {} missed {} events", addr, skipped);
                            }
                            Err(broadcast::error::RecvError::Closed) => break,
                        }
                    }
                    _ = shutdown_rx.recv() => {
                        let _ = msg_tx.send(ServerMessage::Shutdown {
                            reason: "Server shutting down".to_string(),
                        }).await;
                        break;
                    }
                }
            }

            // Let queued replies drain before the socket closes
            drop(msg_tx);
            if tokio::time::timeout(Duration::from_secs(1), sender_task).await.is_err() {
                debug!("Writer for {} did not drain in time", addr);
            }

            if let Some(client) = clients.write().await.remove(&addr) {
                info!(
                    "Client {} cleaned up after {:?}, {} requests",
                    addr,
                    client.connected_at.elapsed(),
                    client.requests
                );
            }
        });
    }

    /// Shutdown the server.
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());
    }

    /// Get active connection count.
    pub async fn connection_count(&self) -> usize {
        self.clients.read().await.len()
    }
}

/// Answer one client request.
pub async fn handle_message(service: &GameService, msg: ClientMessage) -> ServerMessage {
    let result = match msg {
        ClientMessage::Join { vehicle_type, proof_seed } => service
            .join(&vehicle_type, &proof_seed)
            .await
            .map(ServerMessage::Joined),
        ClientMessage::Move { vehicle_id, direction } => service
            .move_vehicle(&vehicle_id, &direction)
            .await
            .map(ServerMessage::Moved),
        ClientMessage::Boost { vehicle_id, direction } => service
            .boost(&vehicle_id, &direction)
            .await
            .map(ServerMessage::Boosted),
        ClientMessage::GetState => service.state().await.map(ServerMessage::State),
        ClientMessage::Reset { token } => service
            .reset(token.as_deref())
            .await
            .map(ServerMessage::State),
        ClientMessage::Leaderboard { limit } => service
            .leaderboard(limit.unwrap_or(DEFAULT_LEADERBOARD_LIMIT))
            .await
            .map(|entries| ServerMessage::Leaderboard { entries }),
        ClientMessage::Player { owner } => service.player(&owner).await.map(ServerMessage::Player),
        ClientMessage::Etch { owner, tx } => service.etch(&owner, &tx).await.map(ServerMessage::Etched),
        ClientMessage::Ping { timestamp } => Ok(ServerMessage::Pong {
            timestamp,
            server_time: u64::try_from(Utc::now().timestamp_millis()).unwrap_or_default(),
        }),
    };

    result.unwrap_or_else(|e| {
        match &e {
            ServiceError::Store(_) | ServiceError::Codec(_) => error!("Request failed: {}", e),
            _ => debug!("Request rejected: {}", e),
        }
        ServerMessage::Error(ServerError::from(&e))
    })
}
