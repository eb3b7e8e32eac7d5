//! # TCP Server Implementation
//!
//! Reference server that answers batches sent by [`TcpSession`]s.
//!
//! ## Architecture
//!
//! - the main loop accepts incoming connections
//! - each connection gets its own async task
//! - each request line is one batch; it is executed against the shared
//!   [`Store`] on the blocking pool and answered with one response line
//!
//! ## Protocol
//!
//! See [`crate::protocol`]. Codes are sent raw; clients classify them.
//!
//! [`TcpSession`]: crate::session::TcpSession

use crate::config::{EngineKind, ServerConfig};
use crate::error_code::ErrorCode;
use crate::protocol::{encode_line, parse_request, BatchResponse};
use crate::store::{MemoryEngine, SledEngine, Store, StoreEngine};
use anyhow::Result;
use log::{debug, error, info};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};

const DRAIN_LIMIT: u64 = 64 * 1024;
const DRAIN_TIMEOUT: Duration = Duration::from_secs(1);

/// Counters kept for the lifetime of the server.
#[derive(Debug)]
pub struct ServerStats {
    /// Total number of connections since server start
    pub total_connections: AtomicU64,

    /// Current number of active connections
    pub active_connections: AtomicU64,

    /// Batches executed
    pub batches: AtomicU64,

    /// Operations executed, across all batches
    pub operations: AtomicU64,

    /// Requests rejected before execution
    pub rejected: AtomicU64,

    pub start_time: Instant,
}

impl Default for ServerStats {
    fn default() -> Self {
        Self::new()
    }
}

impl ServerStats {
    pub fn new() -> Self {
        Self {
            total_connections: AtomicU64::new(0),
            active_connections: AtomicU64::new(0),
            batches: AtomicU64::new(0),
            operations: AtomicU64::new(0),
            rejected: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    fn record_batch(&self, operations: usize) {
        self.batches.fetch_add(1, Ordering::Relaxed);
        self.operations.fetch_add(operations as u64, Ordering::Relaxed);
    }

    /// One-line summary for the log.
    pub fn summary(&self) -> String {
        format!(
            "up {}s, {} active / {} total connections, {} batches, {} operations, {} rejected",
            self.uptime_seconds(),
            self.active_connections.load(Ordering::Relaxed),
            self.total_connections.load(Ordering::Relaxed),
            self.batches.load(Ordering::Relaxed),
            self.operations.load(Ordering::Relaxed),
            self.rejected.load(Ordering::Relaxed),
        )
    }
}

/// Open the engine selected by `config`.
pub fn open_engine(config: &ServerConfig) -> Result<Box<dyn StoreEngine>> {
    let engine: Box<dyn StoreEngine> = match config.engine {
        EngineKind::Memory => Box::new(MemoryEngine::new()),
        EngineKind::Sled => Box::new(SledEngine::new(&config.storage_path)?),
    };
    Ok(engine)
}

/// A bound TCP server, ready to accept connections.
pub struct Server {
    listener: TcpListener,
    store: Arc<Store>,
    stats: Arc<ServerStats>,
    max_message_bytes: usize,
}

impl Server {
    /// Bind to `config.host:config.port`. Port 0 binds a free port; see
    /// [`local_addr`](Self::local_addr).
    pub async fn bind(config: &ServerConfig, store: Store) -> Result<Self> {
        let addr = config.bind_addr();
        let listener = TcpListener::bind(&addr).await?;
        info!("Server listening on {}", listener.local_addr()?);

        Ok(Self {
            listener,
            store: Arc::new(store),
            stats: Arc::new(ServerStats::new()),
            max_message_bytes: config.max_message_bytes,
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    pub fn stats(&self) -> Arc<ServerStats> {
        Arc::clone(&self.stats)
    }

    /// Accept connections until the task is dropped.
    ///
    /// # Errors
    ///
    /// Only fails if the listener itself stops working; errors on a single
    /// connection are logged and do not stop the server.
    pub async fn run(self) -> Result<()> {
        loop {
            match self.listener.accept().await {
                Ok((socket, addr)) => {
                    info!("Accepted connection from {}", addr);
                    let store = Arc::clone(&self.store);
                    let stats = Arc::clone(&self.stats);
                    let max_message_bytes = self.max_message_bytes;

                    stats.total_connections.fetch_add(1, Ordering::Relaxed);
                    stats.active_connections.fetch_add(1, Ordering::Relaxed);

                    tokio::spawn(async move {
                        let served =
                            handle_connection(socket, addr, store, &stats, max_message_bytes);
                        if let Err(e) = served.await {
                            error!("Error handling connection from {}: {}", addr, e);
                        }
                        stats.active_connections.fetch_sub(1, Ordering::Relaxed);
                        info!("Connection from {} finished; {}", addr, stats.summary());
                    });
                }
                Err(e) => {
                    error!("Failed to accept connection: {}", e);
                }
            }
        }
    }
}

/// Serve one client: read a request line, execute it, write the response,
/// until the client disconnects or sends a line over `max_message_bytes`.
async fn handle_connection(
    socket: TcpStream,
    addr: SocketAddr,
    store: Arc<Store>,
    stats: &ServerStats,
    max_message_bytes: usize,
) -> Result<()> {
    let (reader, mut writer) = socket.into_split();
    let mut reader = BufReader::new(reader);
    let limit = max_message_bytes as u64 + 1;
    let mut line = String::new();

    loop {
        line.clear();
        let read = (&mut reader).take(limit).read_line(&mut line).await?;
        if read == 0 {
            break;
        }

        if read as u64 == limit && !line.ends_with('\n') {
            stats.rejected.fetch_add(1, Ordering::Relaxed);
            error!("Request from {} exceeds {} bytes, closing", addr, max_message_bytes);
            let rejection = BatchResponse::rejected(
                ErrorCode::INVALID_PROTOCOL,
                format!("request exceeds {} bytes", max_message_bytes),
            );
            writer.write_all(encode_line(&rejection)?.as_bytes()).await?;
            writer.shutdown().await?;

            // unread input would turn the close into a reset and lose the reply
            let mut rest = (&mut reader).take(DRAIN_LIMIT);
            let mut sink = tokio::io::sink();
            let _ = tokio::time::timeout(DRAIN_TIMEOUT, tokio::io::copy(&mut rest, &mut sink)).await;
            return Ok(());
        }

        if line.trim().is_empty() {
            continue;
        }

        let response = match parse_request(&line) {
            Ok(request) => {
                let count = request.operations.len();
                debug!("Executing batch of {} operations from {}", count, addr);

                let store = Arc::clone(&store);
                let (success_count, results) =
                    tokio::task::spawn_blocking(move || store.execute(&request.operations))
                        .await?;

                stats.record_batch(count);
                BatchResponse::Completed {
                    success_count,
                    results,
                }
            }
            Err(rejection) => {
                stats.rejected.fetch_add(1, Ordering::Relaxed);
                debug!("Rejected request from {}: {:?}", addr, rejection);
                rejection
            }
        };

        writer.write_all(encode_line(&response)?.as_bytes()).await?;
    }

    info!("Connection closed by {}", addr);
    Ok(())
}
