//! Blocking TCP session

use super::{Session, SubmittedBatch};
use crate::config::SessionConfig;
use crate::error::{Error, Result};
use crate::error_code::ErrorCode;
use crate::operation::Operation;
use crate::protocol::{decode_line, encode_line, BatchRequest, BatchResponse, MAX_MESSAGE_BYTES};
use log::{debug, info, warn};
use std::io::{self, BufRead, BufReader, BufWriter, Read, Write};
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

struct Connection {
    reader: BufReader<TcpStream>,
    writer: BufWriter<TcpStream>,
}

impl Connection {
    fn open(socket_addr: &SocketAddr, addr: &str, timeout: Duration) -> Result<Self> {
        let stream = TcpStream::connect_timeout(socket_addr, timeout)
            .map_err(|e| io_failure(&e, &format!("failed to connect to {}", addr)))?;
        stream.set_read_timeout(Some(timeout))?;
        stream.set_write_timeout(Some(timeout))?;
        stream.set_nodelay(true)?;

        let reader = BufReader::new(stream.try_clone()?);
        let writer = BufWriter::new(stream);
        Ok(Self { reader, writer })
    }

    /// Send one request line and read one response line of at most
    /// `max_bytes` bytes.
    fn exchange(&mut self, request: &str, max_bytes: usize) -> Result<String> {
        self.writer
            .write_all(request.as_bytes())
            .map_err(|e| io_failure(&e, "failed to send batch"))?;
        self.writer
            .flush()
            .map_err(|e| io_failure(&e, "failed to send batch"))?;

        let limit = max_bytes as u64 + 1;
        let mut response = String::new();
        let read = (&mut self.reader)
            .take(limit)
            .read_line(&mut response)
            .map_err(|e| io_failure(&e, "failed to read batch response"))?;

        if read == 0 {
            return Err(Error::remote(
                ErrorCode::CONNECTION_RESET,
                "server closed connection",
            ));
        }
        if read as u64 == limit && !response.ends_with('\n') {
            return Err(Error::remote(
                ErrorCode::INVALID_PROTOCOL,
                format!("response exceeds {} bytes", max_bytes),
            ));
        }
        Ok(response)
    }
}

/// Session that sends each batch to a server as one request line and reads
/// one response line back.
///
/// Calls block until the response arrives or the configured timeout
/// expires. Concurrent batches on the same session are serialized.
///
/// A connection is reused only after a complete exchange. When a round
/// trip fails part way (timeout, reset, oversized reply) the socket is
/// dropped together with any reply still in flight, and the next batch
/// opens a fresh connection.
///
/// # Example
///
/// ```rust,no_run
/// use qdb_client::{Batch, Result, TcpSession};
/// use std::sync::Arc;
///
/// fn main() -> Result<()> {
///     let session = Arc::new(TcpSession::connect("127.0.0.1:2836")?);
///     let mut batch = Batch::new(session);
///     let counter = batch.integer("counter").get()?;
///     batch.run()?;
///     println!("counter = {}", counter.get()?);
///     Ok(())
/// }
/// ```
pub struct TcpSession {
    connection: Mutex<Option<Connection>>,
    addr: String,
    socket_addr: SocketAddr,
    timeout: Duration,
    max_response_bytes: usize,
}

impl TcpSession {
    /// Connect with the default 30 second timeout.
    pub fn connect<S: Into<String>>(addr: S) -> Result<Self> {
        let addr = addr.into();
        Self::connect_with_timeout(&addr, DEFAULT_TIMEOUT)
    }

    pub fn from_config(config: &SessionConfig) -> Result<Self> {
        Ok(Self::connect_with_timeout(&config.address, config.timeout())?
            .with_max_response_bytes(config.max_message_bytes))
    }

    /// Connect to `addr` ("host:port"). `timeout` bounds the connect and
    /// every later read and write.
    ///
    /// # Errors
    ///
    /// * `HostNotFound` if the address does not resolve
    /// * `ConnectionRefused`, `Timeout` and friends if the connect fails
    pub fn connect_with_timeout(addr: &str, timeout: Duration) -> Result<Self> {
        info!("Connecting to {}", addr);

        let socket_addr = addr
            .to_socket_addrs()
            .ok()
            .and_then(|mut addrs| addrs.next())
            .ok_or_else(|| {
                Error::remote(ErrorCode::HOST_NOT_FOUND, format!("cannot resolve {}", addr))
            })?;

        let connection = Connection::open(&socket_addr, addr, timeout)?;

        info!("Connected to {}", addr);
        Ok(Self {
            connection: Mutex::new(Some(connection)),
            addr: addr.to_string(),
            socket_addr,
            timeout,
            max_response_bytes: MAX_MESSAGE_BYTES,
        })
    }

    /// Refuse response lines longer than `max_bytes`.
    pub fn with_max_response_bytes(mut self, max_bytes: usize) -> Self {
        self.max_response_bytes = max_bytes;
        self
    }

    /// The address this session is connected to.
    pub fn server_addr(&self) -> &str {
        &self.addr
    }

    fn round_trip(&self, request: &str) -> Result<String> {
        let mut slot = self
            .connection
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        let mut connection = match slot.take() {
            Some(connection) => connection,
            None => {
                info!("Reconnecting to {}", self.addr);
                Connection::open(&self.socket_addr, &self.addr, self.timeout)?
            }
        };

        match connection.exchange(request, self.max_response_bytes) {
            Ok(response) => {
                *slot = Some(connection);
                Ok(response)
            }
            Err(e) => {
                warn!("Dropping connection to {} after failed round trip: {}", self.addr, e);
                Err(e)
            }
        }
    }
}

impl Session for TcpSession {
    fn submit_batch(&self, operations: &[Operation]) -> Result<SubmittedBatch> {
        let request = BatchRequest::new(operations.to_vec());
        let line = encode_line(&request)
            .map_err(|e| Error::remote(ErrorCode::INVALID_ARGUMENT, e.to_string()))?;

        debug!("Sending batch of {} operations to {}", operations.len(), self.addr);
        let response = self.round_trip(&line)?;

        match decode_line::<BatchResponse>(&response) {
            Ok(BatchResponse::Completed {
                success_count,
                results,
            }) => {
                debug!("Received {} results from {}", results.len(), self.addr);
                Ok(SubmittedBatch {
                    success_count,
                    results,
                    buffer: None,
                })
            }
            Ok(BatchResponse::Rejected { code, message }) => Err(Error::remote(code, message)),
            Err(e) => Err(Error::unexpected_reply(format!("undecodable response: {}", e))),
        }
    }
}

impl Drop for TcpSession {
    fn drop(&mut self) {
        debug!("Closing connection to {}", self.addr);
    }
}

/// Map a socket failure onto the connection-origin code that describes it.
fn io_error_code(err: &io::Error) -> ErrorCode {
    match err.kind() {
        io::ErrorKind::ConnectionRefused => ErrorCode::CONNECTION_REFUSED,
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => ErrorCode::TIMEOUT,
        io::ErrorKind::ConnectionReset
        | io::ErrorKind::ConnectionAborted
        | io::ErrorKind::BrokenPipe
        | io::ErrorKind::UnexpectedEof => ErrorCode::CONNECTION_RESET,
        io::ErrorKind::NotConnected => ErrorCode::NOT_CONNECTED,
        _ => ErrorCode::SYSTEM_LOCAL,
    }
}

fn io_failure(err: &io::Error, context: &str) -> Error {
    Error::remote(io_error_code(err), format!("{}: {}", context, err))
}
