//! Per-Client Connection Loop
//!
//! Each client gets its own task running [`ConnectionHandler::run`]:
//!
//! ```text
//!    ┌──────────────────────────────┐
//!    │  read bytes into buffer      │<─────────┐
//!    └──────────────┬───────────────┘          │
//!                   ▼                          │
//!    ┌──────────────────────────────┐  incomplete
//!    │  parse as many frames as fit │──────────┘
//!    └──────────────┬───────────────┘
//!                   ▼ for each frame
//!    ┌──────────────────────────────┐
//!    │  execute, write reply        │
//!    └──────────────────────────────┘
//! ```
//!
//! TCP is a stream: one read may carry half a command or several pipelined
//! ones, so bytes accumulate in a `BytesMut` and frames are cut off its
//! front as they complete.
//!
//! The handler is generic over the stream so tests can drive it with an
//! in-memory mock instead of a socket.

use crate::commands::CommandHandler;
use crate::protocol::{ParseError, RespParser, RespValue};
use bytes::{Buf, BytesMut};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufWriter};
use tracing::{debug, error, info, trace, warn};

/// Maximum size for the read buffer (64 KB)
///
/// A frame whose bulk payload is still arriving may grow the buffer past
/// this, up to the length its header declared.
const MAX_BUFFER_SIZE: usize = 64 * 1024;

/// Initial buffer capacity
const INITIAL_BUFFER_SIZE: usize = 4096;

/// Statistics for connection handling
#[derive(Debug, Default)]
pub struct ConnectionStats {
    /// Total number of connections accepted
    pub connections_accepted: AtomicU64,
    /// Currently active connections
    pub active_connections: AtomicU64,
    /// Total commands processed
    pub commands_processed: AtomicU64,
    /// Total bytes read
    pub bytes_read: AtomicU64,
    /// Total bytes written
    pub bytes_written: AtomicU64,
}

impl ConnectionStats {
    pub fn new() -> Self {
        Self::default()
    }

    fn connection_opened(&self) {
        self.connections_accepted.fetch_add(1, Ordering::Relaxed);
        self.active_connections.fetch_add(1, Ordering::Relaxed);
    }

    fn connection_closed(&self) {
        self.active_connections.fetch_sub(1, Ordering::Relaxed);
    }

    fn record_read(&self, count: usize) {
        self.bytes_read.fetch_add(count as u64, Ordering::Relaxed);
    }

    fn record_reply(&self, count: usize) {
        self.commands_processed.fetch_add(1, Ordering::Relaxed);
        self.bytes_written.fetch_add(count as u64, Ordering::Relaxed);
    }
}

/// Errors that end a connection.
#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    /// I/O error (network issue)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The client sent bytes that are not RESP
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    /// Client closed the connection between commands. `run` reports this
    /// as `Ok(())`.
    #[error("Client disconnected")]
    ClientDisconnected,

    /// Client closed the connection in the middle of a command
    #[error("Unexpected end of stream")]
    UnexpectedEof,

    /// A single command did not fit in the read buffer
    #[error("Buffer size limit exceeded")]
    BufferFull,
}

impl ConnectionError {
    /// True for the ways a client normally goes away.
    fn is_disconnect(&self) -> bool {
        match self {
            ConnectionError::ClientDisconnected => true,
            ConnectionError::Io(e) => matches!(
                e.kind(),
                std::io::ErrorKind::ConnectionReset | std::io::ErrorKind::BrokenPipe
            ),
            _ => false,
        }
    }
}

/// Serves one client over any byte stream.
pub struct ConnectionHandler<S> {
    stream: BufWriter<S>,
    addr: SocketAddr,
    buffer: BytesMut,
    command_handler: CommandHandler,
    parser: RespParser,
    stats: Arc<ConnectionStats>,
}

impl<S> ConnectionHandler<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Creates a new connection handler.
    ///
    /// `addr` is only used to tag log lines.
    pub fn new(
        stream: S,
        addr: SocketAddr,
        command_handler: CommandHandler,
        stats: Arc<ConnectionStats>,
    ) -> Self {
        stats.connection_opened();

        Self {
            stream: BufWriter::new(stream),
            addr,
            buffer: BytesMut::with_capacity(INITIAL_BUFFER_SIZE),
            command_handler,
            parser: RespParser::new(),
            stats,
        }
    }

    /// Runs until the client disconnects or the connection fails.
    pub async fn run(mut self) -> Result<(), ConnectionError> {
        info!(client = %self.addr, "Client connected");

        let result = match self.main_loop().await {
            Err(ConnectionError::ClientDisconnected) => Ok(()),
            other => other,
        };

        match &result {
            Ok(()) => info!(client = %self.addr, "Client disconnected gracefully"),
            Err(e) if e.is_disconnect() => debug!(client = %self.addr, "Client disconnected"),
            Err(e) => warn!(client = %self.addr, error = %e, "Connection error"),
        }

        self.stats.connection_closed();
        result
    }

    async fn main_loop(&mut self) -> Result<(), ConnectionError> {
        loop {
            while let Some(command) = self.next_command()? {
                let reply = self.command_handler.execute(command);
                self.send_reply(&reply).await?;
            }

            self.read_more_data().await?;
        }
    }

    /// Cuts the next complete frame off the buffer, if there is one.
    fn next_command(&mut self) -> Result<Option<RespValue>, ConnectionError> {
        if self.buffer.is_empty() {
            return Ok(None);
        }

        match self.parser.parse(&self.buffer)? {
            Some((value, consumed)) => {
                self.buffer.advance(consumed);
                trace!(
                    client = %self.addr,
                    consumed,
                    remaining = self.buffer.len(),
                    "Parsed command"
                );
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }

    async fn read_more_data(&mut self) -> Result<(), ConnectionError> {
        let pending = self.parser.pending_len().unwrap_or(0);
        let limit = MAX_BUFFER_SIZE.max(pending);

        if self.buffer.len() >= limit {
            error!(
                client = %self.addr,
                size = self.buffer.len(),
                "Buffer size limit exceeded"
            );
            let reply = RespValue::error(format!(
                "ERR command too large (limit {} bytes)",
                MAX_BUFFER_SIZE
            ));
            self.send_reply(&reply).await?;
            return Err(ConnectionError::BufferFull);
        }

        if pending > self.buffer.len() {
            self.buffer.reserve(pending - self.buffer.len());
        } else if self.buffer.capacity() - self.buffer.len() < 1024 {
            self.buffer.reserve(INITIAL_BUFFER_SIZE);
        }

        let n = self.stream.get_mut().read_buf(&mut self.buffer).await?;

        if n == 0 {
            return Err(if self.buffer.is_empty() {
                ConnectionError::ClientDisconnected
            } else {
                ConnectionError::UnexpectedEof
            });
        }

        self.stats.record_read(n);
        trace!(client = %self.addr, bytes = n, "Read data");
        Ok(())
    }

    async fn send_reply(&mut self, reply: &RespValue) -> Result<(), ConnectionError> {
        let bytes = reply.serialize();
        self.stream.write_all(&bytes).await?;
        self.stream.flush().await?;
        self.stats.record_reply(bytes.len());
        trace!(client = %self.addr, bytes = bytes.len(), "Sent reply");
        Ok(())
    }
}

/// Serves a client to completion. How the connection ended is logged by
/// [`ConnectionHandler::run`].
pub async fn handle_connection<S>(
    stream: S,
    addr: SocketAddr,
    command_handler: CommandHandler,
    stats: Arc<ConnectionStats>,
) where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let handler = ConnectionHandler::new(stream, addr, command_handler, stats);
    let _ = handler.run().await;
}
