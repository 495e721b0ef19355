//! TCP connection to the switch's event socket.
//!
//! Reads are line oriented with a bounded wait so the run loop can interleave
//! protocol traffic with polling the command store. Writes are whole commands
//! framed with [`COMMAND_TERMINATOR`](crate::codec::COMMAND_TERMINATOR).

use std::io::{self, BufRead, BufReader, BufWriter, ErrorKind, Read, Write};
use std::net::{Shutdown, SocketAddr, TcpStream, ToSocketAddrs};
use std::time::{Duration, Instant};

use tracing::debug;

use crate::codec::encode_command;
use crate::error::ConnectionError;

const CONNECTION_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::connection");

/// Smallest read timeout the socket accepts.
const MIN_READ_TIMEOUT: Duration = Duration::from_millis(1);
/// Upper bound on a single body read.
const BODY_READ_TIMEOUT: Duration = Duration::from_secs(30);
/// How long `close` waits for the switch to confirm the shutdown.
const CLOSE_WAIT: Duration = Duration::from_secs(2);

/// Result of waiting for the next line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadOutcome {
    /// A complete line, including its terminator.
    Line(String),
    /// The wait elapsed without a complete line.
    Idle,
    /// The peer closed the stream.
    Closed,
}

/// Sink for framed commands.
pub trait CommandWriter {
    /// Writes `command` followed by the frame terminator and flushes.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectionError::Io`] when the write fails.
    fn send_command(&mut self, command: &str) -> Result<(), ConnectionError>;
}

/// An open connection to the switch.
pub struct Connection {
    reader: BufReader<TcpStream>,
    writer: BufWriter<TcpStream>,
    pending: Vec<u8>,
    peer: SocketAddr,
    closed: bool,
}

impl Connection {
    /// Resolves `host` and connects to the first address that accepts.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectionError`] when resolution fails or no address
    /// accepts the connection within `connect_timeout`.
    pub fn connect(
        host: &str,
        port: u16,
        connect_timeout: Duration,
    ) -> Result<Self, ConnectionError> {
        let addrs: Vec<SocketAddr> = (host, port)
            .to_socket_addrs()
            .map_err(|source| ConnectionError::Resolve {
                host: host.to_owned(),
                port,
                source,
            })?
            .collect();

        let mut last_failure = None;
        for addr in addrs {
            match TcpStream::connect_timeout(&addr, connect_timeout) {
                Ok(stream) => return Self::from_stream(stream, addr),
                Err(source) => {
                    debug!(
                        target: CONNECTION_TARGET,
                        %addr,
                        error = %source,
                        "connect attempt failed"
                    );
                    last_failure = Some(ConnectionError::Connect { addr, source });
                }
            }
        }

        Err(last_failure.unwrap_or_else(|| ConnectionError::ResolveEmpty {
            host: host.to_owned(),
            port,
        }))
    }

    fn from_stream(stream: TcpStream, peer: SocketAddr) -> Result<Self, ConnectionError> {
        stream.set_nodelay(true)?;
        let write_half = stream.try_clone()?;
        debug!(target: CONNECTION_TARGET, %peer, "connected to switch");
        Ok(Self {
            reader: BufReader::new(stream),
            writer: BufWriter::new(write_half),
            pending: Vec::new(),
            peer,
            closed: false,
        })
    }

    /// Address of the switch.
    #[must_use]
    pub const fn peer(&self) -> SocketAddr {
        self.peer
    }

    /// Waits at most `timeout` for the next complete line.
    ///
    /// Bytes of a line that has not fully arrived are kept and completed by
    /// the next call.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectionError::Io`] on any read failure other than the
    /// timeout elapsing.
    pub fn read_line(&mut self, timeout: Duration) -> Result<ReadOutcome, ConnectionError> {
        self.reader
            .get_ref()
            .set_read_timeout(Some(timeout.max(MIN_READ_TIMEOUT)))?;

        match self.reader.read_until(b'\n', &mut self.pending) {
            Ok(0) if self.pending.is_empty() => Ok(ReadOutcome::Closed),
            // A trailing fragment without a terminator is handed out as-is;
            // the next call then observes the end of stream.
            Ok(_) => Ok(ReadOutcome::Line(self.take_pending())),
            Err(error) if is_timeout(&error) => Ok(ReadOutcome::Idle),
            Err(error) => Err(error.into()),
        }
    }

    /// Reads exactly `len` bytes of body text.
    ///
    /// The buffer grows with the bytes that arrive, so a declared length is
    /// never allocated up front.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectionError::Io`] if the stream ends or stalls before
    /// `len` bytes arrive.
    pub fn read_body(&mut self, len: usize) -> Result<String, ConnectionError> {
        self.reader
            .get_ref()
            .set_read_timeout(Some(BODY_READ_TIMEOUT))?;
        let limit = u64::try_from(len).unwrap_or(u64::MAX);
        let mut body = Vec::new();
        self.reader.by_ref().take(limit).read_to_end(&mut body)?;
        if body.len() < len {
            return Err(io::Error::new(
                ErrorKind::UnexpectedEof,
                format!("body ended after {} of {len} bytes", body.len()),
            )
            .into());
        }
        Ok(String::from_utf8_lossy(&body).into_owned())
    }

    /// Flushes, half-closes and waits briefly for the switch to hang up.
    ///
    /// Safe to call more than once. Failures are logged, never returned.
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;

        if let Err(error) = self.writer.flush() {
            debug!(target: CONNECTION_TARGET, %error, "flush before close failed");
        }
        if let Err(error) = self.writer.get_ref().shutdown(Shutdown::Write) {
            debug!(target: CONNECTION_TARGET, %error, "write shutdown failed");
        }
        if let Err(error) = self.await_peer_close() {
            debug!(target: CONNECTION_TARGET, %error, "peer did not confirm close");
        }
        if let Err(error) = self.reader.get_ref().shutdown(Shutdown::Both)
            && error.kind() != ErrorKind::NotConnected
        {
            debug!(target: CONNECTION_TARGET, %error, "socket release failed");
        }
        debug!(target: CONNECTION_TARGET, peer = %self.peer, "connection closed");
    }

    /// Returns `true` once [`close`](Self::close) has run.
    #[must_use]
    pub const fn is_closed(&self) -> bool {
        self.closed
    }

    fn await_peer_close(&mut self) -> io::Result<()> {
        let deadline = Instant::now() + CLOSE_WAIT;
        let mut discard = [0_u8; 512];
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(io::Error::new(ErrorKind::TimedOut, "close wait elapsed"));
            }
            self.reader
                .get_ref()
                .set_read_timeout(Some(remaining.max(MIN_READ_TIMEOUT)))?;
            match self.reader.read(&mut discard) {
                Ok(0) => return Ok(()),
                Ok(_) => {}
                Err(error) if error.kind() == ErrorKind::Interrupted => {}
                Err(error) => return Err(error),
            }
        }
    }

    fn take_pending(&mut self) -> String {
        let bytes = std::mem::take(&mut self.pending);
        String::from_utf8_lossy(&bytes).into_owned()
    }
}

impl CommandWriter for Connection {
    fn send_command(&mut self, command: &str) -> Result<(), ConnectionError> {
        self.writer.write_all(encode_command(command).as_bytes())?;
        self.writer.flush()?;
        Ok(())
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.close();
    }
}

fn is_timeout(error: &io::Error) -> bool {
    matches!(error.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut)
}
