//! Socket connection to the simulation server.
//!
//! [`connect`] establishes the byte stream and wraps it in a uniform
//! [`Connection`] so the framing layer stays transport agnostic.

use std::io::{self, Read, Write};
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::sync::Arc;
use std::time::Duration;

#[cfg(unix)]
use std::os::unix::net::UnixStream;

#[cfg(unix)]
use socket2::{Domain, SockAddr, Socket, Type};

use simlink_config::ServerEndpoint;
use tracing::debug;

use crate::error::ProtocolError;

/// Connected byte stream to the server.
#[derive(Debug)]
pub enum Connection {
    /// TCP stream.
    Tcp(TcpStream),
    /// Unix domain socket stream.
    #[cfg(unix)]
    Unix(UnixStream),
}

impl Connection {
    /// Sets the read deadline; `None` blocks indefinitely.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::Io`] when the socket rejects the timeout
    /// (for example a zero duration).
    pub fn set_read_timeout(&self, timeout: Option<Duration>) -> Result<(), ProtocolError> {
        match self {
            Self::Tcp(stream) => stream.set_read_timeout(timeout),
            #[cfg(unix)]
            Self::Unix(stream) => stream.set_read_timeout(timeout),
        }
        .map_err(ProtocolError::from_io)
    }

    /// Shuts down both halves of the stream.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::Io`] when the shutdown fails.
    pub fn shutdown(&self) -> Result<(), ProtocolError> {
        match self {
            Self::Tcp(stream) => stream.shutdown(std::net::Shutdown::Both),
            #[cfg(unix)]
            Self::Unix(stream) => stream.shutdown(std::net::Shutdown::Both),
        }
        .map_err(ProtocolError::from_io)
    }
}

impl Read for Connection {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            Self::Tcp(stream) => stream.read(buf),
            #[cfg(unix)]
            Self::Unix(stream) => stream.read(buf),
        }
    }
}

impl Write for Connection {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Self::Tcp(stream) => stream.write(buf),
            #[cfg(unix)]
            Self::Unix(stream) => stream.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Self::Tcp(stream) => stream.flush(),
            #[cfg(unix)]
            Self::Unix(stream) => stream.flush(),
        }
    }
}

/// Connects to the server endpoint within `timeout`.
///
/// # Errors
///
/// Returns [`ProtocolError::Resolve`] when a TCP host does not resolve and
/// [`ProtocolError::Connect`] when the connection attempt fails.
pub fn connect(endpoint: &ServerEndpoint, timeout: Duration) -> Result<Connection, ProtocolError> {
    debug!(target: "simlink::connection", %endpoint, "connecting");
    match endpoint {
        ServerEndpoint::Tcp { host, port } => {
            let address =
                resolve_tcp_address(host, *port).map_err(|source| ProtocolError::Resolve {
                    endpoint: endpoint.to_string(),
                    source: Arc::new(source),
                })?;

            let stream = TcpStream::connect_timeout(&address, timeout).map_err(|source| {
                ProtocolError::Connect {
                    endpoint: endpoint.to_string(),
                    source: Arc::new(source),
                }
            })?;
            // Frames are small and latency bound; do not let Nagle hold them.
            stream.set_nodelay(true).map_err(ProtocolError::from_io)?;
            Ok(Connection::Tcp(stream))
        }
        ServerEndpoint::Unix { path } => {
            #[cfg(unix)]
            {
                connect_unix(path.as_str(), timeout).map_err(|source| ProtocolError::Connect {
                    endpoint: endpoint.to_string(),
                    source: Arc::new(source),
                })
            }

            #[cfg(not(unix))]
            {
                let _ = path;
                Err(ProtocolError::UnsupportedTransport {
                    endpoint: endpoint.to_string(),
                })
            }
        }
    }
}

fn resolve_tcp_address(host: &str, port: u16) -> io::Result<SocketAddr> {
    (host, port)
        .to_socket_addrs()?
        .next()
        .ok_or_else(|| io::Error::new(io::ErrorKind::AddrNotAvailable, "no resolved addresses"))
}

#[cfg(unix)]
fn connect_unix(path: &str, timeout: Duration) -> io::Result<Connection> {
    let socket = Socket::new(Domain::UNIX, Type::STREAM, None)?;
    let address = SockAddr::unix(path)?;
    socket.connect_timeout(&address, timeout)?;
    let stream: UnixStream = socket.into();
    Ok(Connection::Unix(stream))
}
