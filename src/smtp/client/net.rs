//! The underlying network stream and its TLS configuration

use std::io::{self, Read, Write};
use std::net::{Shutdown, SocketAddr, TcpStream, ToSocketAddrs};
use std::time::Duration;

use native_tls::{HandshakeError, Protocol, TlsConnector, TlsStream};
use tracing::{debug, warn};

use crate::smtp::client::mock::MockStream;
use crate::smtp::error::Error;

/// Accepted protocols by default
///
/// This removes TLS 1.0 and 1.1 compared to native-tls defaults.
const DEFAULT_TLS_MIN_PROTOCOL: Protocol = Protocol::Tlsv12;

/// Parameters to use for secure clients
#[derive(Clone, Debug)]
pub struct TlsParameters {
    /// The domain name which is expected in the TLS certificate from the server
    domain: String,
    /// Whether to skip verification of the server certificate chain
    accept_invalid_certs: bool,
}

impl TlsParameters {
    /// Creates parameters binding the server certificate to `domain`
    pub fn new(domain: String) -> TlsParameters {
        TlsParameters {
            domain,
            accept_invalid_certs: false,
        }
    }

    /// Controls whether certificates failing verification are accepted
    ///
    /// Defaults to `false`.
    ///
    /// # Warning
    ///
    /// You should think very carefully before using this method. If
    /// certificate verification is disabled, *any* certificate is trusted,
    /// which makes the connection vulnerable to man-in-the-middle attacks.
    pub fn danger_accept_invalid_certs(mut self, accept_invalid_certs: bool) -> TlsParameters {
        self.accept_invalid_certs = accept_invalid_certs;
        self
    }

    /// The domain the server certificate is checked against
    pub fn domain(&self) -> &str {
        &self.domain
    }

    fn connector(&self) -> Result<TlsConnector, Error> {
        let mut builder = TlsConnector::builder();
        builder.min_protocol_version(Some(DEFAULT_TLS_MIN_PROTOCOL));
        if self.accept_invalid_certs {
            warn!("server certificate verification is disabled");
            builder.danger_accept_invalid_certs(true);
        }
        Ok(builder.build()?)
    }
}

/// Represents the different types of underlying network streams
#[allow(missing_debug_implementations)]
pub enum NetworkStream {
    /// Encrypted TCP stream
    Tls(TlsStream<TcpStream>),
    /// Mock stream, for tests
    Mock(MockStream),
}

impl NetworkStream {
    /// Opens a TLS connection to the given server
    ///
    /// Every address the server name resolves to is tried in order. The TCP
    /// dial and the TLS handshake are both bounded by `timeout` when one is
    /// given.
    pub fn connect<T: ToSocketAddrs>(
        server: T,
        timeout: Option<Duration>,
        tls_parameters: &TlsParameters,
    ) -> Result<NetworkStream, Error> {
        fn tcp_connect(addr: &SocketAddr, timeout: Option<Duration>) -> io::Result<TcpStream> {
            match timeout {
                Some(duration) => TcpStream::connect_timeout(addr, duration),
                None => TcpStream::connect(addr),
            }
        }

        let mut last_err = None;

        for addr in server.to_socket_addrs()? {
            match tcp_connect(&addr, timeout) {
                Ok(tcp_stream) => {
                    debug!("connecting to {}", addr);
                    // Bound the handshake reads as well
                    tcp_stream.set_read_timeout(timeout)?;
                    tcp_stream.set_write_timeout(timeout)?;
                    let connector = tls_parameters.connector()?;
                    return match connector.connect(tls_parameters.domain(), tcp_stream) {
                        Ok(tls_stream) => Ok(NetworkStream::Tls(tls_stream)),
                        Err(HandshakeError::Failure(err)) => Err(Error::Tls(err)),
                        Err(HandshakeError::WouldBlock(_)) => {
                            Err(Error::Client("TLS handshake interrupted"))
                        }
                    };
                }
                Err(err) => last_err = Some(err),
            }
        }

        Err(match last_err {
            Some(err) => Error::Io(err),
            None => Error::Resolution,
        })
    }

    /// Shuts down both directions of the underlying socket
    pub fn shutdown(&self, how: Shutdown) -> io::Result<()> {
        match *self {
            NetworkStream::Tls(ref stream) => stream.get_ref().shutdown(how),
            NetworkStream::Mock(_) => Ok(()),
        }
    }

    /// Set read timeout for IO calls
    pub fn set_read_timeout(&mut self, duration: Option<Duration>) -> io::Result<()> {
        match *self {
            NetworkStream::Tls(ref stream) => stream.get_ref().set_read_timeout(duration),
            NetworkStream::Mock(_) => Ok(()),
        }
    }

    /// Set write timeout for IO calls
    pub fn set_write_timeout(&mut self, duration: Option<Duration>) -> io::Result<()> {
        match *self {
            NetworkStream::Tls(ref stream) => stream.get_ref().set_write_timeout(duration),
            NetworkStream::Mock(_) => Ok(()),
        }
    }
}

impl Read for NetworkStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match *self {
            NetworkStream::Tls(ref mut stream) => stream.read(buf),
            NetworkStream::Mock(ref mut stream) => stream.read(buf),
        }
    }
}

impl Write for NetworkStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match *self {
            NetworkStream::Tls(ref mut stream) => stream.write(buf),
            NetworkStream::Mock(ref mut stream) => stream.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match *self {
            NetworkStream::Tls(ref mut stream) => stream.flush(),
            NetworkStream::Mock(ref mut stream) => stream.flush(),
        }
    }
}
