//! SMTP client
//!
//! [`SmtpConnection`] drives the command/response cycle of one SMTP session
//! over an established [`NetworkStream`]. It is normally created through
//! [`SmtpConnection::connect`], which dials TLS, consumes the server banner
//! and performs the `EHLO` handshake in one step.

use std::{
    fmt::Display,
    io::{BufRead, BufReader, Write},
    net::{Shutdown, ToSocketAddrs},
    time::Duration,
};

use tracing::debug;

use crate::message::Envelope;
use crate::smtp::{
    authentication::{Credentials, Mechanism},
    client::net::{NetworkStream, TlsParameters},
    commands::{Auth, Data, Ehlo, Mail, Quit, Rcpt},
    error::Error,
    extension::{ClientId, ServerInfo},
    response::{parse_response, Response},
};

pub mod mock;
pub mod net;

/// The codec used for transparency
#[derive(Default, Clone, Copy, Debug)]
pub struct ClientCodec {
    escape_count: u8,
}

impl ClientCodec {
    /// Creates a new client codec
    pub fn new() -> Self {
        ClientCodec::default()
    }

    /// Adds transparency
    fn encode(&mut self, frame: &[u8], buf: &mut Vec<u8>) {
        let mut start = 0;
        for (idx, byte) in frame.iter().enumerate() {
            match self.escape_count {
                0 => self.escape_count = u8::from(*byte == b'\r'),
                1 => self.escape_count = if *byte == b'\n' { 2 } else { 0 },
                2 => self.escape_count = if *byte == b'.' { 3 } else { 0 },
                _ => unreachable!(),
            }
            if self.escape_count == 3 {
                self.escape_count = 0;
                buf.extend_from_slice(&frame[start..idx]);
                buf.extend_from_slice(b".");
                start = idx;
            }
        }
        buf.extend_from_slice(&frame[start..]);
    }
}

/// Returns the string replacing all the CRLF with "\<CRLF\>"
///
/// Used for debug displays
fn escape_crlf(string: &str) -> String {
    string.replace("\r\n", "<CRLF>")
}

macro_rules! try_smtp (
    ($err: expr, $client: ident) => ({
        match $err {
            Ok(val) => val,
            Err(err) => {
                $client.abort();
                return Err(From::from(err));
            },
        }
    })
);

/// Structure that implements the SMTP client
pub struct SmtpConnection {
    /// TCP stream between client and server
    stream: BufReader<NetworkStream>,
    /// Panic state
    panic: bool,
    /// Information about the server
    server_info: ServerInfo,
}

impl SmtpConnection {
    /// Information about the server, as advertised in its EHLO response
    pub fn server_info(&self) -> &ServerInfo {
        &self.server_info
    }

    /// Creates a client over an already-established stream
    ///
    /// The server banner is not consumed and no handshake is performed;
    /// callers normally use [`SmtpConnection::connect`] instead.
    pub fn new(stream: NetworkStream) -> SmtpConnection {
        SmtpConnection {
            stream: BufReader::new(stream),
            panic: false,
            server_info: ServerInfo::default(),
        }
    }

    /// Connects to the given server over implicit TLS
    ///
    /// Consumes the banner, then sends EHLO and parses server information.
    pub fn connect<A: ToSocketAddrs>(
        server: A,
        timeout: Option<Duration>,
        hello_name: &ClientId,
        tls_parameters: &TlsParameters,
    ) -> Result<SmtpConnection, Error> {
        let stream = NetworkStream::connect(server, timeout, tls_parameters)?;
        let mut conn = SmtpConnection::new(stream);
        conn.set_timeout(timeout)?;
        let _banner = try_smtp!(conn.read_response(), conn);

        conn.ehlo(hello_name)?;

        debug!("server {}", conn.server_info);
        Ok(conn)
    }

    /// Sends the envelope and message content of one mail transaction
    ///
    /// Issues `MAIL FROM`, one `RCPT TO` per envelope recipient in order,
    /// then `DATA` followed by the payload. The first negative reply aborts
    /// the session: remaining recipients are not attempted and the data
    /// stage is never entered.
    pub fn send(&mut self, envelope: &Envelope, email: &[u8]) -> Result<Response, Error> {
        try_smtp!(self.command(Mail::new(envelope.from())), self);

        for to_address in envelope.to() {
            try_smtp!(self.command(Rcpt::new(to_address.as_str())), self);
        }

        try_smtp!(self.command(Data), self);

        let result = try_smtp!(self.message(email), self);
        Ok(result)
    }

    /// Sends EHLO and updates the server information
    pub fn ehlo(&mut self, hello_name: &ClientId) -> Result<(), Error> {
        let ehlo_response = try_smtp!(self.command(Ehlo::new(hello_name.clone())), self);
        self.server_info = try_smtp!(ServerInfo::from_response(&ehlo_response), self);
        Ok(())
    }

    /// Closes the SMTP transaction
    pub fn quit(&mut self) -> Result<Response, Error> {
        self.panic = true;
        self.command(Quit)
    }

    /// Releases the connection, sending QUIT as a best effort
    ///
    /// Called on every failure path; the outcome of the QUIT itself is
    /// ignored so that it never masks the error that got us here.
    pub fn abort(&mut self) {
        // Only try to quit if we are not already broken
        if !self.panic {
            self.panic = true;
            let _ = self.command(Quit);
        }
        let _ = self.stream.get_ref().shutdown(Shutdown::Both);
    }

    /// Set timeout for subsequent reads and writes
    pub fn set_timeout(&mut self, duration: Option<Duration>) -> Result<(), Error> {
        self.stream.get_mut().set_read_timeout(duration)?;
        self.stream.get_mut().set_write_timeout(duration)?;
        Ok(())
    }

    /// Sends an AUTH command with the given mechanism, and handles the challenge if needed
    ///
    /// The mechanism used is the first in `mechanisms` that the server
    /// advertised in its EHLO response.
    pub fn auth(
        &mut self,
        mechanisms: &[Mechanism],
        credentials: &Credentials,
    ) -> Result<Response, Error> {
        let mechanism = match self.server_info.get_auth_mechanism(mechanisms) {
            Some(mechanism) => mechanism,
            None => {
                self.abort();
                return Err(Error::Client(
                    "No compatible authentication mechanism was found",
                ));
            }
        };

        // Limit challenges to avoid blocking
        let mut challenges = 10;
        let mut response =
            try_smtp!(self.command(Auth::new(mechanism, credentials.clone(), None)?), self);

        while challenges > 0 && response.has_code(334) {
            challenges -= 1;
            response = try_smtp!(
                self.command(Auth::new_from_response(
                    mechanism,
                    credentials.clone(),
                    &response,
                )?),
                self
            );
        }

        if challenges == 0 {
            Err(Error::ResponseParsing("Unexpected number of challenges"))
        } else {
            Ok(response)
        }
    }

    /// Sends the message content and the end-of-message marker
    pub fn message(&mut self, message: &[u8]) -> Result<Response, Error> {
        let mut out_buf = Vec::with_capacity(message.len());
        let mut codec = ClientCodec::new();
        codec.encode(message, &mut out_buf);
        self.write(out_buf.as_slice())?;
        self.write(b"\r\n.\r\n")?;
        self.read_response()
    }

    /// Sends an SMTP command
    pub fn command<C: Display>(&mut self, command: C) -> Result<Response, Error> {
        self.write(command.to_string().as_bytes())?;
        self.read_response()
    }

    /// Writes a string to the server
    fn write(&mut self, string: &[u8]) -> Result<(), Error> {
        self.stream.get_mut().write_all(string)?;
        self.stream.get_mut().flush()?;

        debug!(
            "Wrote: {}",
            escape_crlf(String::from_utf8_lossy(string).as_ref())
        );
        Ok(())
    }

    /// Gets the SMTP response
    pub fn read_response(&mut self) -> Result<Response, Error> {
        let mut buffer = String::with_capacity(100);

        while self.stream.read_line(&mut buffer)? > 0 {
            debug!("<< {}", escape_crlf(&buffer));
            match parse_response(&buffer) {
                Ok((_remaining, response)) => {
                    if response.is_positive() {
                        return Ok(response);
                    }

                    return Err(response.into());
                }
                Err(nom::Err::Incomplete(_)) => { /* read more */ }
                Err(nom::Err::Failure(_)) | Err(nom::Err::Error(_)) => {
                    return Err(Error::ResponseParsing("invalid server reply"));
                }
            }
        }

        Err(Error::ResponseParsing("incomplete response"))
    }
}

#[cfg(test)]
mod test {
    use super::{escape_crlf, ClientCodec};

    #[test]
    fn test_codec() {
        let mut codec = ClientCodec::new();
        let mut buf: Vec<u8> = vec![];

        codec.encode(b"test\r\n", &mut buf);
        codec.encode(b".\r\n", &mut buf);
        codec.encode(b"\r\ntest", &mut buf);
        codec.encode(b"te\r\n.\r\nst", &mut buf);
        codec.encode(b"test", &mut buf);
        codec.encode(b"test.", &mut buf);
        codec.encode(b"test\n", &mut buf);
        codec.encode(b".test\n", &mut buf);
        codec.encode(b"test", &mut buf);
        assert_eq!(
            String::from_utf8(buf).unwrap(),
            "test\r\n..\r\n\r\ntestte\r\n..\r\nsttesttest.test\n.test\ntest"
        );
    }

    #[test]
    fn test_escape_crlf() {
        assert_eq!(escape_crlf("\r\n"), "<CRLF>");
        assert_eq!(escape_crlf("EHLO my_name\r\n"), "EHLO my_name<CRLF>");
        assert_eq!(
            escape_crlf("EHLO my_name\r\nSIZE 42\r\n"),
            "EHLO my_name<CRLF>SIZE 42<CRLF>"
        );
    }
}
