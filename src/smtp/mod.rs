//! The SMTP session layer
//!
//! [`Mailer`] holds the connection and authentication configuration and
//! drives one complete transaction per [`Mailer::send`] call: validate,
//! dial implicit TLS, `EHLO`, `AUTH`, `MAIL FROM`, `RCPT TO` for every
//! recipient, `DATA` with the formatted message, `QUIT`.
//!
//! The connection is encrypted from the first byte (SMTPS); there is no
//! STARTTLS upgrade path. Certificate verification binds the server
//! certificate to the configured server name and can only be turned off
//! through the explicit
//! [`danger_accept_invalid_certs`][MailerBuilder::danger_accept_invalid_certs]
//! opt-in.
//!
//! #### Example
//!
//! ```rust,no_run
//! use std::time::Duration;
//!
//! use tlsmail::smtp::Mailer;
//! use tlsmail::message::Message;
//!
//! let message = Message::builder()
//!     .from("nobody@domain.tld")
//!     .to("hei@domain.tld")
//!     .cc("archive@domain.tld")
//!     .subject("Срочно")
//!     .body("Be happy!")
//!     .build();
//!
//! let mailer = Mailer::builder("smtp.domain.tld")
//!     .credentials(("nobody@domain.tld", "password"))
//!     .timeout(Some(Duration::from_secs(10)))
//!     .build();
//!
//! mailer.send(&message).unwrap();
//! ```
//!
//! #### Lower level
//!
//! The transaction can also be driven by hand:
//!
//! ```rust,no_run
//! use tlsmail::smtp::client::net::TlsParameters;
//! use tlsmail::smtp::client::SmtpConnection;
//! use tlsmail::smtp::commands::{Data, Mail, Quit, Rcpt};
//! use tlsmail::smtp::extension::ClientId;
//!
//! let tls = TlsParameters::new("smtp.domain.tld".to_owned());
//! let hello = ClientId::Domain("smtp.domain.tld".to_owned());
//! let mut client =
//!     SmtpConnection::connect(("smtp.domain.tld", 465), None, &hello, &tls).unwrap();
//! client.command(Mail::new("user@example.com")).unwrap();
//! client.command(Rcpt::new("user@example.org")).unwrap();
//! client.command(Data).unwrap();
//! client.message(b"Test email").unwrap();
//! client.command(Quit).unwrap();
//! ```

use std::time::Duration;

use tracing::{info, warn};

use crate::message::Message;
use crate::smtp::{
    authentication::{Credentials, Mechanism, DEFAULT_MECHANISMS},
    client::net::TlsParameters,
    client::SmtpConnection,
    error::Error,
    extension::ClientId,
    response::Response,
};

pub mod authentication;
pub mod client;
pub mod commands;
pub mod error;
pub mod extension;
pub mod response;

// Registered port numbers:
// https://www.iana.org/assignments/service-names-port-numbers/service-names-port-numbers.xhtml

/// Default submission over TLS port
///
/// <https://tools.ietf.org/html/rfc8314>
pub const SUBMISSIONS_PORT: u16 = 465;

/// Default timeout for each network operation
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Clone, Debug)]
struct MailerInfo {
    /// Server we are connecting to, also the expected TLS server name
    server: String,
    /// Port to connect to
    port: u16,
    /// Name sent during EHLO
    hello_name: ClientId,
    /// Credentials
    credentials: Option<Credentials>,
    /// Accepted authentication mechanisms
    authentication: Vec<Mechanism>,
    /// Define network timeout
    timeout: Option<Duration>,
    /// Skip server certificate verification
    accept_invalid_certs: bool,
}

/// Sends messages over authenticated implicit-TLS SMTP
///
/// Holds the reusable connection and authentication configuration; the
/// per-message content is a [`Message`]. A `Mailer` has no mutable state,
/// so independent sends may run concurrently from separate threads, each
/// owning its own connection.
#[derive(Clone, Debug)]
pub struct Mailer {
    info: MailerInfo,
}

/// Contains client configuration
#[derive(Clone, Debug)]
pub struct MailerBuilder {
    info: MailerInfo,
}

impl Mailer {
    /// Creates a new mailer for the given server
    ///
    /// Defaults are:
    ///
    /// * Port 465 (implicit TLS)
    /// * A 60 seconds timeout for each network operation
    /// * EHLO name set to the server name
    /// * Full certificate verification
    pub fn builder<T: Into<String>>(server: T) -> MailerBuilder {
        let server = server.into();
        MailerBuilder {
            info: MailerInfo {
                hello_name: ClientId::Domain(server.clone()),
                server,
                port: SUBMISSIONS_PORT,
                credentials: None,
                authentication: DEFAULT_MECHANISMS.into(),
                timeout: Some(DEFAULT_TIMEOUT),
                accept_invalid_certs: false,
            },
        }
    }

    /// Sends a message, as one complete SMTP transaction
    ///
    /// Exactly one terminal error is returned per call; there is no partial
    /// success. Any recipient rejection aborts the send before the data
    /// stage. The session is released on every exit path: `QUIT` is issued
    /// as a best effort and its own failure never masks an earlier, more
    /// specific error.
    pub fn send(&self, message: &Message) -> Result<Response, Error> {
        self.check()?;
        message.check()?;

        let mut conn = self.connection()?;

        let envelope = message.envelope();
        let result = conn.send(&envelope, &message.formatted())?;

        info!(
            "from=<{}>, nrcpt={}, status=sent ({})",
            envelope.from(),
            envelope.to().len(),
            result.first_line().unwrap_or("no response")
        );

        if let Err(err) = conn.quit() {
            warn!("failed to close the session cleanly: {}", err);
        }

        Ok(result)
    }

    /// Checks the mandatory connection and authentication fields
    fn check(&self) -> Result<(), Error> {
        if self.info.server.is_empty() {
            return Err(Error::Validation("server"));
        }
        match &self.info.credentials {
            None => Err(Error::Validation("credentials")),
            Some(credentials) if credentials.username().is_empty() => {
                Err(Error::Validation("username"))
            }
            Some(credentials) if credentials.password().is_empty() => {
                Err(Error::Validation("password"))
            }
            Some(_) => Ok(()),
        }
    }

    /// Opens an authenticated connection to the configured server
    fn connection(&self) -> Result<SmtpConnection, Error> {
        let tls_parameters = TlsParameters::new(self.info.server.clone())
            .danger_accept_invalid_certs(self.info.accept_invalid_certs);

        let mut conn = SmtpConnection::connect(
            (self.info.server.as_str(), self.info.port),
            self.info.timeout,
            &self.info.hello_name,
            &tls_parameters,
        )?;

        // Credentials are mandatory, `check` ran before connecting
        if let Some(credentials) = &self.info.credentials {
            conn.auth(&self.info.authentication, credentials)?;
        }

        Ok(conn)
    }
}

/// Builder for the SMTP `Mailer`
impl MailerBuilder {
    /// Set the name used during EHLO
    pub fn hello_name(mut self, name: ClientId) -> Self {
        self.info.hello_name = name;
        self
    }

    /// Set the credentials used for authentication
    pub fn credentials<C: Into<Credentials>>(mut self, credentials: C) -> Self {
        self.info.credentials = Some(credentials.into());
        self
    }

    /// Set the accepted authentication mechanisms
    pub fn authentication(mut self, mechanisms: Vec<Mechanism>) -> Self {
        self.info.authentication = mechanisms;
        self
    }

    /// Set the timeout duration
    ///
    /// `None` waits indefinitely on every network operation.
    pub fn timeout(mut self, timeout: Option<Duration>) -> Self {
        self.info.timeout = timeout;
        self
    }

    /// Set the port to use
    pub fn port(mut self, port: u16) -> Self {
        self.info.port = port;
        self
    }

    /// Skip verification of the server certificate
    ///
    /// Defaults to `false`.
    ///
    /// # Warning
    ///
    /// Enabling this makes the connection vulnerable to man-in-the-middle
    /// attacks; it is only meant for servers with self-signed certificates
    /// that cannot be trusted in a better way.
    pub fn danger_accept_invalid_certs(mut self, accept_invalid_certs: bool) -> Self {
        self.info.accept_invalid_certs = accept_invalid_certs;
        self
    }

    /// Build the mailer
    pub fn build(self) -> Mailer {
        Mailer { info: self.info }
    }
}

#[cfg(test)]
mod test {
    use super::Mailer;
    use crate::message::Message;
    use crate::smtp::error::Error;

    fn valid_message() -> Message {
        Message::builder()
            .from("a@x.com")
            .to("r@y.com")
            .subject("Hi")
            .body("Hello")
            .build()
    }

    #[test]
    fn send_rejects_missing_credentials_before_connecting() {
        let mailer = Mailer::builder("smtp.example.com").build();
        let err = mailer.send(&valid_message()).unwrap_err();
        assert!(matches!(err, Error::Validation("credentials")));
    }

    #[test]
    fn send_rejects_empty_credential_fields_before_connecting() {
        let mailer = Mailer::builder("smtp.example.com")
            .credentials(("", "secret"))
            .build();
        assert!(matches!(
            mailer.send(&valid_message()).unwrap_err(),
            Error::Validation("username")
        ));

        let mailer = Mailer::builder("smtp.example.com")
            .credentials(("a@x.com", ""))
            .build();
        assert!(matches!(
            mailer.send(&valid_message()).unwrap_err(),
            Error::Validation("password")
        ));
    }

    #[test]
    fn send_rejects_empty_server_before_connecting() {
        let mailer = Mailer::builder("")
            .credentials(("a@x.com", "secret"))
            .build();
        assert!(matches!(
            mailer.send(&valid_message()).unwrap_err(),
            Error::Validation("server")
        ));
    }

    #[test]
    fn send_rejects_incomplete_message_before_connecting() {
        let mailer = Mailer::builder("smtp.example.com")
            .credentials(("a@x.com", "secret"))
            .build();

        let message = Message::builder()
            .from("a@x.com")
            .to("r@y.com")
            .subject("Hi")
            .build();
        assert!(matches!(
            mailer.send(&message).unwrap_err(),
            Error::Validation("body")
        ));
    }
}
