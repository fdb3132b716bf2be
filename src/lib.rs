//! tlsmail is a small mailer that delivers a plain-text email over an
//! authenticated SMTP session wrapped in implicit TLS (SMTPS, conventional
//! port 465).
//!
//! One call to [`Mailer::send`] is one complete SMTP transaction: the message
//! is validated, a TLS connection is opened, the client authenticates, the
//! envelope is issued and the MIME-encoded payload is streamed, then the
//! session is closed. There is no connection reuse, no retry policy and no
//! STARTTLS upgrade path.
//!
//! The connection and authentication settings live on the [`Mailer`] so that
//! the same configuration can send any number of independent messages; the
//! per-message content lives on [`Message`].
//!
//! #### Example
//!
//! ```rust,no_run
//! use tlsmail::{Mailer, Message};
//!
//! let message = Message::builder()
//!     .from("nobody@domain.tld")
//!     .to("hei@domain.tld")
//!     .subject("Happy new year")
//!     .body("Be happy!")
//!     .build();
//!
//! let mailer = Mailer::builder("smtp.domain.tld")
//!     .credentials(("nobody@domain.tld", "password"))
//!     .build();
//!
//! let result = mailer.send(&message);
//! assert!(result.is_ok());
//! ```

#![deny(missing_docs, unsafe_code, unstable_features)]

pub mod message;
pub mod smtp;

pub use crate::message::{Envelope, Message, MessageBuilder};
pub use crate::smtp::authentication::{Credentials, Mechanism};
pub use crate::smtp::error::Error;
pub use crate::smtp::{Mailer, MailerBuilder, SUBMISSIONS_PORT};
