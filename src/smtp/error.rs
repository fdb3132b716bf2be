//! Error and result type for SMTP clients

use std::{error::Error as StdError, fmt, io, string::FromUtf8Error};

use base64::DecodeError;

use crate::smtp::response::{Response, Severity};

/// The errors that may occur when sending an email
///
/// Every failure of a send surfaces as exactly one of these values:
/// `Validation` before any network activity, `Resolution`/`Io`/`Tls` while
/// establishing the connection, `Transient`/`Permanent` for negative server
/// replies, and the parsing variants for replies the client could not make
/// sense of.
#[derive(Debug)]
pub enum Error {
    /// A mandatory field of the mailer or message is missing or empty
    ///
    /// Carries the name of the offending field. Reported before any network
    /// activity takes place.
    Validation(&'static str),
    /// Transient SMTP error, 4xx reply code
    ///
    /// [RFC 5321, section 4.2.1](https://tools.ietf.org/html/rfc5321#section-4.2.1)
    Transient(Response),
    /// Permanent SMTP error, 5xx reply code
    ///
    /// [RFC 5321, section 4.2.1](https://tools.ietf.org/html/rfc5321#section-4.2.1)
    Permanent(Response),
    /// Error parsing a response
    ResponseParsing(&'static str),
    /// Error parsing a base64 string in a response
    ChallengeParsing(DecodeError),
    /// Error parsing UTF-8 in a response
    Utf8Parsing(FromUtf8Error),
    /// Internal client error
    Client(&'static str),
    /// DNS resolution error
    Resolution,
    /// IO error
    Io(io::Error),
    /// TLS error
    Tls(native_tls::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            // Display the first line of the server's response when there is
            // one, it usually contains a short human readable explanation
            Error::Transient(response) => match response.first_line() {
                Some(line) => write!(f, "transient error: {line}"),
                None => f.write_str("undetailed transient error during SMTP transaction"),
            },
            Error::Permanent(response) => match response.first_line() {
                Some(line) => write!(f, "permanent error: {line}"),
                None => f.write_str("undetailed permanent error during SMTP transaction"),
            },
            Error::Validation(field) => {
                write!(f, "missing or empty mandatory field `{field}`")
            }
            Error::ResponseParsing(err) => f.write_str(err),
            Error::ChallengeParsing(err) => write!(f, "{err}"),
            Error::Utf8Parsing(err) => write!(f, "{err}"),
            Error::Resolution => f.write_str("could not resolve hostname"),
            Error::Client(err) => f.write_str(err),
            Error::Io(err) => write!(f, "{err}"),
            Error::Tls(err) => write!(f, "{err}"),
        }
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            Error::ChallengeParsing(err) => Some(err),
            Error::Utf8Parsing(err) => Some(err),
            Error::Io(err) => Some(err),
            Error::Tls(err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Error {
        Error::Io(err)
    }
}

impl From<native_tls::Error> for Error {
    fn from(err: native_tls::Error) -> Error {
        Error::Tls(err)
    }
}

impl From<DecodeError> for Error {
    fn from(err: DecodeError) -> Error {
        Error::ChallengeParsing(err)
    }
}

impl From<FromUtf8Error> for Error {
    fn from(err: FromUtf8Error) -> Error {
        Error::Utf8Parsing(err)
    }
}

impl From<Response> for Error {
    fn from(response: Response) -> Error {
        match response.code().severity {
            Severity::TransientNegativeCompletion => Error::Transient(response),
            Severity::PermanentNegativeCompletion => Error::Permanent(response),
            _ => Error::Client("Unknown error code"),
        }
    }
}
