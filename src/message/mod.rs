//! Message content and its wire representation
//!
//! A [`Message`] carries the per-message values of one send: originator,
//! recipients, subject and body. It is pure data; all network concerns live
//! in the [`smtp`][crate::smtp] module. [`Message::formatted`] produces the
//! exact bytes streamed during the SMTP `DATA` stage, and
//! [`Message::envelope`] the addresses used for `MAIL FROM`/`RCPT TO`.

use base64::{engine::general_purpose::STANDARD as BASE64_STANDARD, Engine as _};

use crate::smtp::error::Error;

pub mod utf8_b;

/// Envelope addresses of a message
///
/// The reverse-path and forward-paths given to the server during the SMTP
/// transaction. These control actual delivery, as opposed to the `From`,
/// `To` and `CC` headers which are display-only.
#[derive(PartialEq, Eq, Clone, Debug)]
pub struct Envelope {
    /// The envelope sender (reverse-path)
    from: String,
    /// The envelope recipients (forward-paths), in submission order
    to: Vec<String>,
}

impl Envelope {
    /// The envelope sender address
    pub fn from(&self) -> &str {
        &self.from
    }

    /// The envelope recipient addresses
    pub fn to(&self) -> &[String] {
        &self.to
    }
}

/// Content of one outbound email
///
/// Build it with [`Message::builder`]. Mandatory fields are only checked
/// when the message is handed to [`Mailer::send`][crate::Mailer::send], so
/// an incomplete message can be constructed but never sent.
#[derive(PartialEq, Eq, Clone, Debug)]
pub struct Message {
    from: String,
    to: Vec<String>,
    cc: Vec<String>,
    subject: String,
    body: String,
}

/// Builder for [`Message`]
#[derive(Clone, Debug, Default)]
pub struct MessageBuilder {
    from: String,
    to: Vec<String>,
    cc: Vec<String>,
    subject: String,
    body: String,
}

impl MessageBuilder {
    /// Set the originator address, used as envelope sender and `From` header
    pub fn from<S: Into<String>>(mut self, from: S) -> Self {
        self.from = from.into();
        self
    }

    /// Add a primary recipient
    pub fn to<S: Into<String>>(mut self, to: S) -> Self {
        self.to.push(to.into());
        self
    }

    /// Add a carbon-copy recipient
    pub fn cc<S: Into<String>>(mut self, cc: S) -> Self {
        self.cc.push(cc.into());
        self
    }

    /// Set the subject, as plain UTF-8 text
    pub fn subject<S: Into<String>>(mut self, subject: S) -> Self {
        self.subject = subject.into();
        self
    }

    /// Set the body, as plain UTF-8 text
    pub fn body<S: Into<String>>(mut self, body: S) -> Self {
        self.body = body.into();
        self
    }

    /// Assemble the message
    pub fn build(self) -> Message {
        Message {
            from: self.from,
            to: self.to,
            cc: self.cc,
            subject: self.subject,
            body: self.body,
        }
    }
}

impl Message {
    /// Creates a builder for a new message
    pub fn builder() -> MessageBuilder {
        MessageBuilder::default()
    }

    /// Checks that all mandatory fields are set
    ///
    /// Returns an [`Error::Validation`] naming the first offending field.
    pub fn check(&self) -> Result<(), Error> {
        if self.from.is_empty() {
            return Err(Error::Validation("from"));
        }
        if self.to.is_empty() {
            return Err(Error::Validation("to"));
        }
        if self.to.iter().any(String::is_empty) {
            return Err(Error::Validation("to"));
        }
        if self.subject.is_empty() {
            return Err(Error::Validation("subject"));
        }
        if self.body.is_empty() {
            return Err(Error::Validation("body"));
        }
        Ok(())
    }

    /// The envelope used for the SMTP transaction
    ///
    /// Recipients are the `to` addresses followed by the `cc` addresses, in
    /// the order they were added. No de-duplication is performed.
    pub fn envelope(&self) -> Envelope {
        Envelope {
            from: self.from.clone(),
            to: self.to.iter().chain(self.cc.iter()).cloned().collect(),
        }
    }

    /// The bytes transmitted during the `DATA` stage
    ///
    /// Headers are emitted in a fixed order, the `CC` header only when there
    /// is at least one carbon-copy recipient. The subject is encoded per
    /// RFC 2047 when it is not printable ASCII, and the body as standard
    /// base64 of its UTF-8 bytes.
    pub fn formatted(&self) -> Vec<u8> {
        let mut headers = vec![
            ("From", self.from.clone()),
            ("To", self.to.join(";")),
        ];
        if !self.cc.is_empty() {
            headers.push(("CC", self.cc.join(";")));
        }
        headers.push(("Subject", utf8_b::encode(&self.subject)));
        headers.push(("MIME-Version", "1.0".into()));
        headers.push(("Content-Type", "text/plain; charset=\"utf-8\"".into()));
        headers.push(("Content-Transfer-Encoding", "base64".into()));

        let mut out = String::new();
        for (name, value) in headers {
            out.push_str(name);
            out.push_str(": ");
            out.push_str(&value);
            out.push_str("\r\n");
        }
        out.push_str("\r\n");
        out.push_str(&BASE64_STANDARD.encode(self.body.as_bytes()));
        out.into_bytes()
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::{utf8_b, Message};
    use crate::smtp::error::Error;

    fn complete() -> Message {
        Message::builder()
            .from("a@x.com")
            .to("r@y.com")
            .subject("Hi")
            .body("Hello")
            .build()
    }

    #[test]
    fn formatted_without_cc() {
        assert_eq!(
            String::from_utf8(complete().formatted()).unwrap(),
            "From: a@x.com\r\n\
             To: r@y.com\r\n\
             Subject: Hi\r\n\
             MIME-Version: 1.0\r\n\
             Content-Type: text/plain; charset=\"utf-8\"\r\n\
             Content-Transfer-Encoding: base64\r\n\
             \r\n\
             SGVsbG8="
        );
    }

    #[test]
    fn formatted_with_cc_keeps_recipient_order() {
        let message = Message::builder()
            .from("a@x.com")
            .to("first@y.com")
            .to("second@y.com")
            .cc("third@z.com")
            .cc("fourth@z.com")
            .subject("Hi")
            .body("Hello")
            .build();

        let formatted = String::from_utf8(message.formatted()).unwrap();
        assert!(formatted.contains("To: first@y.com;second@y.com\r\n"));
        assert!(formatted.contains("CC: third@z.com;fourth@z.com\r\n"));

        let envelope = message.envelope();
        assert_eq!(
            envelope.to(),
            [
                "first@y.com".to_owned(),
                "second@y.com".to_owned(),
                "third@z.com".to_owned(),
                "fourth@z.com".to_owned(),
            ]
        );
    }

    #[test]
    fn formatted_encodes_utf8_subject() {
        let message = Message::builder()
            .from("a@x.com")
            .to("r@y.com")
            .subject("тема")
            .body("Hello")
            .build();

        let formatted = String::from_utf8(message.formatted()).unwrap();
        let subject_line = formatted
            .lines()
            .find(|line| line.starts_with("Subject: "))
            .unwrap();
        let value = &subject_line["Subject: ".len()..];
        assert!(value.is_ascii());
        assert_eq!(utf8_b::decode(value), Some("тема".into()));
    }

    #[test]
    fn body_round_trips_through_base64() {
        use base64::{engine::general_purpose::STANDARD, Engine as _};

        let message = Message::builder()
            .from("a@x.com")
            .to("r@y.com")
            .subject("Hi")
            .body("Hello ß☺ example")
            .build();

        let formatted = String::from_utf8(message.formatted()).unwrap();
        let body = formatted.split("\r\n\r\n").nth(1).unwrap();
        assert_eq!(
            String::from_utf8(STANDARD.decode(body).unwrap()).unwrap(),
            "Hello ß☺ example"
        );
    }

    #[test]
    fn check_reports_first_missing_field() {
        let checks = [
            (Message::builder().build(), "from"),
            (Message::builder().from("a@x.com").build(), "to"),
            (
                Message::builder().from("a@x.com").to("r@y.com").build(),
                "subject",
            ),
            (
                Message::builder()
                    .from("a@x.com")
                    .to("r@y.com")
                    .subject("Hi")
                    .build(),
                "body",
            ),
        ];

        for (message, field) in checks {
            match message.check() {
                Err(Error::Validation(name)) => assert_eq!(name, field),
                other => panic!("expected validation error for {field}, got {other:?}"),
            }
        }

        assert!(complete().check().is_ok());
    }

    #[test]
    fn check_rejects_empty_recipient() {
        let message = Message::builder()
            .from("a@x.com")
            .to("r@y.com")
            .to("")
            .subject("Hi")
            .body("Hello")
            .build();

        assert!(matches!(message.check(), Err(Error::Validation("to"))));
    }
}
