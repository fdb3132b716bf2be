//! RFC 2047 "B" encoded-words for non-ASCII header values
//!
//! <https://tools.ietf.org/html/rfc2047>

use base64::{engine::general_purpose::STANDARD as BASE64_STANDARD, Engine as _};

// Colon is excluded so that an encoded value can never be mistaken for a
// header field delimiter.
fn allowed_char(c: char) -> bool {
    (c >= 1 as char && c <= 9 as char
        || c == 11 as char
        || c == 12 as char
        || c >= 14 as char && c <= 127 as char)
        && c != ':'
}

/// Encodes a header value as an RFC 2047 encoded-word when needed
///
/// Values made only of printable ASCII are passed through unchanged.
pub fn encode(s: &str) -> String {
    if s.chars().all(allowed_char) {
        s.into()
    } else {
        format!("=?utf-8?b?{}?=", BASE64_STANDARD.encode(s))
    }
}

/// Decodes an RFC 2047 "B" encoded-word back to its original text
///
/// Returns `None` when the base64 part or the decoded bytes are invalid.
/// Values without the encoded-word markers are returned unchanged.
pub fn decode(s: &str) -> Option<String> {
    const PREFIX: &str = "=?utf-8?b?";
    const SUFFIX: &str = "?=";

    let s = s.trim();
    if s.starts_with(PREFIX) && s.ends_with(SUFFIX) {
        let s = &s[PREFIX.len()..];
        let s = &s[..s.len() - SUFFIX.len()];
        BASE64_STANDARD
            .decode(s)
            .ok()
            .and_then(|v| String::from_utf8(v).ok())
    } else {
        Some(s.into())
    }
}

#[cfg(test)]
mod test {
    use super::{decode, encode};

    #[test]
    fn encode_ascii() {
        assert_eq!(&encode("Kayo. ?"), "Kayo. ?");
    }

    #[test]
    fn decode_ascii() {
        assert_eq!(decode("Kayo. ?"), Some("Kayo. ?".into()));
    }

    #[test]
    fn encode_utf8() {
        assert_eq!(
            &encode("Привет, мир!"),
            "=?utf-8?b?0J/RgNC40LLQtdGCLCDQvNC40YAh?="
        );
    }

    #[test]
    fn decode_utf8() {
        assert_eq!(
            decode("=?utf-8?b?0J/RgNC40LLQtdGCLCDQvNC40YAh?="),
            Some("Привет, мир!".into())
        );
    }

    #[test]
    fn round_trip_multibyte_scripts() {
        for subject in ["тема", "メール件名", "mixed тема 件名"] {
            let encoded = encode(subject);
            assert!(encoded.is_ascii());
            assert!(encoded.starts_with("=?utf-8?b?"));
            assert_eq!(decode(&encoded), Some(subject.into()));
        }
    }

    #[test]
    fn encode_colon_is_not_passed_through() {
        let encoded = encode("Re: status");
        assert!(encoded.starts_with("=?utf-8?b?"));
        assert_eq!(decode(&encoded), Some("Re: status".into()));
    }
}
