//! Line-oriented authentication protocol.
//!
//! # Wire Format
//! ```text
//! request:  <username>\n<password_hash>\n   (blank lines tolerated)
//! response: authorised | not authorised | bad request   (no delimiter)
//! ```
//!
//! Each received chunk is one request; the protocol carries no state
//! between requests.

use thiserror::Error;

use crate::accounts::AccountStore;

/// A decoded authentication request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub username: String,
    pub password_hash: String,
}

/// Reasons a request is malformed. Always answered with `bad request`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    #[error("expected 2 request lines, got {0}")]
    LineCount(usize),

    #[error("request is not valid UTF-8")]
    InvalidUtf8,
}

/// Server reply to a single request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Response {
    Authorised,
    NotAuthorised,
    BadRequest,
}

impl Response {
    pub fn as_str(&self) -> &'static str {
        match self {
            Response::Authorised => "authorised",
            Response::NotAuthorised => "not authorised",
            Response::BadRequest => "bad request",
        }
    }

    /// Bytes written to the socket.
    pub fn encode(&self) -> &'static [u8] {
        self.as_str().as_bytes()
    }
}

impl std::fmt::Display for Response {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Decode one received chunk into a request.
///
/// The chunk is split on `\n`, each line is trimmed, and empty lines are
/// dropped. Exactly two lines must remain.
pub fn decode(buf: &[u8]) -> Result<Request, ProtocolError> {
    let text = std::str::from_utf8(buf).map_err(|_| ProtocolError::InvalidUtf8)?;
    let lines: Vec<&str> = text
        .split('\n')
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect();

    match lines.as_slice() {
        [username, password_hash] => Ok(Request {
            username: (*username).to_string(),
            password_hash: (*password_hash).to_string(),
        }),
        other => Err(ProtocolError::LineCount(other.len())),
    }
}

/// Answer a decoded request against the account store.
pub fn respond(store: &AccountStore, request: &Result<Request, ProtocolError>) -> Response {
    match request {
        Ok(req) if store.is_authorized(&req.username, &req.password_hash) => Response::Authorised,
        Ok(_) => Response::NotAuthorised,
        Err(_) => Response::BadRequest,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_two_lines() {
        let req = decode(b"alice\nabc123\n").unwrap();
        assert_eq!(req.username, "alice");
        assert_eq!(req.password_hash, "abc123");
    }

    #[test]
    fn blank_lines_and_whitespace_are_stripped() {
        let req = decode(b"\n\n  alice \r\n\n\tabc123\r\n\n").unwrap();
        assert_eq!(req.username, "alice");
        assert_eq!(req.password_hash, "abc123");
    }

    #[test]
    fn missing_trailing_newline_is_accepted() {
        assert!(decode(b"alice\nabc123").is_ok());
    }

    #[test]
    fn wrong_line_counts_are_rejected() {
        assert_eq!(decode(b"alice\n"), Err(ProtocolError::LineCount(1)));
        assert_eq!(decode(b"a\nb\nc\n"), Err(ProtocolError::LineCount(3)));
        assert_eq!(decode(b"\n \n"), Err(ProtocolError::LineCount(0)));
    }

    #[test]
    fn invalid_utf8_is_rejected() {
        assert_eq!(decode(b"alice\n\xff\xfe\n"), Err(ProtocolError::InvalidUtf8));
    }

    #[test]
    fn respond_maps_outcomes() {
        let store = AccountStore::parse("alice abc123");
        assert_eq!(respond(&store, &decode(b"alice\nabc123\n")), Response::Authorised);
        assert_eq!(respond(&store, &decode(b"alice\nnope\n")), Response::NotAuthorised);
        assert_eq!(respond(&store, &decode(b"mallory\nabc123\n")), Response::NotAuthorised);
        assert_eq!(respond(&store, &decode(b"alice\n")), Response::BadRequest);
    }

    #[test]
    fn responses_have_no_delimiter() {
        assert_eq!(Response::Authorised.encode(), b"authorised");
        assert_eq!(Response::NotAuthorised.encode(), b"not authorised");
        assert_eq!(Response::BadRequest.encode(), b"bad request");
    }
}
