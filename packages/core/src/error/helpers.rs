use std::fmt;

use bytes::Bytes;
use http::StatusCode;

use super::types::Error;

/// Longest stretch of a rejected response body echoed into error messages.
const BODY_SNIPPET_LEN: usize = 128;

/// A marker type to indicate that a connection timed out.
#[derive(Debug)]
pub struct TimedOut;

impl fmt::Display for TimedOut {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("timed out")
    }
}

impl std::error::Error for TimedOut {}

/// A marker type to indicate that an operation was canceled.
#[derive(Debug)]
pub struct OperationCanceled;

impl fmt::Display for OperationCanceled {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("operation canceled")
    }
}

impl std::error::Error for OperationCanceled {}

/// Why a protocol switch was refused, as seen by either peer.
#[derive(Debug, thiserror::Error)]
pub enum NegotiationFailure {
    /// The peer (or a proxy in front of it) answered with something other than 101.
    #[error("unexpected HTTP response: {status}{}", snippet(.body))]
    UnexpectedStatus { status: StatusCode, body: Bytes },
    #[error("server switched to unexpected protocol {0:?}")]
    UnexpectedProtocol(String),
    #[error("no next protocol in HTTP request")]
    MissingProtocol,
    #[error("client requested unhandled next protocol {0:?}")]
    UnknownProtocol(String),
}

/// The HTTP machinery did not hand over the connection the way the upgrade needs.
#[derive(Debug, thiserror::Error)]
pub enum IntegrationFailure {
    #[error("HTTP transport did not provide a connection")]
    NoConnectionSignaled,
    #[error("can't hijack client connection")]
    HijackUnsupported,
}

/// The per-attempt errors of a dial where neither transport got through.
#[derive(Debug)]
pub struct AttemptsFailed {
    pub http: Error,
    pub https: Error,
}

impl fmt::Display for AttemptsFailed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HTTP: {}, HTTPS: {}", self.http, self.https)
    }
}

// No `source`: both attempt errors are part of the message.
impl std::error::Error for AttemptsFailed {}

fn snippet(body: &Bytes) -> String {
    if body.is_empty() {
        return String::new();
    }
    let end = body.len().min(BODY_SNIPPET_LEN);
    let text = String::from_utf8_lossy(&body[..end]);
    let text = text.trim();
    if text.is_empty() {
        String::new()
    } else if body.len() > BODY_SNIPPET_LEN {
        format!(" ({text}...)")
    } else {
        format!(" ({text})")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unexpected_status_includes_body_snippet() {
        let failure = NegotiationFailure::UnexpectedStatus {
            status: StatusCode::FORBIDDEN,
            body: Bytes::from_static(b"blocked by corporate proxy\n"),
        };
        assert_eq!(
            failure.to_string(),
            "unexpected HTTP response: 403 Forbidden (blocked by corporate proxy)"
        );
    }

    #[test]
    fn unexpected_status_without_body() {
        let failure = NegotiationFailure::UnexpectedStatus {
            status: StatusCode::BAD_GATEWAY,
            body: Bytes::new(),
        };
        assert_eq!(failure.to_string(), "unexpected HTTP response: 502 Bad Gateway");
    }

    #[test]
    fn long_bodies_are_truncated() {
        let failure = NegotiationFailure::UnexpectedStatus {
            status: StatusCode::OK,
            body: Bytes::from(vec![b'x'; 1000]),
        };
        let message = failure.to_string();
        assert!(message.ends_with("...)"));
        assert!(message.len() < 200);
    }
}
