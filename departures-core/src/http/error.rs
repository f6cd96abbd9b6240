//! Transport error types.

use std::fmt;
use std::io;

use crate::domain::UpdateCode;

/// Which wait ran out of time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Connect,
    /// Waiting for the first response byte.
    Response,
    Headers,
    Body,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Phase::Connect => "connect",
            Phase::Response => "response",
            Phase::Headers => "headers",
            Phase::Body => "body",
        };
        f.write_str(s)
    }
}

/// Errors from the request/response cycle.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Every connection attempt failed
    #[error("no response from {host} after {attempts} connection attempts")]
    NoResponse { host: String, attempts: u32 },

    /// The server closed the connection without sending anything
    #[error("connection closed before any response")]
    EmptyResponse,

    /// A wall-clock budget ran out
    #[error("timed out during {phase} ({received} bytes received)")]
    Timeout { phase: Phase, received: u64 },

    /// 401, 403 or 429
    #[error("not authorized: {status_line}")]
    Unauthorized { status_line: String },

    /// 5xx
    #[error("server error: {status_line}")]
    ServerError { status_line: String },

    /// Any other non-success status, or an unparseable status line
    #[error("HTTP error: {status_line}")]
    HttpError { status_line: String },

    /// A 3xx response carried no Location header
    #[error("redirect without Location header")]
    MissingLocation,

    /// The redirect chain exceeded the hop limit
    #[error("more than {max} redirects")]
    TooManyRedirects { max: u32 },

    #[error("invalid URL {url:?}: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("unsupported URL {0:?}")]
    UnsupportedUrl(String),

    #[error("TLS setup failed: {0}")]
    Tls(#[from] rustls::Error),

    /// The stream ended before the announced body length or final chunk
    #[error("body cut short after {received} bytes")]
    UnexpectedEof { received: u64 },

    /// The connection failed mid-exchange
    #[error("connection error: {0}")]
    Io(#[from] io::Error),
}

impl TransportError {
    /// The stable result code for this error.
    pub fn code(&self) -> UpdateCode {
        match self {
            TransportError::NoResponse { .. }
            | TransportError::EmptyResponse
            | TransportError::Io(_) => UpdateCode::NoResponse,
            TransportError::Timeout { .. } => UpdateCode::Timeout,
            TransportError::UnexpectedEof { .. } => UpdateCode::Incomplete,
            TransportError::Unauthorized { .. } => UpdateCode::Unauthorized,
            TransportError::ServerError { .. } => UpdateCode::DataError,
            TransportError::HttpError { .. }
            | TransportError::MissingLocation
            | TransportError::TooManyRedirects { .. }
            | TransportError::InvalidUrl { .. }
            | TransportError::UnsupportedUrl(_)
            | TransportError::Tls(_) => UpdateCode::HttpError,
        }
    }
}
