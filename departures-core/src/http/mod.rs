//! Minimal HTTP/1.x transport.
//!
//! Written directly against a byte stream rather than a general-purpose
//! client: GET and POST only, one connection per request, a handful of
//! response headers, bounded redirect chasing and per-phase deadlines.
//! Bodies are streamed to a [`BodySink`] so large documents never sit in
//! memory.

mod chunked;
mod client;
mod connector;
mod deadline;
mod error;
pub mod mock;
mod request;
mod response;

pub use chunked::ChunkedDecoder;
pub use client::{BodySink, CollectBody, HttpClient, HttpConfig, Response};
pub use connector::{Connector, NetConnector, NetStream, TrustPolicy};
pub use deadline::Deadline;
pub use error::{Phase, TransportError};
pub use request::{HttpVersion, Method, Request};
pub use response::{ResponseHeaders, StatusClass, StatusLine, read_line};
