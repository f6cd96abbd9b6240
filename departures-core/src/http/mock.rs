//! Scripted in-memory connector.
//!
//! Each `connect` pops the next scripted reply. A reply either refuses the
//! connection or serves fixed bytes, optionally in small pieces and
//! optionally stalling forever once they run out. Everything the client
//! writes is recorded so tests can inspect the requests.

use std::collections::VecDeque;
use std::io;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard};
use std::task::{Context, Poll};

use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};

use super::connector::Connector;

/// Build raw response bytes from a status line, headers and body.
pub fn response(status_line: &str, headers: &[(&str, &str)], body: &[u8]) -> Vec<u8> {
    let mut head = format!("{status_line}\r\n");
    for (name, value) in headers {
        head.push_str(&format!("{name}: {value}\r\n"));
    }
    head.push_str("\r\n");
    let mut bytes = head.into_bytes();
    bytes.extend_from_slice(body);
    bytes
}

/// One scripted server reply.
#[derive(Debug, Clone)]
pub struct MockResponse {
    bytes: Vec<u8>,
    piece: usize,
    stall: bool,
}

impl MockResponse {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            bytes: bytes.into(),
            piece: usize::MAX,
            stall: false,
        }
    }

    /// Deliver at most `n` bytes per read.
    pub fn in_pieces(mut self, n: usize) -> Self {
        self.piece = n.max(1);
        self
    }

    /// Never close: once the bytes are delivered, reads stay pending.
    pub fn stalled(mut self) -> Self {
        self.stall = true;
        self
    }
}

#[derive(Debug)]
enum Reply {
    Refuse,
    Serve(MockResponse),
}

#[derive(Debug, Default)]
struct State {
    replies: VecDeque<Reply>,
    connections: Vec<(String, u16, bool)>,
    requests: Vec<Arc<Mutex<Vec<u8>>>>,
}

/// A connector that serves scripted replies.
#[derive(Debug, Clone, Default)]
pub struct MockConnector {
    state: Arc<Mutex<State>>,
}

impl MockConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a reply serving `bytes` and then closing.
    pub fn respond(&self, bytes: impl Into<Vec<u8>>) -> &Self {
        self.push(MockResponse::new(bytes))
    }

    pub fn push(&self, response: MockResponse) -> &Self {
        self.lock().replies.push_back(Reply::Serve(response));
        self
    }

    /// Queue a refused connection.
    pub fn refuse(&self) -> &Self {
        self.lock().replies.push_back(Reply::Refuse);
        self
    }

    /// `(host, port, tls)` for every accepted connection, in order.
    pub fn connections(&self) -> Vec<(String, u16, bool)> {
        self.lock().connections.clone()
    }

    /// Everything written on each accepted connection, in order.
    pub fn requests(&self) -> Vec<String> {
        self.lock()
            .requests
            .iter()
            .map(|r| {
                let written = r.lock().unwrap_or_else(|e| e.into_inner());
                String::from_utf8_lossy(&written).into_owned()
            })
            .collect()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Connector for MockConnector {
    type Stream = MockStream;

    async fn connect(&self, host: &str, port: u16, tls: bool) -> io::Result<MockStream> {
        let mut state = self.lock();
        match state.replies.pop_front() {
            Some(Reply::Serve(response)) => {
                let written = Arc::new(Mutex::new(Vec::new()));
                state.connections.push((host.to_string(), port, tls));
                state.requests.push(written.clone());
                Ok(MockStream {
                    response,
                    pos: 0,
                    written,
                })
            }
            Some(Reply::Refuse) | None => Err(io::Error::new(
                io::ErrorKind::ConnectionRefused,
                "scripted refusal",
            )),
        }
    }
}

/// The client end of a scripted connection.
#[derive(Debug)]
pub struct MockStream {
    response: MockResponse,
    pos: usize,
    written: Arc<Mutex<Vec<u8>>>,
}

impl AsyncRead for MockStream {
    fn poll_read(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        let left = &this.response.bytes[this.pos..];
        if left.is_empty() {
            return if this.response.stall {
                Poll::Pending
            } else {
                Poll::Ready(Ok(()))
            };
        }
        let n = left.len().min(this.response.piece).min(buf.remaining());
        buf.put_slice(&left[..n]);
        this.pos += n;
        Poll::Ready(Ok(()))
    }
}

impl AsyncWrite for MockStream {
    fn poll_write(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        self.written
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .extend_from_slice(buf);
        Poll::Ready(Ok(buf.len()))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}
