//! The request/response cycle.
//!
//! One connection per request, closed after the response (`Connection:
//! close`). Every wait is bounded: connecting retries a fixed number of
//! times, and the first response byte, the header block and the body each
//! have their own wall-clock budget.

use std::future::Future;
use std::io;
use std::ops::ControlFlow;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info};
use url::Url;

use super::chunked::ChunkedDecoder;
use super::connector::Connector;
use super::deadline::Deadline;
use super::error::{Phase, TransportError};
use super::request::{Method, Request};
use super::response::{ResponseHeaders, StatusClass, StatusLine, read_line};

const DEFAULT_CONNECT_ATTEMPTS: u32 = 30;
const DEFAULT_CONNECT_BACKOFF: Duration = Duration::from_millis(100);
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(15);
const DEFAULT_RESPONSE_TIMEOUT: Duration = Duration::from_secs(3);
const DEFAULT_HEADER_TIMEOUT: Duration = Duration::from_secs(5);
const DEFAULT_BODY_TIMEOUT: Duration = Duration::from_secs(10);
const DEFAULT_MAX_REDIRECTS: u32 = 5;
const DEFAULT_TICK_INTERVAL: Duration = Duration::from_millis(800);
const DEFAULT_MAX_LINE: usize = 1024;
const READ_CHUNK: usize = 1024;

/// Timeouts and limits for one client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpConfig {
    /// Connection attempts before giving up with `NoResponse`
    pub connect_attempts: u32,
    /// Pause between failed connection attempts
    pub connect_backoff: Duration,
    /// Budget for a single connection attempt, including the TLS handshake
    pub connect_timeout: Duration,
    /// Budget for the first response byte after the request is written
    pub response_timeout: Duration,
    /// Budget for the status line and headers
    pub header_timeout: Duration,
    /// Budget for the whole body
    pub body_timeout: Duration,
    /// Redirect hops followed before `TooManyRedirects`
    pub max_redirects: u32,
    /// Cadence of progress ticks during body reads
    pub tick_interval: Duration,
    /// Header lines are truncated to this many bytes
    pub max_line: usize,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpConfig {
    pub fn new() -> Self {
        Self {
            connect_attempts: DEFAULT_CONNECT_ATTEMPTS,
            connect_backoff: DEFAULT_CONNECT_BACKOFF,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            response_timeout: DEFAULT_RESPONSE_TIMEOUT,
            header_timeout: DEFAULT_HEADER_TIMEOUT,
            body_timeout: DEFAULT_BODY_TIMEOUT,
            max_redirects: DEFAULT_MAX_REDIRECTS,
            tick_interval: DEFAULT_TICK_INTERVAL,
            max_line: DEFAULT_MAX_LINE,
        }
    }

    /// Set the connection retry policy.
    pub fn with_connect_retry(mut self, attempts: u32, backoff: Duration) -> Self {
        self.connect_attempts = attempts.max(1);
        self.connect_backoff = backoff;
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn with_response_timeout(mut self, timeout: Duration) -> Self {
        self.response_timeout = timeout;
        self
    }

    pub fn with_header_timeout(mut self, timeout: Duration) -> Self {
        self.header_timeout = timeout;
        self
    }

    pub fn with_body_timeout(mut self, timeout: Duration) -> Self {
        self.body_timeout = timeout;
        self
    }

    pub fn with_max_redirects(mut self, max: u32) -> Self {
        self.max_redirects = max;
        self
    }

    pub fn with_tick_interval(mut self, interval: Duration) -> Self {
        self.tick_interval = interval;
        self
    }
}

/// Where a response body goes.
pub trait BodySink {
    /// Take the next run of body bytes. Break to stop reading early.
    fn accept(&mut self, chunk: &[u8]) -> impl Future<Output = io::Result<ControlFlow<()>>>;

    /// Called every tick interval while the body is being read, including
    /// while no data is arriving.
    fn on_tick(&mut self) {}
}

/// Collects a body into memory.
#[derive(Debug, Default)]
pub struct CollectBody(pub Vec<u8>);

impl BodySink for CollectBody {
    async fn accept(&mut self, chunk: &[u8]) -> io::Result<ControlFlow<()>> {
        self.0.extend_from_slice(chunk);
        Ok(ControlFlow::Continue(()))
    }
}

/// A minimal HTTP/1.x client over any [`Connector`].
#[derive(Debug, Clone)]
pub struct HttpClient<C> {
    connector: C,
    config: HttpConfig,
}

impl<C: Connector> HttpClient<C> {
    pub fn new(connector: C, config: HttpConfig) -> Self {
        Self { connector, config }
    }

    pub fn config(&self) -> &HttpConfig {
        &self.config
    }

    /// Send `request`, following redirects, and return the final response
    /// positioned at the start of its body.
    ///
    /// Redirect hops are sent as GET with the same headers. A chain of
    /// exactly `max_redirects` hops succeeds; one more fails.
    pub async fn send(&self, request: &Request) -> Result<Response<C::Stream>, TransportError> {
        let mut url = request.url().clone();
        let mut method = request.method();

        for hop in 0..=self.config.max_redirects {
            let response = self.exchange(request, &url, method, hop == 0).await?;
            match response.status.class() {
                StatusClass::Success => return Ok(response),
                StatusClass::Redirect => {
                    let location = response
                        .headers
                        .location
                        .as_deref()
                        .ok_or(TransportError::MissingLocation)?;
                    let next = url
                        .join(location)
                        .map_err(|source| TransportError::InvalidUrl {
                            url: location.to_string(),
                            source,
                        })?;
                    debug!(
                        hop = hop + 1,
                        status = response.status.code(),
                        to = %next,
                        "following redirect"
                    );
                    url = next;
                    method = Method::Get;
                }
                _ => {
                    let status = response.status.clone();
                    return Err(status
                        .to_error()
                        .unwrap_or(TransportError::HttpError {
                            status_line: status.raw().to_string(),
                        }));
                }
            }
        }

        Err(TransportError::TooManyRedirects {
            max: self.config.max_redirects,
        })
    }

    /// One connect/write/read-headers cycle against `url`.
    async fn exchange(
        &self,
        request: &Request,
        url: &Url,
        method: Method,
        with_body: bool,
    ) -> Result<Response<C::Stream>, TransportError> {
        let (host, port, tls) = endpoint(url)?;
        let stream = self.connect(&host, port, tls).await?;
        let mut reader = BufReader::new(stream);

        let wire = request.encode(url, method, with_body);
        reader.get_mut().write_all(&wire).await?;
        reader.get_mut().flush().await?;
        debug!(%method, %url, bytes = wire.len(), "request sent");

        let has_data = Deadline::after(self.config.response_timeout)
            .run(Phase::Response, 0, async {
                reader.fill_buf().await.map(|b| !b.is_empty())
            })
            .await??;
        if !has_data {
            return Err(TransportError::EmptyResponse);
        }

        let max_line = self.config.max_line;
        let (status, headers) = Deadline::after(self.config.header_timeout)
            .run(Phase::Headers, 0, async {
                let status_line = read_line(&mut reader, max_line)
                    .await?
                    .ok_or(TransportError::EmptyResponse)?;
                let status = StatusLine::parse(&status_line)?;
                let mut headers = ResponseHeaders::default();
                while let Some(line) = read_line(&mut reader, max_line).await? {
                    if line.is_empty() {
                        break;
                    }
                    headers.collect(&line);
                }
                Ok::<_, TransportError>((status, headers))
            })
            .await??;

        debug!(
            status = status.code(),
            chunked = headers.is_chunked(),
            content_length = ?headers.content_length,
            "response headers received"
        );

        Ok(Response {
            status,
            headers,
            url: url.clone(),
            reader,
            body_timeout: self.config.body_timeout,
            tick_interval: self.config.tick_interval,
        })
    }

    async fn connect(&self, host: &str, port: u16, tls: bool) -> Result<C::Stream, TransportError> {
        let attempts = self.config.connect_attempts.max(1);
        for attempt in 1..=attempts {
            let result = Deadline::after(self.config.connect_timeout)
                .run(Phase::Connect, 0, self.connector.connect(host, port, tls))
                .await;
            match result {
                Ok(Ok(stream)) => {
                    debug!(host, port, attempt, "connected");
                    return Ok(stream);
                }
                Ok(Err(e)) => debug!(host, attempt, error = %e, "connect failed"),
                Err(e) => debug!(host, attempt, error = %e, "connect timed out"),
            }
            if attempt < attempts {
                tokio::time::sleep(self.config.connect_backoff).await;
            }
        }
        info!(host, attempts, "giving up on connection");
        Err(TransportError::NoResponse {
            host: host.to_string(),
            attempts,
        })
    }
}

fn endpoint(url: &Url) -> Result<(String, u16, bool), TransportError> {
    let tls = match url.scheme() {
        "https" => true,
        "http" => false,
        _ => return Err(TransportError::UnsupportedUrl(url.to_string())),
    };
    let host = url
        .host_str()
        .ok_or_else(|| TransportError::UnsupportedUrl(url.to_string()))?;
    let port = url
        .port_or_known_default()
        .ok_or_else(|| TransportError::UnsupportedUrl(url.to_string()))?;
    Ok((host.to_string(), port, tls))
}

/// A response whose headers have been read.
#[derive(Debug)]
pub struct Response<S> {
    pub status: StatusLine,
    pub headers: ResponseHeaders,
    /// The URL that produced this response, after redirects.
    pub url: Url,
    reader: BufReader<S>,
    body_timeout: Duration,
    tick_interval: Duration,
}

impl<S: tokio::io::AsyncRead + tokio::io::AsyncWrite + Unpin> Response<S> {
    /// Override the client's body budget for this response only.
    pub fn with_body_timeout(mut self, timeout: Duration) -> Self {
        self.body_timeout = timeout;
        self
    }

    /// Stream the body into `sink` and return the number of payload bytes
    /// delivered.
    ///
    /// Chunked bodies are decoded and `Content-Length` bounds the read.
    /// Otherwise the body runs to end of stream. A stream that ends before
    /// the announced length or the final chunk is
    /// [`UnexpectedEof`](TransportError::UnexpectedEof). The connection is
    /// dropped when this returns, whether or not the body was fully read.
    pub async fn read_body<B: BodySink>(mut self, sink: &mut B) -> Result<u64, TransportError> {
        let started = Instant::now();
        let deadline = Deadline::after(self.body_timeout);
        let mut ticker =
            tokio::time::interval_at(Instant::now() + self.tick_interval, self.tick_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut chunked = self.headers.is_chunked().then(ChunkedDecoder::new);
        let mut remaining = match chunked {
            Some(_) => None,
            None => self.headers.content_length,
        };
        let mut received: u64 = 0;
        let mut delivered: u64 = 0;
        let mut buf = [0u8; READ_CHUNK];

        loop {
            if remaining == Some(0) || chunked.as_ref().is_some_and(ChunkedDecoder::is_done) {
                break;
            }
            let want = remaining.map_or(READ_CHUNK, |r| {
                usize::try_from(r).unwrap_or(READ_CHUNK).min(READ_CHUNK)
            });

            let n = tokio::select! {
                biased;
                _ = tokio::time::sleep_until(deadline.instant()) => {
                    info!(received, "body read timed out");
                    return Err(TransportError::Timeout { phase: Phase::Body, received });
                }
                _ = ticker.tick() => {
                    sink.on_tick();
                    continue;
                }
                n = self.reader.read(&mut buf[..want]) => n?,
            };
            if n == 0 {
                let cut_short = remaining.is_some_and(|r| r > 0)
                    || chunked.as_ref().is_some_and(|d| !d.is_done());
                if cut_short {
                    info!(received, expected = ?self.headers.content_length, "body cut short");
                    return Err(TransportError::UnexpectedEof { received });
                }
                break;
            }
            received += n as u64;
            if let Some(r) = remaining.as_mut() {
                *r -= n as u64;
            }

            let flow = match chunked.as_mut() {
                Some(decoder) => {
                    let mut payload = Vec::with_capacity(n);
                    decoder.feed(&buf[..n], &mut payload);
                    delivered += payload.len() as u64;
                    if payload.is_empty() {
                        ControlFlow::Continue(())
                    } else {
                        sink.accept(&payload).await?
                    }
                }
                None => {
                    delivered += n as u64;
                    sink.accept(&buf[..n]).await?
                }
            };
            if flow.is_break() {
                debug!(received, "body read stopped early");
                break;
            }
        }

        debug!(
            received,
            delivered,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "body read complete"
        );
        Ok(delivered)
    }

    /// Read the whole body into memory.
    pub async fn bytes(self) -> Result<Vec<u8>, TransportError> {
        let mut sink = CollectBody::default();
        self.read_body(&mut sink).await?;
        Ok(sink.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::UpdateCode;
    use crate::http::mock::{MockConnector, MockResponse, response};

    fn client(mock: &MockConnector) -> HttpClient<MockConnector> {
        HttpClient::new(
            mock.clone(),
            HttpConfig::new().with_connect_retry(3, Duration::from_millis(100)),
        )
    }

    fn redirect(to: &str) -> Vec<u8> {
        response("HTTP/1.1 302 Found", &[("Location", to)], b"")
    }

    #[tokio::test(start_paused = true)]
    async fn simple_get() {
        let mock = MockConnector::new();
        mock.respond(response(
            "HTTP/1.1 200 OK",
            &[("Content-Length", "5")],
            b"hello and more",
        ));

        let request = Request::get("https://api.example.com/x").unwrap();
        let response = client(&mock).send(&request).await.unwrap();
        assert_eq!(response.status.code(), 200);
        assert_eq!(response.bytes().await.unwrap(), b"hello");

        let sent = mock.requests();
        assert!(sent[0].starts_with("GET /x HTTP/1.0\r\nHost: api.example.com\r\n"));
        assert_eq!(mock.connections()[0], ("api.example.com".to_string(), 443, true));
    }

    #[tokio::test(start_paused = true)]
    async fn redirect_chain_of_exactly_max_succeeds() {
        let mock = MockConnector::new();
        for i in 1..=DEFAULT_MAX_REDIRECTS {
            mock.respond(redirect(&format!("https://hop{i}.example.com/f")));
        }
        mock.respond(response("HTTP/1.1 200 OK", &[], b"payload"));

        let request = Request::post("https://start.example.com/f", "x").unwrap();
        let response = client(&mock).send(&request).await.unwrap();
        assert_eq!(response.url.as_str(), "https://hop5.example.com/f");
        assert_eq!(response.bytes().await.unwrap(), b"payload");

        let sent = mock.requests();
        assert_eq!(sent.len(), 6);
        assert!(sent[0].starts_with("POST "));
        assert!(sent[1..].iter().all(|r| r.starts_with("GET ")));
    }

    #[tokio::test(start_paused = true)]
    async fn one_redirect_too_many_fails() {
        let mock = MockConnector::new();
        for i in 0..=DEFAULT_MAX_REDIRECTS {
            mock.respond(redirect(&format!("https://hop{i}.example.com/f")));
        }

        let request = Request::get("https://start.example.com/f").unwrap();
        let err = client(&mock).send(&request).await.unwrap_err();
        assert!(matches!(err, TransportError::TooManyRedirects { max: 5 }));
        assert_eq!(err.code(), UpdateCode::HttpError);
    }

    #[tokio::test(start_paused = true)]
    async fn redirect_without_location_is_terminal() {
        let mock = MockConnector::new();
        mock.respond(response("HTTP/1.1 301 Moved Permanently", &[], b""));
        mock.respond(response("HTTP/1.1 200 OK", &[], b"never"));

        let request = Request::get("https://start.example.com/f").unwrap();
        let err = client(&mock).send(&request).await.unwrap_err();
        assert!(matches!(err, TransportError::MissingLocation));
        assert_eq!(mock.connections().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn relative_location_resolves_against_current_url() {
        let mock = MockConnector::new();
        mock.respond(redirect("/other/path?q=1"));
        mock.respond(response("HTTP/1.1 200 OK", &[], b""));

        let request = Request::get("https://start.example.com/f/g").unwrap();
        let response = client(&mock).send(&request).await.unwrap();
        assert_eq!(response.url.as_str(), "https://start.example.com/other/path?q=1");
    }

    #[tokio::test(start_paused = true)]
    async fn status_mapping() {
        for (line, code) in [
            ("HTTP/1.1 401 Unauthorized", UpdateCode::Unauthorized),
            ("HTTP/1.1 429 Too Many Requests", UpdateCode::Unauthorized),
            ("HTTP/1.1 500 Internal Server Error", UpdateCode::DataError),
            ("HTTP/1.1 404 Not Found", UpdateCode::HttpError),
        ] {
            let mock = MockConnector::new();
            mock.respond(response(line, &[], b""));
            let request = Request::get("https://api.example.com/").unwrap();
            let err = client(&mock).send(&request).await.unwrap_err();
            assert_eq!(err.code(), code, "{line}");
        }
    }

    #[tokio::test(start_paused = true)]
    async fn connect_retries_then_no_response() {
        let mock = MockConnector::new();
        mock.refuse();
        mock.refuse();
        mock.refuse();
        mock.respond(response("HTTP/1.1 200 OK", &[], b""));

        let request = Request::get("https://api.example.com/").unwrap();
        let err = client(&mock).send(&request).await.unwrap_err();
        assert!(matches!(err, TransportError::NoResponse { attempts: 3, .. }));
        assert_eq!(err.code(), UpdateCode::NoResponse);
    }

    #[tokio::test(start_paused = true)]
    async fn connect_recovers_within_retry_budget() {
        let mock = MockConnector::new();
        mock.refuse();
        mock.respond(response("HTTP/1.1 200 OK", &[], b"ok"));

        let request = Request::get("https://api.example.com/").unwrap();
        let response = client(&mock).send(&request).await.unwrap();
        assert_eq!(response.bytes().await.unwrap(), b"ok");
    }

    #[tokio::test(start_paused = true)]
    async fn silent_server_times_out() {
        let mock = MockConnector::new();
        mock.push(MockResponse::new(Vec::new()).stalled());

        let request = Request::get("https://api.example.com/").unwrap();
        let err = client(&mock).send(&request).await.unwrap_err();
        assert!(matches!(
            err,
            TransportError::Timeout {
                phase: Phase::Response,
                ..
            }
        ));
        assert_eq!(err.code(), UpdateCode::Timeout);
    }

    #[tokio::test(start_paused = true)]
    async fn stalled_body_times_out_and_ticks() {
        let mock = MockConnector::new();
        mock.push(MockResponse::new(response("HTTP/1.1 200 OK", &[], b"partial")).stalled());

        struct Counting {
            ticks: u32,
            bytes: usize,
        }
        impl BodySink for Counting {
            async fn accept(&mut self, chunk: &[u8]) -> io::Result<ControlFlow<()>> {
                self.bytes += chunk.len();
                Ok(ControlFlow::Continue(()))
            }
            fn on_tick(&mut self) {
                self.ticks += 1;
            }
        }

        let request = Request::get("https://api.example.com/").unwrap();
        let response = client(&mock).send(&request).await.unwrap();
        let mut sink = Counting { ticks: 0, bytes: 0 };
        let err = response.read_body(&mut sink).await.unwrap_err();

        assert!(matches!(
            err,
            TransportError::Timeout {
                phase: Phase::Body,
                received: 7
            }
        ));
        assert_eq!(sink.bytes, 7);
        // 10 s budget at 800 ms
        assert_eq!(sink.ticks, 12);
    }

    #[tokio::test(start_paused = true)]
    async fn chunked_body_is_decoded() {
        let mock = MockConnector::new();
        mock.push(
            MockResponse::new(response(
                "HTTP/1.1 200 OK",
                &[("Transfer-Encoding", "chunked")],
                b"6\r\n{\"a\":\r\n2\r\n1}\r\n0\r\n\r\n",
            ))
            .in_pieces(3),
        );

        let request = Request::get("https://api.example.com/").unwrap();
        let response = client(&mock).send(&request).await.unwrap();
        assert_eq!(response.bytes().await.unwrap(), b"{\"a\":1}");
    }

    #[tokio::test(start_paused = true)]
    async fn body_shorter_than_content_length_is_an_error() {
        let mock = MockConnector::new();
        mock.respond(response("HTTP/1.1 200 OK", &[("Content-Length", "1000")], b"<html"));

        let request = Request::get("https://api.example.com/").unwrap();
        let response = client(&mock).send(&request).await.unwrap();
        let err = response.bytes().await.unwrap_err();
        assert!(matches!(err, TransportError::UnexpectedEof { received: 5 }));
        assert_eq!(err.code(), UpdateCode::Incomplete);
    }

    #[tokio::test(start_paused = true)]
    async fn chunked_body_without_final_chunk_is_an_error() {
        let mock = MockConnector::new();
        mock.respond(response(
            "HTTP/1.1 200 OK",
            &[("Transfer-Encoding", "chunked")],
            b"6\r\n{\"a\":\r\n",
        ));

        let request = Request::get("https://api.example.com/").unwrap();
        let response = client(&mock).send(&request).await.unwrap();
        let err = response.bytes().await.unwrap_err();
        assert!(matches!(err, TransportError::UnexpectedEof { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn sink_can_stop_early() {
        let mock = MockConnector::new();
        mock.push(MockResponse::new(response("HTTP/1.1 200 OK", &[], b"abcdef")).in_pieces(2));

        struct FirstOnly(Vec<u8>);
        impl BodySink for FirstOnly {
            async fn accept(&mut self, chunk: &[u8]) -> io::Result<ControlFlow<()>> {
                self.0.extend_from_slice(chunk);
                Ok(ControlFlow::Break(()))
            }
        }

        let request = Request::get("https://api.example.com/").unwrap();
        let response = client(&mock).send(&request).await.unwrap();
        let mut sink = FirstOnly(Vec::new());
        response.read_body(&mut sink).await.unwrap();
        assert_eq!(sink.0.len(), 2);
    }
}
