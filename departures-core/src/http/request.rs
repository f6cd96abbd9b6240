//! Outgoing requests.

use std::fmt;

use url::Url;

use super::error::TransportError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Protocol version written on the request line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum HttpVersion {
    /// HTTP/1.0 keeps servers from choosing chunked encoding.
    #[default]
    Http10,
    Http11,
}

impl HttpVersion {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpVersion::Http10 => "HTTP/1.0",
            HttpVersion::Http11 => "HTTP/1.1",
        }
    }
}

/// A request: method, absolute URL, extra headers and an optional body.
///
/// `Host` and `Connection: close` are always written; a body also gets a
/// `Content-Length`.
///
/// # Examples
///
/// ```
/// use departures_core::http::{Method, Request};
///
/// let request = Request::get("https://api.example.com/items?id=4")
///     .unwrap()
///     .with_header("Accept", "application/json");
/// let wire = String::from_utf8(request.encode(request.url(), Method::Get, true)).unwrap();
/// assert_eq!(
///     wire,
///     "GET /items?id=4 HTTP/1.0\r\n\
///      Host: api.example.com\r\n\
///      Accept: application/json\r\n\
///      Connection: close\r\n\r\n"
/// );
/// ```
#[derive(Debug, Clone)]
pub struct Request {
    method: Method,
    url: Url,
    version: HttpVersion,
    headers: Vec<(String, String)>,
    body: Option<Vec<u8>>,
}

impl Request {
    pub fn new(method: Method, url: &str) -> Result<Self, TransportError> {
        let url = Url::parse(url).map_err(|source| TransportError::InvalidUrl {
            url: url.to_string(),
            source,
        })?;
        Ok(Self::from_url(method, url))
    }

    pub fn from_url(method: Method, url: Url) -> Self {
        Self {
            method,
            url,
            version: HttpVersion::default(),
            headers: Vec::new(),
            body: None,
        }
    }

    pub fn get(url: &str) -> Result<Self, TransportError> {
        Self::new(Method::Get, url)
    }

    pub fn post(url: &str, body: impl Into<Vec<u8>>) -> Result<Self, TransportError> {
        Ok(Self::new(Method::Post, url)?.with_body(body))
    }

    /// Append a header. Order is preserved on the wire.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn with_version(mut self, version: HttpVersion) -> Self {
        self.version = version;
        self
    }

    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn method(&self) -> Method {
        self.method
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    pub fn body(&self) -> Option<&[u8]> {
        self.body.as_deref()
    }

    /// Serialize for sending to `url` with `method`.
    ///
    /// Redirect hops reuse the headers against a new URL, and drop the body.
    pub fn encode(&self, url: &Url, method: Method, with_body: bool) -> Vec<u8> {
        let mut target = url.path().to_string();
        if let Some(query) = url.query() {
            target.push('?');
            target.push_str(query);
        }

        let mut head = format!("{method} {target} {}\r\n", self.version.as_str());
        head.push_str("Host: ");
        head.push_str(url.host_str().unwrap_or_default());
        if let Some(port) = url.port() {
            head.push_str(&format!(":{port}"));
        }
        head.push_str("\r\n");
        for (name, value) in &self.headers {
            head.push_str(&format!("{name}: {value}\r\n"));
        }
        head.push_str("Connection: close\r\n");

        let body = self.body.as_deref().filter(|_| with_body);
        if let Some(body) = body {
            head.push_str(&format!("Content-Length: {}\r\n", body.len()));
        }
        head.push_str("\r\n");

        let mut wire = head.into_bytes();
        if let Some(body) = body {
            wire.extend_from_slice(body);
        }
        wire
    }
}
