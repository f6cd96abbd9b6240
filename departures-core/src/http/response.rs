//! Response status and header parsing.

use tokio::io::{AsyncBufRead, AsyncBufReadExt};

use super::error::TransportError;

/// How a status code is handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusClass {
    Success,
    Redirect,
    Unauthorized,
    ServerError,
    Other,
}

/// A parsed status line, e.g. `HTTP/1.1 200 OK`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusLine {
    code: u16,
    raw: String,
}

impl StatusLine {
    /// Parse a status line. Accepts HTTP/1.0 and HTTP/1.1.
    pub fn parse(line: &str) -> Result<Self, TransportError> {
        let raw = line.trim_end().to_string();
        let mut parts = raw.split_whitespace();
        let code = match (parts.next(), parts.next()) {
            (Some(version), Some(code)) if version.starts_with("HTTP/") => code.parse().ok(),
            _ => None,
        };
        match code {
            Some(code) => Ok(Self { code, raw }),
            None => Err(TransportError::HttpError { status_line: raw }),
        }
    }

    pub fn code(&self) -> u16 {
        self.code
    }

    /// The line as received, without the trailing CRLF.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn class(&self) -> StatusClass {
        match self.code {
            200..=299 => StatusClass::Success,
            300..=399 => StatusClass::Redirect,
            401 | 403 | 429 => StatusClass::Unauthorized,
            500..=599 => StatusClass::ServerError,
            _ => StatusClass::Other,
        }
    }

    /// The error for a status that ends the exchange, if any.
    pub fn to_error(&self) -> Option<TransportError> {
        let status_line = self.raw.clone();
        match self.class() {
            StatusClass::Success | StatusClass::Redirect => None,
            StatusClass::Unauthorized => Some(TransportError::Unauthorized { status_line }),
            StatusClass::ServerError => Some(TransportError::ServerError { status_line }),
            StatusClass::Other => Some(TransportError::HttpError { status_line }),
        }
    }
}

/// The response headers the client cares about. Everything else is skipped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResponseHeaders {
    pub location: Option<String>,
    pub transfer_encoding: Option<String>,
    pub content_length: Option<u64>,
    /// Base64 MD5 digest supplied by blob storage.
    pub blob_content_md5: Option<String>,
    pub content_md5: Option<String>,
}

impl ResponseHeaders {
    /// Record `line` if it names an allow-listed header.
    ///
    /// Names compare case-insensitively; values are trimmed.
    pub fn collect(&mut self, line: &str) {
        let Some((name, value)) = line.split_once(':') else {
            return;
        };
        let value = value.trim();
        let name = name.trim();
        if name.eq_ignore_ascii_case("location") {
            self.location = Some(value.to_string());
        } else if name.eq_ignore_ascii_case("transfer-encoding") {
            self.transfer_encoding = Some(value.to_string());
        } else if name.eq_ignore_ascii_case("content-length") {
            self.content_length = value.parse().ok();
        } else if name.eq_ignore_ascii_case("x-ms-blob-content-md5") {
            self.blob_content_md5 = Some(value.to_string());
        } else if name.eq_ignore_ascii_case("content-md5") {
            self.content_md5 = Some(value.to_string());
        }
    }

    pub fn is_chunked(&self) -> bool {
        self.transfer_encoding
            .as_deref()
            .is_some_and(|te| te.to_ascii_lowercase().contains("chunked"))
    }

    /// The server-supplied base64 MD5 digest, preferring the blob header.
    pub fn md5_digest(&self) -> Option<&str> {
        self.blob_content_md5
            .as_deref()
            .or(self.content_md5.as_deref())
            .filter(|d| !d.is_empty())
    }
}

/// Read one line, keeping at most `max` bytes of it.
///
/// The rest of an overlong line is consumed and discarded. The trailing
/// `\r\n` or `\n` is stripped. Returns `None` at end of stream.
pub async fn read_line<R: AsyncBufRead + Unpin>(
    reader: &mut R,
    max: usize,
) -> std::io::Result<Option<String>> {
    let mut line = Vec::new();
    let mut seen_any = false;
    loop {
        let available = reader.fill_buf().await?;
        if available.is_empty() {
            return Ok(seen_any.then(|| finish_line(line)));
        }
        seen_any = true;

        let newline = available.iter().position(|&b| b == b'\n');
        let content = match newline {
            Some(i) => &available[..i],
            None => available,
        };
        let room = max.saturating_sub(line.len());
        line.extend_from_slice(&content[..content.len().min(room)]);

        let used = newline.map_or(available.len(), |i| i + 1);
        reader.consume(used);
        if newline.is_some() {
            return Ok(Some(finish_line(line)));
        }
    }
}

fn finish_line(mut line: Vec<u8>) -> String {
    if line.last() == Some(&b'\r') {
        line.pop();
    }
    String::from_utf8_lossy(&line).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::BufReader;

    #[test]
    fn status_classes() {
        let class = |s: &str| StatusLine::parse(s).unwrap().class();
        assert_eq!(class("HTTP/1.1 200 OK"), StatusClass::Success);
        assert_eq!(class("HTTP/1.0 204 No Content"), StatusClass::Success);
        assert_eq!(class("HTTP/1.1 302 Found"), StatusClass::Redirect);
        assert_eq!(class("HTTP/1.1 401 Unauthorized"), StatusClass::Unauthorized);
        assert_eq!(class("HTTP/1.1 403 Forbidden"), StatusClass::Unauthorized);
        assert_eq!(class("HTTP/1.1 429 Too Many Requests"), StatusClass::Unauthorized);
        assert_eq!(class("HTTP/1.1 503 Service Unavailable"), StatusClass::ServerError);
        assert_eq!(class("HTTP/1.1 404 Not Found"), StatusClass::Other);
    }

    #[test]
    fn malformed_status_is_http_error_with_raw_line() {
        match StatusLine::parse("SSH-2.0-OpenSSH\r\n") {
            Err(TransportError::HttpError { status_line }) => {
                assert_eq!(status_line, "SSH-2.0-OpenSSH")
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn other_status_keeps_raw_line() {
        let status = StatusLine::parse("HTTP/1.1 418 I'm a teapot").unwrap();
        match status.to_error() {
            Some(TransportError::HttpError { status_line }) => {
                assert_eq!(status_line, "HTTP/1.1 418 I'm a teapot")
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn header_allow_list() {
        let mut headers = ResponseHeaders::default();
        for line in [
            "Location: https://objects.example.com/a",
            "transfer-encoding: Chunked",
            "Content-Length: 1024",
            "X-MS-Blob-Content-MD5: 1B2M2Y8AsgTpgAmY7PhCfg==",
            "Server: nginx",
            "not a header",
        ] {
            headers.collect(line);
        }
        assert_eq!(headers.location.as_deref(), Some("https://objects.example.com/a"));
        assert!(headers.is_chunked());
        assert_eq!(headers.content_length, Some(1024));
        assert_eq!(headers.md5_digest(), Some("1B2M2Y8AsgTpgAmY7PhCfg=="));
    }

    #[test]
    fn content_md5_is_fallback_digest() {
        let mut headers = ResponseHeaders::default();
        headers.collect("Content-MD5: abc=");
        assert_eq!(headers.md5_digest(), Some("abc="));
    }

    #[tokio::test]
    async fn lines_are_bounded() {
        let input = format!("short\r\n{}\nlast", "z".repeat(100));
        let mut reader = BufReader::with_capacity(8, input.as_bytes());
        assert_eq!(read_line(&mut reader, 16).await.unwrap().as_deref(), Some("short"));
        assert_eq!(
            read_line(&mut reader, 16).await.unwrap(),
            Some("z".repeat(16))
        );
        assert_eq!(read_line(&mut reader, 16).await.unwrap().as_deref(), Some("last"));
        assert_eq!(read_line(&mut reader, 16).await.unwrap(), None);
    }
}
