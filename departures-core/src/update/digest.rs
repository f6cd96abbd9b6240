//! MD5 digests in the forms the release host and the pipeline use.
//!
//! The host sends a base64 digest in a response header; downloads are
//! checked by comparing lowercase hex.

use std::io;
use std::path::Path;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use md5::{Digest, Md5};
use tokio::io::AsyncReadExt;

const MD5_LEN: usize = 16;
const READ_CHUNK: usize = 4096;

/// Errors decoding a server-supplied digest.
#[derive(Debug, thiserror::Error)]
pub enum DigestError {
    #[error("digest is not base64: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("digest is {0} bytes, expected 16")]
    Length(usize),
}

/// Lowercase hex MD5 of `data`.
pub fn md5_hex(data: &[u8]) -> String {
    hex::encode(Md5::digest(data))
}

/// Base64 MD5 of `data`, as a blob store would report it.
pub fn md5_base64(data: &[u8]) -> String {
    STANDARD.encode(Md5::digest(data))
}

/// Convert a base64 MD5 digest to lowercase hex.
///
/// # Examples
///
/// ```
/// use departures_core::update::base64_to_hex;
///
/// // MD5 of the empty string
/// assert_eq!(
///     base64_to_hex("1B2M2Y8AsgTpgAmY7PhCfg==").unwrap(),
///     "d41d8cd98f00b204e9800998ecf8427e"
/// );
/// ```
pub fn base64_to_hex(digest: &str) -> Result<String, DigestError> {
    let bytes = STANDARD.decode(digest.trim())?;
    if bytes.len() != MD5_LEN {
        return Err(DigestError::Length(bytes.len()));
    }
    Ok(hex::encode(bytes))
}

/// Lowercase hex MD5 of a file, read back from disk.
pub async fn file_md5_hex(path: &Path) -> io::Result<String> {
    let mut file = tokio::fs::File::open(path).await?;
    let mut hasher = Md5::new();
    let mut buf = vec![0u8; READ_CHUNK];
    loop {
        let n = file.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}
