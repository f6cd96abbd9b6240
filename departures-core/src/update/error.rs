//! Update pipeline errors.

use std::io;

use crate::domain::UpdateCode;
use crate::http::TransportError;

use super::digest::DigestError;

/// Errors from checking for or applying an update.
#[derive(Debug, thiserror::Error)]
pub enum UpdateError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The downloaded bytes do not hash to the server's digest
    #[error("{asset}: MD5 mismatch (expected {expected}, downloaded {actual})")]
    DigestMismatch {
        asset: String,
        expected: String,
        actual: String,
    },

    /// The server sent no digest and the policy requires one
    #[error("{asset}: server supplied no MD5 digest")]
    MissingDigest { asset: String },

    #[error("bad digest header: {0}")]
    Digest(#[from] DigestError),

    #[error("not enough space: need {needed} bytes, {available} available")]
    InsufficientSpace { needed: u64, available: u64 },

    /// Firmware downloads must announce their size up front
    #[error("server did not report the firmware size")]
    UnknownSize,

    #[error("firmware image starts with {0:#04x}, expected 0xe9")]
    BadMagic(u8),

    #[error("download ended after {received} of {expected} bytes")]
    Truncated { expected: u64, received: u64 },

    #[error("release has no asset named {0}")]
    NoAsset(String),

    #[error("release metadata has no tag")]
    NoTag,

    /// Asset names become file names; anything path-like is refused
    #[error("refusing asset name {0:?}")]
    UnsafeName(String),

    #[error("storage error: {0}")]
    Io(#[from] io::Error),
}

impl UpdateError {
    /// The stable result code for this error.
    pub fn code(&self) -> UpdateCode {
        match self {
            UpdateError::Transport(e) => e.code(),
            UpdateError::Truncated { .. } => UpdateCode::Incomplete,
            UpdateError::UnknownSize => UpdateCode::HttpError,
            UpdateError::DigestMismatch { .. }
            | UpdateError::MissingDigest { .. }
            | UpdateError::Digest(_)
            | UpdateError::InsufficientSpace { .. }
            | UpdateError::BadMagic(_)
            | UpdateError::NoAsset(_)
            | UpdateError::NoTag
            | UpdateError::UnsafeName(_)
            | UpdateError::Io(_) => UpdateCode::DataError,
        }
    }
}
