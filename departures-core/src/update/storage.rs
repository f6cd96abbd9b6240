//! Persistent storage for updates.
//!
//! Files are written next to their target under a hidden staging name and
//! renamed over the target only once verified, so a reader never sees a
//! partial file.

use std::future::Future;
use std::io;
use std::path::{Path, PathBuf};

use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use crate::domain::Version;

use super::digest::file_md5_hex;

/// The staging path for `target`: a hidden sibling in the same directory,
/// so the final rename never crosses filesystems.
pub fn staging_path(target: &Path) -> PathBuf {
    let name = target
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    target.with_file_name(format!(".{name}.partial"))
}

/// A file being written under its staging name.
#[derive(Debug)]
pub struct StagedFile {
    file: tokio::fs::File,
    staging: PathBuf,
    target: PathBuf,
    written: u64,
}

impl StagedFile {
    /// Create (or truncate) the staging file for `target`.
    pub async fn create(target: &Path) -> io::Result<Self> {
        let staging = staging_path(target);
        let file = tokio::fs::File::create(&staging).await?;
        Ok(Self {
            file,
            staging,
            target: target.to_path_buf(),
            written: 0,
        })
    }

    pub async fn write(&mut self, chunk: &[u8]) -> io::Result<()> {
        self.file.write_all(chunk).await?;
        self.written += chunk.len() as u64;
        Ok(())
    }

    pub fn written(&self) -> u64 {
        self.written
    }

    /// Flush and close, leaving the bytes on disk under the staging name.
    pub async fn close(mut self) -> io::Result<Staged> {
        self.file.flush().await?;
        self.file.sync_all().await?;
        Ok(Staged {
            staging: self.staging,
            target: self.target,
        })
    }

    /// Close and remove the staging file.
    pub async fn discard(self) {
        let Self { file, staging, .. } = self;
        drop(file);
        discard_path(&staging).await;
    }
}

/// A closed staging file awaiting a verdict.
#[derive(Debug)]
pub struct Staged {
    staging: PathBuf,
    target: PathBuf,
}

impl Staged {
    pub fn staging(&self) -> &Path {
        &self.staging
    }

    pub fn target(&self) -> &Path {
        &self.target
    }

    /// MD5 of the staged bytes as they are on disk.
    pub async fn md5_hex(&self) -> io::Result<String> {
        file_md5_hex(&self.staging).await
    }

    /// Atomically replace the target.
    pub async fn commit(self) -> io::Result<()> {
        tokio::fs::rename(&self.staging, &self.target).await?;
        debug!(path = %self.target.display(), "staged file committed");
        Ok(())
    }

    /// Remove the staging file, leaving the target untouched.
    pub async fn discard(self) {
        discard_path(&self.staging).await;
    }
}

async fn discard_path(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => debug!(path = %path.display(), "staging file removed"),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => warn!(path = %path.display(), error = %e, "could not remove staging file"),
    }
}

/// Where a firmware image is written.
///
/// The pipeline calls `begin` once the image has passed its pre-flight
/// checks, `write` for every chunk, and then exactly one of `commit` (digest
/// matched) or `abort`.
pub trait FirmwareSlot {
    /// Bytes the slot can hold.
    fn available(&self) -> u64;

    fn begin(&mut self, size: u64) -> impl Future<Output = io::Result<()>>;

    fn write(&mut self, chunk: &[u8]) -> impl Future<Output = io::Result<()>>;

    /// Make the written image the one that boots next.
    fn commit(&mut self) -> impl Future<Output = io::Result<()>>;

    /// Throw away whatever was written.
    fn abort(&mut self) -> impl Future<Output = ()>;
}

/// A firmware slot backed by a file, for hosts without flash partitions.
#[derive(Debug)]
pub struct FileSlot {
    target: PathBuf,
    capacity: u64,
    staged: Option<StagedFile>,
}

impl FileSlot {
    pub fn new(target: impl Into<PathBuf>, capacity: u64) -> Self {
        Self {
            target: target.into(),
            capacity,
            staged: None,
        }
    }

    pub fn target(&self) -> &Path {
        &self.target
    }
}

impl FirmwareSlot for FileSlot {
    fn available(&self) -> u64 {
        self.capacity
    }

    async fn begin(&mut self, size: u64) -> io::Result<()> {
        debug!(path = %self.target.display(), size, "firmware slot opened");
        self.staged = Some(StagedFile::create(&self.target).await?);
        Ok(())
    }

    async fn write(&mut self, chunk: &[u8]) -> io::Result<()> {
        match self.staged.as_mut() {
            Some(staged) => staged.write(chunk).await,
            None => Err(io::Error::other("firmware slot written before begin")),
        }
    }

    async fn commit(&mut self) -> io::Result<()> {
        let staged = self
            .staged
            .take()
            .ok_or_else(|| io::Error::other("firmware slot committed before begin"))?;
        staged.close().await?.commit().await
    }

    async fn abort(&mut self) {
        if let Some(staged) = self.staged.take() {
            staged.discard().await;
        }
    }
}

/// Read the installed web bundle version, `None` if no marker exists.
pub async fn read_version_marker(path: &Path) -> io::Result<Option<Version>> {
    let contents = match tokio::fs::read_to_string(path).await {
        Ok(contents) => contents,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e),
    };
    let mut lines = contents.lines();
    let major = lines.next().unwrap_or("0").trim();
    let minor = lines.next().unwrap_or("0").trim();
    Ok(Some(Version::parse_lenient(&format!("{major}.{minor}"))))
}

/// Atomically write the version marker as `major\nminor\n`.
pub async fn write_version_marker(path: &Path, version: Version) -> io::Result<()> {
    let mut staged = StagedFile::create(path).await?;
    staged
        .write(format!("{}\n{}\n", version.major, version.minor).as_bytes())
        .await?;
    staged.close().await?.commit().await
}
