//! Checking for, downloading, verifying and applying releases.
//!
//! ```text
//! Idle -> FetchingMetadata -> NoUpdateAvailable
//!                          -> AssetFound -> Downloading -> Verifying -> Applying -> Applied
//!                                                                   -> VerificationFailed
//! ```
//!
//! Nothing is applied unless the downloaded bytes hash to the digest the
//! release host supplied with the final (post-redirect) response.

use std::io;
use std::ops::ControlFlow;
use std::path::{Component, Path};
use std::time::Duration;

use md5::{Digest, Md5};
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::domain::Version;
use crate::feed::{Progress, ProgressSink};
use crate::http::{
    BodySink, Connector, HttpClient, HttpConfig, Request, Response, ResponseHeaders,
};
use crate::json::JsonStream;

use super::digest::base64_to_hex;
use super::error::UpdateError;
use super::release::{Asset, FIRMWARE_ASSET, ReleaseInfo, ReleaseListener};
use super::storage::{FirmwareSlot, StagedFile, read_version_marker, write_version_marker};

/// Repository the board's releases are published from.
pub const DEFAULT_REPO: &str = "gadec-uk/departures-board";

const DEFAULT_API_BASE: &str = "https://api.github.com";
const USER_AGENT: &str = "esp32/1.0";
const API_VERSION: &str = "2022-11-28";
const DEFAULT_DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(120);

/// First byte of every valid firmware image.
pub const FIRMWARE_MAGIC: u8 = 0xE9;

/// Where the pipeline is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdatePhase {
    Idle,
    FetchingMetadata,
    NoUpdateAvailable,
    AssetFound,
    Downloading,
    Verifying,
    Applying,
    Applied,
    VerificationFailed,
}

/// What to do when the server sends no digest.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DigestPolicy {
    /// Refuse the download.
    #[default]
    Required,
    /// Apply it unverified, with a warning.
    IfPresent,
}

/// Result of an update attempt that did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    UpToDate,
    Applied(Version),
}

/// Configuration for the updater.
#[derive(Debug, Clone)]
pub struct ReleaseConfig {
    /// `owner/name` of the repository
    pub repo: String,
    /// Base URL for the API (defaults to production)
    pub api_base: String,
    /// Bearer token, for private repositories
    pub token: Option<String>,
    pub digest_policy: DigestPolicy,
    /// Budget for reading one asset body
    pub download_timeout: Duration,
    pub http: HttpConfig,
}

impl Default for ReleaseConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl ReleaseConfig {
    pub fn new() -> Self {
        Self {
            repo: DEFAULT_REPO.to_string(),
            api_base: DEFAULT_API_BASE.to_string(),
            token: None,
            digest_policy: DigestPolicy::default(),
            download_timeout: DEFAULT_DOWNLOAD_TIMEOUT,
            http: Self::default_http(),
        }
    }

    /// Release host timeouts: 30 connection attempts 200ms apart, 5s to the
    /// first byte and 12s for the metadata body.
    pub fn default_http() -> HttpConfig {
        HttpConfig::new()
            .with_connect_retry(30, Duration::from_millis(200))
            .with_response_timeout(Duration::from_secs(5))
            .with_body_timeout(Duration::from_secs(12))
    }

    pub fn with_repo(mut self, repo: impl Into<String>) -> Self {
        self.repo = repo.into();
        self
    }

    /// Set a custom API base URL (for testing).
    pub fn with_api_base(mut self, url: impl Into<String>) -> Self {
        self.api_base = url.into();
        self
    }

    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token.filter(|t| !t.is_empty());
        self
    }

    pub fn with_digest_policy(mut self, policy: DigestPolicy) -> Self {
        self.digest_policy = policy;
        self
    }

    pub fn with_download_timeout(mut self, timeout: Duration) -> Self {
        self.download_timeout = timeout;
        self
    }

    pub fn with_http(mut self, http: HttpConfig) -> Self {
        self.http = http;
        self
    }

    fn latest_release_url(&self) -> String {
        format!("{}/repos/{}/releases/latest", self.api_base, self.repo)
    }
}

/// How far through a download the pipeline is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpdateProgress {
    /// Position of the asset being downloaded, from 1
    pub file: usize,
    /// Assets in this update
    pub files: usize,
    /// Body bytes received for the current asset
    pub received: u64,
    /// Announced size of the current asset
    pub total: Option<u64>,
}

impl UpdateProgress {
    fn start(file: usize, files: usize, total: Option<u64>) -> Self {
        Self {
            file,
            files,
            received: 0,
            total,
        }
    }

    /// Overall completion. Finished assets count whole and the current
    /// one counts by bytes when its size is known.
    pub fn percent(&self) -> u8 {
        let files = self.files.max(1) as u64;
        let finished = self.file.saturating_sub(1).min(self.files) as u64;
        let current = match self.total {
            Some(total) if total > 0 => self.received.min(total) * 100 / total,
            _ => 0,
        };
        ((finished * 100 + current) / files).min(100) as u8
    }
}

/// Streams a firmware image into a slot, hashing as it goes.
///
/// The slot is only opened once the first byte has passed the magic check.
struct FirmwareSink<'a, S, P> {
    slot: &'a mut S,
    hasher: Md5,
    status: UpdateProgress,
    begun: bool,
    bad_magic: Option<u8>,
    progress: &'a mut P,
}

impl<S: FirmwareSlot, P: FnMut(UpdateProgress)> BodySink for FirmwareSink<'_, S, P> {
    async fn accept(&mut self, chunk: &[u8]) -> io::Result<ControlFlow<()>> {
        if !self.begun {
            let Some(&first) = chunk.first() else {
                return Ok(ControlFlow::Continue(()));
            };
            if first != FIRMWARE_MAGIC {
                self.bad_magic = Some(first);
                return Ok(ControlFlow::Break(()));
            }
            self.slot.begin(self.status.total.unwrap_or_default()).await?;
            self.begun = true;
        }
        self.hasher.update(chunk);
        self.slot.write(chunk).await?;
        self.status.received += chunk.len() as u64;
        (self.progress)(self.status);
        Ok(ControlFlow::Continue(()))
    }

    fn on_tick(&mut self) {
        (self.progress)(self.status);
    }
}

struct StagingSink<'a, P> {
    staged: StagedFile,
    status: UpdateProgress,
    progress: &'a mut P,
}

impl<P: FnMut(UpdateProgress)> BodySink for StagingSink<'_, P> {
    async fn accept(&mut self, chunk: &[u8]) -> io::Result<ControlFlow<()>> {
        self.staged.write(chunk).await?;
        self.status.received += chunk.len() as u64;
        (self.progress)(self.status);
        Ok(ControlFlow::Continue(()))
    }

    fn on_tick(&mut self) {
        (self.progress)(self.status);
    }
}

/// Asset names are used as file names inside the bundle directory.
fn safe_file_name(name: &str) -> bool {
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    ) && !name.contains('\\')
}

/// Release checker and applier.
#[derive(Debug)]
pub struct Updater<C> {
    http: HttpClient<C>,
    config: ReleaseConfig,
    phase: UpdatePhase,
}

impl<C: Connector> Updater<C> {
    pub fn new(connector: C, config: ReleaseConfig) -> Self {
        let http = HttpClient::new(connector, config.http.clone());
        Self {
            http,
            config,
            phase: UpdatePhase::Idle,
        }
    }

    pub fn config(&self) -> &ReleaseConfig {
        &self.config
    }

    pub fn phase(&self) -> UpdatePhase {
        self.phase
    }

    fn enter(&mut self, phase: UpdatePhase) {
        debug!(from = ?self.phase, to = ?phase, "update phase");
        self.phase = phase;
    }

    /// Identity headers the release host expects on every request.
    fn identify(&self, request: Request) -> Request {
        let request = request
            .with_header("user-agent", USER_AGENT)
            .with_header("X-GitHub-Api-Version", API_VERSION);
        match &self.config.token {
            Some(token) => request.with_header("Authorization", format!("Bearer {token}")),
            None => request,
        }
    }

    /// Fetch the latest release's metadata.
    pub async fn check_latest(&mut self) -> Result<ReleaseInfo, UpdateError> {
        self.enter(UpdatePhase::FetchingMetadata);
        let request = self
            .identify(Request::get(&self.config.latest_release_url())?)
            .with_header("Accept", "application/vnd.github+json");
        let response = self.http.send(&request).await?;

        let mut stream = JsonStream::new(ReleaseListener::new());
        let mut ignore = |_: Progress| {};
        response
            .read_body(&mut ProgressSink::new(&mut stream, &mut ignore))
            .await?;

        let release = stream.into_listener().into_release();
        if release.tag.is_empty() {
            return Err(UpdateError::NoTag);
        }
        info!(tag = %release.tag, assets = release.assets.len(), "latest release");
        Ok(release)
    }

    /// Apply the release's firmware image if it is newer than `running`.
    ///
    /// `progress` is called as the image arrives and on every tick while
    /// the download is stalled.
    pub async fn update_firmware<S: FirmwareSlot, P: FnMut(UpdateProgress)>(
        &mut self,
        release: &ReleaseInfo,
        running: Version,
        slot: &mut S,
        mut progress: P,
    ) -> Result<UpdateOutcome, UpdateError> {
        let available = release.firmware_version();
        if !available.is_newer_than(&running) {
            self.enter(UpdatePhase::NoUpdateAvailable);
            debug!(%running, %available, "firmware up to date");
            return Ok(UpdateOutcome::UpToDate);
        }
        let asset = release
            .asset(FIRMWARE_ASSET)
            .ok_or_else(|| UpdateError::NoAsset(FIRMWARE_ASSET.to_string()))?;
        self.enter(UpdatePhase::AssetFound);
        info!(%running, %available, "firmware update available");

        self.download_firmware(asset, slot, &mut progress).await?;
        Ok(UpdateOutcome::Applied(available))
    }

    /// Apply the release's web bundle into `dir` if it is newer than the
    /// version recorded in `marker`.
    ///
    /// Every non-firmware asset is applied in turn; the marker is only
    /// rewritten once all of them have been.
    pub async fn update_web_bundle<P: FnMut(UpdateProgress)>(
        &mut self,
        release: &ReleaseInfo,
        dir: &Path,
        marker: &Path,
        mut progress: P,
    ) -> Result<UpdateOutcome, UpdateError> {
        let running = read_version_marker(marker).await?.unwrap_or_default();
        let available = match release.web_bundle_version() {
            Some(available) if available.is_newer_than(&running) => available,
            _ => {
                self.enter(UpdatePhase::NoUpdateAvailable);
                debug!(%running, "web bundle up to date");
                return Ok(UpdateOutcome::UpToDate);
            }
        };
        self.enter(UpdatePhase::AssetFound);
        info!(%running, %available, "web bundle update available");

        let assets: Vec<&Asset> = release.web_assets().collect();
        if let Some(refused) = assets.iter().find(|a| !safe_file_name(&a.name)) {
            return Err(UpdateError::UnsafeName(refused.name.clone()));
        }
        for (index, asset) in assets.iter().enumerate() {
            let target = dir.join(&asset.name);
            self.stage_asset(asset, &target, (index + 1, assets.len()), &mut progress)
                .await?;
        }
        write_version_marker(marker, available).await?;
        info!(%available, "web bundle applied");
        Ok(UpdateOutcome::Applied(available))
    }

    /// Download `asset` over `target` through a verified staging file.
    ///
    /// On any failure the target is left as it was.
    pub async fn download_asset<P: FnMut(UpdateProgress)>(
        &mut self,
        asset: &Asset,
        target: &Path,
        mut progress: P,
    ) -> Result<(), UpdateError> {
        self.stage_asset(asset, target, (1, 1), &mut progress).await
    }

    async fn stage_asset<P: FnMut(UpdateProgress)>(
        &mut self,
        asset: &Asset,
        target: &Path,
        (file, files): (usize, usize),
        progress: &mut P,
    ) -> Result<(), UpdateError> {
        self.enter(UpdatePhase::Downloading);
        let response = self.fetch(asset).await?;
        let expected = self.expected_digest(&asset.name, &response.headers)?;

        let status = UpdateProgress::start(file, files, response.headers.content_length);
        progress(status);
        let mut sink = StagingSink {
            staged: StagedFile::create(target).await?,
            status,
            progress,
        };
        let result = response
            .with_body_timeout(self.config.download_timeout)
            .read_body(&mut sink)
            .await;
        let received = match result {
            Ok(received) => received,
            Err(e) => {
                sink.staged.discard().await;
                return Err(e.into());
            }
        };
        let staged = sink.staged.close().await?;

        self.enter(UpdatePhase::Verifying);
        let actual = match staged.md5_hex().await {
            Ok(actual) => actual,
            Err(e) => {
                staged.discard().await;
                return Err(e.into());
            }
        };
        if let Some(expected) = expected {
            if !expected.eq_ignore_ascii_case(&actual) {
                staged.discard().await;
                self.enter(UpdatePhase::VerificationFailed);
                warn!(asset = %asset.name, %expected, %actual, "digest mismatch");
                return Err(UpdateError::DigestMismatch {
                    asset: asset.name.clone(),
                    expected,
                    actual,
                });
            }
        }

        self.enter(UpdatePhase::Applying);
        staged.commit().await?;
        self.enter(UpdatePhase::Applied);
        info!(asset = %asset.name, bytes = received, file, files, "asset applied");
        Ok(())
    }

    /// Stream a firmware image into `slot`, committing only on a digest match.
    pub async fn download_firmware<S: FirmwareSlot, P: FnMut(UpdateProgress)>(
        &mut self,
        asset: &Asset,
        slot: &mut S,
        mut progress: P,
    ) -> Result<(), UpdateError> {
        let response = self.fetch(asset).await?;
        let size = response
            .headers
            .content_length
            .filter(|&n| n > 0)
            .ok_or(UpdateError::UnknownSize)?;
        if size > slot.available() {
            return Err(UpdateError::InsufficientSpace {
                needed: size,
                available: slot.available(),
            });
        }
        let expected = self.expected_digest(&asset.name, &response.headers)?;

        self.enter(UpdatePhase::Downloading);
        let status = UpdateProgress::start(1, 1, Some(size));
        progress(status);
        let mut sink = FirmwareSink {
            slot,
            hasher: Md5::new(),
            status,
            begun: false,
            bad_magic: None,
            progress: &mut progress,
        };
        let result = response
            .with_body_timeout(self.config.download_timeout)
            .read_body(&mut sink)
            .await;

        // A chunked body carries its own framing, so the announced size is
        // checked here rather than by the transport.
        let received = sink.status.received;
        let failure = match result {
            Err(e) => Some(UpdateError::from(e)),
            Ok(_) => match sink.bad_magic {
                Some(byte) => Some(UpdateError::BadMagic(byte)),
                None if received != size => Some(UpdateError::Truncated {
                    expected: size,
                    received,
                }),
                None => None,
            },
        };
        if let Some(e) = failure {
            if sink.begun {
                sink.slot.abort().await;
            }
            warn!(received, size, error = %e, "firmware download failed");
            return Err(e);
        }

        self.enter(UpdatePhase::Verifying);
        let actual = hex::encode(sink.hasher.finalize());
        if let Some(expected) = expected {
            if !expected.eq_ignore_ascii_case(&actual) {
                sink.slot.abort().await;
                self.enter(UpdatePhase::VerificationFailed);
                warn!(%expected, %actual, "firmware digest mismatch");
                return Err(UpdateError::DigestMismatch {
                    asset: asset.name.clone(),
                    expected,
                    actual,
                });
            }
        }

        self.enter(UpdatePhase::Applying);
        sink.slot.commit().await?;
        self.enter(UpdatePhase::Applied);
        info!(bytes = size, "firmware applied");
        Ok(())
    }

    async fn fetch(&self, asset: &Asset) -> Result<Response<C::Stream>, UpdateError> {
        let request = self
            .identify(Request::get(&asset.url)?)
            .with_header("Accept", "application/octet-stream");
        let response = self.http.send(&request).await?;
        debug!(
            asset = %asset.name,
            from = %response.url,
            size = ?response.headers.content_length,
            "asset response"
        );
        Ok(response)
    }

    /// The hex digest to verify against, per the digest policy.
    fn expected_digest(
        &self,
        asset: &str,
        headers: &ResponseHeaders,
    ) -> Result<Option<String>, UpdateError> {
        match headers.md5_digest() {
            Some(digest) => Ok(Some(base64_to_hex(digest)?)),
            None => match self.config.digest_policy {
                DigestPolicy::Required => Err(UpdateError::MissingDigest {
                    asset: asset.to_string(),
                }),
                DigestPolicy::IfPresent => {
                    warn!(asset, "no digest supplied, applying unverified");
                    Ok(None)
                }
            },
        }
    }
}
