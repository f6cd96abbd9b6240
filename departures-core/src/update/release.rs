//! Latest-release metadata.

use tracing::debug;

use crate::domain::Version;
use crate::feed::EntryCount;
use crate::json::{JsonListener, JsonPath};

/// Assets recorded per release; later ones are ignored.
pub const MAX_ASSETS: usize = 16;

/// Name of the firmware image asset.
pub const FIRMWARE_ASSET: &str = "firmware.bin";

/// One downloadable release asset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Asset {
    pub name: String,
    /// API URL of the asset; fetching it with an octet-stream `Accept`
    /// redirects to the content.
    pub url: String,
}

impl Asset {
    /// Firmware images end in `.bin`; everything else is web bundle content.
    pub fn is_firmware_image(&self) -> bool {
        self.name.ends_with(".bin")
    }
}

/// What the release host says about the latest release.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReleaseInfo {
    pub tag: String,
    pub description: String,
    pub assets: heapless::Vec<Asset, MAX_ASSETS>,
}

impl ReleaseInfo {
    pub fn firmware_version(&self) -> Version {
        Version::firmware_from_tag(&self.tag)
    }

    pub fn web_bundle_version(&self) -> Option<Version> {
        Version::web_bundle_from_tag(&self.tag)
    }

    pub fn asset(&self, name: &str) -> Option<&Asset> {
        self.assets.iter().find(|a| a.name == name)
    }

    /// The web bundle: every asset that is not a firmware image.
    pub fn web_assets(&self) -> impl Iterator<Item = &Asset> {
        self.assets.iter().filter(|a| !a.is_firmware_image())
    }
}

/// Streaming listener for the latest-release document.
///
/// The release title is the `name` outside the `assets` array. Inside it,
/// each asset's `url` and `name` are paired up; the `uploader` object nested
/// in every asset has its own `url`, which is skipped.
#[derive(Debug, Default)]
pub struct ReleaseListener {
    path: JsonPath,
    release: ReleaseInfo,
    asset_url: String,
    asset_name: String,
}

impl ReleaseListener {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn into_release(self) -> ReleaseInfo {
        debug!(
            tag = %self.release.tag,
            assets = self.release.assets.len(),
            "release metadata mapped"
        );
        self.release
    }

    fn in_asset(&self) -> bool {
        self.path.inside_array("assets") && !self.path.inside_object("uploader")
    }
}

impl JsonListener for ReleaseListener {
    fn key(&mut self, key: &str) {
        self.path.key(key);
    }

    fn value(&mut self, value: &str) {
        match self.path.current_key() {
            "tag_name" => self.release.tag = value.to_string(),
            "name" if !self.path.inside_array("assets") => {
                self.release.description = value.to_string();
            }
            "url" if self.in_asset() => self.asset_url = value.to_string(),
            "name" if self.in_asset() => self.asset_name = value.to_string(),
            _ => {}
        }

        if !self.asset_url.is_empty() && !self.asset_name.is_empty() {
            let asset = Asset {
                name: std::mem::take(&mut self.asset_name),
                url: std::mem::take(&mut self.asset_url),
            };
            if self.release.assets.push(asset).is_err() {
                debug!("asset dropped, release full");
            }
        }
    }

    fn start_object(&mut self) {
        self.path.start_object();
    }

    fn end_object(&mut self) {
        self.path.end_object();
    }

    fn start_array(&mut self) {
        self.path.start_array();
    }

    fn end_array(&mut self) {
        self.path.end_array();
    }
}

impl EntryCount for ReleaseListener {
    fn entries(&self) -> usize {
        self.release.assets.len()
    }
}
