//! Over-the-air updates from a release host.
//!
//! The latest release's metadata names a firmware image and the files of a
//! web bundle. Each is downloaded through a staging area, checked against
//! the MD5 digest the host sends with it, and only then put in place.

mod digest;
mod error;
mod pipeline;
mod release;
mod storage;

pub use digest::{DigestError, base64_to_hex, file_md5_hex, md5_base64, md5_hex};
pub use error::UpdateError;
pub use pipeline::{
    DEFAULT_REPO, DigestPolicy, FIRMWARE_MAGIC, ReleaseConfig, UpdateOutcome, UpdatePhase,
    UpdateProgress, Updater,
};
pub use release::{Asset, FIRMWARE_ASSET, MAX_ASSETS, ReleaseInfo, ReleaseListener};
pub use storage::{
    FileSlot, FirmwareSlot, Staged, StagedFile, read_version_marker, staging_path,
    write_version_marker,
};
