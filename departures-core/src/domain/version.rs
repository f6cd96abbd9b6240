//! Release version numbers.
//!
//! Release tags look like `v1.2-W1.3`: the part before the dash is the
//! firmware version, the part after `-W` is the web bundle version. Parsing
//! is deliberately lenient: each component is the leading integer of its
//! segment, and a missing component reads as zero.

use std::fmt;
use std::str::FromStr;

use super::text::leading_int;

/// A `(major, minor)` version.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Version {
    pub major: u32,
    pub minor: u32,
}

impl Version {
    pub const fn new(major: u32, minor: u32) -> Self {
        Self { major, minor }
    }

    /// Parse `"major.minor"`, tolerating a leading `v` and trailing text.
    ///
    /// # Examples
    ///
    /// ```
    /// use departures_core::domain::Version;
    ///
    /// assert_eq!(Version::parse_lenient("v2.1"), Version::new(2, 1));
    /// assert_eq!(Version::parse_lenient("2.0"), Version::new(2, 0));
    /// assert_eq!(Version::parse_lenient("3"), Version::new(3, 0));
    /// ```
    pub fn parse_lenient(s: &str) -> Self {
        let s = s.trim();
        let s = s.strip_prefix(['v', 'V']).unwrap_or(s);
        let (major, minor) = match s.split_once('.') {
            Some((major, rest)) => (major, rest),
            None => (s, ""),
        };
        Self {
            major: clamp(leading_int(major)),
            minor: clamp(leading_int(minor)),
        }
    }

    /// Firmware component of a release tag (`v1.2-W1.3` → 1.2).
    pub fn firmware_from_tag(tag: &str) -> Self {
        let firmware = tag.split_once('-').map_or(tag, |(head, _)| head);
        Self::parse_lenient(firmware)
    }

    /// Web bundle component of a release tag (`v1.2-W1.3` → 1.3).
    ///
    /// Returns `None` when the tag carries no bundle component.
    pub fn web_bundle_from_tag(tag: &str) -> Option<Self> {
        let (_, rest) = tag.split_once('-')?;
        let bundle = rest.trim_start_matches(|c: char| c.is_ascii_alphabetic());
        if bundle.is_empty() {
            return None;
        }
        Some(Self::parse_lenient(bundle))
    }

    /// True when `self` is a strictly later release than `running`.
    ///
    /// Compares major first, then minor.
    pub fn is_newer_than(&self, running: &Version) -> bool {
        (self.major, self.minor) > (running.major, running.minor)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

impl FromStr for Version {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::parse_lenient(s))
    }
}

fn clamp(n: i64) -> u32 {
    u32::try_from(n.max(0)).unwrap_or(u32::MAX)
}
