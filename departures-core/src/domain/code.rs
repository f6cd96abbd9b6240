//! Stable result codes reported to the display layer.

use std::fmt;

/// Outcome of a board refresh, as a stable integer.
///
/// The display distinguishes "no data yet" from "had data, poll failed"
/// from "credentials rejected" using these codes, so the numeric values
/// must never change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum UpdateCode {
    Success = 0,
    Incomplete = 1,
    Unauthorized = 2,
    HttpError = 3,
    Timeout = 4,
    NoResponse = 5,
    DataError = 6,
    NoChange = 7,
}

impl UpdateCode {
    /// The stable integer value.
    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    /// Look up a code by its integer value.
    pub const fn from_u8(n: u8) -> Option<Self> {
        Some(match n {
            0 => UpdateCode::Success,
            1 => UpdateCode::Incomplete,
            2 => UpdateCode::Unauthorized,
            3 => UpdateCode::HttpError,
            4 => UpdateCode::Timeout,
            5 => UpdateCode::NoResponse,
            6 => UpdateCode::DataError,
            7 => UpdateCode::NoChange,
            _ => return None,
        })
    }

    /// True for outcomes after which the board holds good data.
    pub const fn is_ok(self) -> bool {
        matches!(self, UpdateCode::Success | UpdateCode::NoChange)
    }
}

impl fmt::Display for UpdateCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            UpdateCode::Success => "success",
            UpdateCode::Incomplete => "incomplete data",
            UpdateCode::Unauthorized => "unauthorized",
            UpdateCode::HttpError => "HTTP error",
            UpdateCode::Timeout => "timeout",
            UpdateCode::NoResponse => "no response",
            UpdateCode::DataError => "data error",
            UpdateCode::NoChange => "no change",
        };
        f.write_str(s)
    }
}
