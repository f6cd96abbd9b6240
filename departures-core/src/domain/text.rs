//! Fixed-capacity text fields.
//!
//! Every string on a board lives in a stack-allocated buffer with a hard
//! capacity. Writes that would overflow are truncated at the last character
//! that fits; they never fail and never allocate.

use std::fmt;
use std::ops::Deref;

/// A bounded UTF-8 string holding at most `N` bytes.
///
/// # Examples
///
/// ```
/// use departures_core::domain::Text;
///
/// let mut platform: Text<3> = Text::new();
/// platform.set("10A");
/// assert_eq!(platform.as_str(), "10A");
///
/// // Overflow is truncated, not rejected
/// platform.set("Platform 7");
/// assert_eq!(platform.as_str(), "Pla");
/// ```
#[derive(Clone, Default, PartialEq, Eq, Hash)]
pub struct Text<const N: usize>(heapless::String<N>);

impl<const N: usize> Text<N> {
    /// Create an empty field.
    pub const fn new() -> Self {
        Self(heapless::String::new())
    }

    /// Create a field from `s`, truncating if needed.
    pub fn from_str_truncating(s: &str) -> Self {
        let mut text = Self::new();
        text.push_str(s);
        text
    }

    /// Replace the contents with `s`, truncating if needed.
    pub fn set(&mut self, s: &str) {
        self.0.clear();
        self.push_str(s);
    }

    /// Append as much of `s` as fits. Returns `true` if all of it fitted.
    pub fn push_str(&mut self, s: &str) -> bool {
        for c in s.chars() {
            if self.0.push(c).is_err() {
                return false;
            }
        }
        true
    }

    /// Append a single character if it fits.
    pub fn push(&mut self, c: char) -> bool {
        self.0.push(c).is_ok()
    }

    /// Clear the contents.
    pub fn clear(&mut self) {
        self.0.clear();
    }

    /// Rewrite the contents through `f`, truncating the result if needed.
    pub fn rewrite(&mut self, f: impl FnOnce(&str) -> String) {
        let rewritten = f(self.0.as_str());
        self.set(&rewritten);
    }

    /// Returns the contents as a string slice.
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// Maximum number of bytes this field holds.
    pub const fn capacity(&self) -> usize {
        N
    }

    /// Bytes still available.
    pub fn remaining(&self) -> usize {
        N - self.0.len()
    }
}

impl<const N: usize> Deref for Text<N> {
    type Target = str;

    fn deref(&self) -> &str {
        self.as_str()
    }
}

impl<const N: usize> fmt::Debug for Text<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self.as_str(), f)
    }
}

impl<const N: usize> fmt::Display for Text<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl<const N: usize> PartialEq<str> for Text<N> {
    fn eq(&self, other: &str) -> bool {
        self.as_str() == other
    }
}

impl<const N: usize> PartialEq<&str> for Text<N> {
    fn eq(&self, other: &&str) -> bool {
        self.as_str() == *other
    }
}

/// Parse the leading decimal integer of `s`, ignoring leading whitespace.
///
/// Returns 0 when no digits are present, matching how the upstream feeds
/// treat blank or non-numeric counts.
pub fn leading_int(s: &str) -> i64 {
    let s = s.trim_start();
    let (negative, digits) = match s.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, s.strip_prefix('+').unwrap_or(s)),
    };

    let mut value: i64 = 0;
    for b in digits.bytes().take_while(u8::is_ascii_digit) {
        value = value.saturating_mul(10).saturating_add(i64::from(b - b'0'));
    }

    if negative { -value } else { value }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_truncates_to_capacity() {
        let mut t: Text<5> = Text::new();
        t.set("12:345");
        assert_eq!(t.as_str(), "12:34");
        assert_eq!(t.remaining(), 0);
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        // "é" is two bytes; the third byte slot cannot hold the second "é"
        let t: Text<3> = Text::from_str_truncating("éé");
        assert_eq!(t.as_str(), "é");
    }

    #[test]
    fn push_str_reports_overflow() {
        let mut t: Text<4> = Text::new();
        assert!(t.push_str("ab"));
        assert!(!t.push_str("cde"));
        assert_eq!(t.as_str(), "abcd");
    }

    #[test]
    fn rewrite_applies_function() {
        let mut t: Text<16> = Text::from_str_truncating("a&amp;b");
        t.rewrite(|s| s.replace("&amp;", "&"));
        assert_eq!(t, "a&b");
    }

    #[test]
    fn leading_int_parses_prefix() {
        assert_eq!(leading_int("12"), 12);
        assert_eq!(leading_int(" 42s"), 42);
        assert_eq!(leading_int("-7"), -7);
        assert_eq!(leading_int(""), 0);
        assert_eq!(leading_int("abc"), 0);
    }
}
