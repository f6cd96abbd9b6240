//! Board time handling.
//!
//! Rail boards carry scheduled times as "HH:MM" strings. Ordering compares
//! them numerically (hours, then minutes) without any date awareness, so a
//! board spanning midnight sorts "00:05" before "23:55" exactly as the
//! device always has.

use super::text::leading_int;

/// Sort key for a scheduled-time field.
///
/// Lenient: reads `hours:minutes` as two leading integers, so "9:05" and
/// "09:05" compare equal and a missing minute part counts as zero.
///
/// ```
/// use departures_core::domain::schedule_sort_key;
///
/// assert!(schedule_sort_key("00:05") < schedule_sort_key("23:55"));
/// assert_eq!(schedule_sort_key("Delayed"), (0, 0));
/// ```
pub fn schedule_sort_key(s: &str) -> (i64, i64) {
    match s.split_once(':') {
        Some((h, m)) => (leading_int(h), leading_int(m)),
        None => (leading_int(s), 0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sort_key_is_lenient() {
        assert_eq!(schedule_sort_key("09:05"), (9, 5));
        assert_eq!(schedule_sort_key("9:05"), (9, 5));
        assert!(schedule_sort_key("10:00") > schedule_sort_key("9:59"));
        assert_eq!(schedule_sort_key("12"), (12, 0));
    }

    #[test]
    fn ordering_is_numeric() {
        let mut times = ["10:00", "09:59", "23:55", "00:05", "9:30"];
        times.sort_by_key(|t| schedule_sort_key(t));
        assert_eq!(times, ["00:05", "9:30", "09:59", "10:00", "23:55"]);
    }
}
