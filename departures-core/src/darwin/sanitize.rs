//! Text clean-up for rail board fields.
//!
//! The feed carries HTML fragments with entity-escaped markup inside some
//! fields. These helpers reduce them to plain display text.

/// Remove everything between `<` and `>`, inclusive.
///
/// # Examples
///
/// ```
/// use departures_core::darwin::sanitize::strip_tags;
///
/// assert_eq!(strip_tags("<b>Reading</b> only"), "Reading only");
/// ```
pub fn strip_tags(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut in_tag = false;
    for c in input.chars() {
        match c {
            '<' => in_tag = true,
            '>' => in_tag = false,
            c if !in_tag => out.push(c),
            _ => {}
        }
    }
    out
}

/// Keep only printable ASCII.
pub fn printable_ascii(input: &str) -> String {
    input.chars().filter(|c| matches!(c, ' '..='~')).collect()
}

/// Cut `input` at the first occurrence of `phrase`.
pub fn prune_from<'a>(input: &'a str, phrase: &str) -> &'a str {
    match input.find(phrase) {
        Some(pos) => &input[..pos],
        None => input,
    }
}

/// End non-empty text with exactly one full stop.
///
/// Trailing full stops and spaces are removed first. The stop is only
/// added if the result still fits in `capacity` bytes.
pub fn fix_full_stop(input: &str, capacity: usize) -> String {
    let trimmed = input.trim_end_matches(['.', ' ']);
    let mut out = trimmed.to_string();
    if !out.is_empty() && out.len() < capacity {
        out.push('.');
    }
    out
}

/// Destination, via and calling-point text.
pub fn clean_location(input: &str) -> String {
    strip_tags(input).replace("&amp;", "&")
}

/// Delay and cancellation reasons.
pub fn clean_service_message(input: &str, capacity: usize) -> String {
    let text = strip_tags(input)
        .replace("&amp;", "&")
        .replace("&quot;", "\"");
    fix_full_stop(&text, capacity)
}

/// Station-wide messages, which arrive as escaped HTML paragraphs with a
/// boilerplate tail pointing at the operator's website.
///
/// # Examples
///
/// ```
/// use departures_core::darwin::sanitize::clean_board_message;
///
/// let raw = "&lt;p&gt;Lifts out of order at Reading.&lt;/p&gt; More details can be found online";
/// assert_eq!(clean_board_message(raw, 399), "Lifts out of order at Reading.");
/// ```
pub fn clean_board_message(input: &str, capacity: usize) -> String {
    let text = printable_ascii(input)
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("<p>", "")
        .replace("</p>", "")
        .replace("<br>", " ");
    let text = strip_tags(&text)
        .replace("&amp;", "&")
        .replace("&quot;", "\"");
    let text = prune_from(&text, " More details ");
    let text = prune_from(text, " Latest information can be found");
    fix_full_stop(text, capacity)
}
