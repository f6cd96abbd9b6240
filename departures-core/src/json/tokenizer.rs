//! Incremental JSON tokenizer.
//!
//! Byte-fed and event-driven. Strings are unescaped; numbers and the
//! literals `true`, `false` and `null` are delivered as their raw text. The
//! tokenizer is forgiving: it does not validate structure, so a stray comma
//! or a missing colon is absorbed rather than reported.

/// Capacity of the token buffer. Longer strings are truncated.
pub const TOKEN_CAPACITY: usize = 512;

/// Containers tracked individually. Deeper nesting is only counted.
pub const MAX_DEPTH: usize = 24;

/// Receives tokenizer events.
pub trait JsonListener {
    /// An object key. The next value or container belongs to it.
    fn key(&mut self, _key: &str) {}

    /// A scalar value: an unescaped string or the raw text of a literal.
    fn value(&mut self, _value: &str) {}

    fn start_object(&mut self) {}
    fn end_object(&mut self) {}
    fn start_array(&mut self) {}
    fn end_array(&mut self) {}

    /// Returning `true` tells the driver that nothing more is wanted.
    fn is_done(&self) -> bool {
        false
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Container {
    Object,
    Array,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    /// Skipping anything before the first `{` or `[`.
    Seeking,
    Structure,
    InString,
    Escape,
    /// Reading the hex digits of a `\u` escape.
    Unicode { code: u32, digits: u8 },
    Literal,
    /// The root container has closed.
    Finished,
}

/// The tokenizer state.
///
/// # Examples
///
/// ```
/// use departures_core::json::{JsonListener, JsonTokenizer};
///
/// #[derive(Default)]
/// struct Pairs(Vec<(String, String)>, String);
///
/// impl JsonListener for Pairs {
///     fn key(&mut self, key: &str) {
///         self.1 = key.to_string();
///     }
///     fn value(&mut self, value: &str) {
///         self.0.push((self.1.clone(), value.to_string()));
///     }
/// }
///
/// let mut tokenizer = JsonTokenizer::new();
/// let mut pairs = Pairs::default();
/// for &b in br#"HTTP junk {"a": "x\ny", "b": 42}"# {
///     tokenizer.feed(b, &mut pairs);
/// }
/// let expected = vec![
///     ("a".to_string(), "x\ny".to_string()),
///     ("b".to_string(), "42".to_string()),
/// ];
/// assert_eq!(pairs.0, expected);
/// ```
#[derive(Debug, Clone)]
pub struct JsonTokenizer {
    state: State,
    buffer: heapless::Vec<u8, TOKEN_CAPACITY>,
    stack: heapless::Vec<Container, MAX_DEPTH>,
    /// Containers opened beyond `MAX_DEPTH`.
    overflow: usize,
    expect_key: bool,
    string_is_key: bool,
    pending_high: Option<u32>,
}

impl Default for JsonTokenizer {
    fn default() -> Self {
        Self::new()
    }
}

impl JsonTokenizer {
    pub fn new() -> Self {
        Self {
            state: State::Seeking,
            buffer: heapless::Vec::new(),
            stack: heapless::Vec::new(),
            overflow: 0,
            expect_key: false,
            string_is_key: false,
            pending_high: None,
        }
    }

    /// Return to the initial state.
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// True once the root container has closed.
    pub fn is_finished(&self) -> bool {
        self.state == State::Finished
    }

    /// Current container depth.
    pub fn depth(&self) -> usize {
        self.stack.len() + self.overflow
    }

    /// Advance by one byte.
    pub fn feed<L: JsonListener + ?Sized>(&mut self, byte: u8, listener: &mut L) {
        match self.state {
            State::Seeking => {
                if byte == b'{' || byte == b'[' {
                    self.state = State::Structure;
                    self.structure(byte, listener);
                }
            }
            State::Structure => self.structure(byte, listener),
            State::InString => match byte {
                b'"' => {
                    self.flush_surrogate();
                    let token = String::from_utf8_lossy(&self.buffer).into_owned();
                    if self.string_is_key {
                        listener.key(&token);
                    } else {
                        listener.value(&token);
                    }
                    self.buffer.clear();
                    self.state = State::Structure;
                }
                b'\\' => self.state = State::Escape,
                b => {
                    self.flush_surrogate();
                    self.push(b);
                }
            },
            State::Escape => {
                self.state = State::InString;
                let c = match byte {
                    b'u' => {
                        self.state = State::Unicode { code: 0, digits: 0 };
                        return;
                    }
                    b'b' => '\u{08}',
                    b'f' => '\u{0C}',
                    b'n' => '\n',
                    b'r' => '\r',
                    b't' => '\t',
                    other => char::from(other),
                };
                self.flush_surrogate();
                self.push_char(c);
            }
            State::Unicode { code, digits } => {
                let Some(nibble) = char::from(byte).to_digit(16) else {
                    // Malformed escape: keep what follows as ordinary text
                    self.push_char(char::REPLACEMENT_CHARACTER);
                    self.state = State::InString;
                    self.feed(byte, listener);
                    return;
                };
                let code = (code << 4) | nibble;
                if digits < 3 {
                    self.state = State::Unicode {
                        code,
                        digits: digits + 1,
                    };
                } else {
                    self.state = State::InString;
                    self.code_point(code);
                }
            }
            State::Literal => match byte {
                b',' | b'}' | b']' | b':' => {
                    self.emit_literal(listener);
                    self.structure(byte, listener);
                }
                b if b.is_ascii_whitespace() => self.emit_literal(listener),
                b => self.push(b),
            },
            State::Finished => {}
        }
    }

    fn structure<L: JsonListener + ?Sized>(&mut self, byte: u8, listener: &mut L) {
        self.state = State::Structure;
        match byte {
            b'{' => {
                listener.start_object();
                self.open(Container::Object);
                self.expect_key = true;
            }
            b'[' => {
                listener.start_array();
                self.open(Container::Array);
                self.expect_key = false;
            }
            b'}' => {
                self.close();
                listener.end_object();
                self.after_close();
            }
            b']' => {
                self.close();
                listener.end_array();
                self.after_close();
            }
            b':' => self.expect_key = false,
            b',' => self.expect_key = self.top() == Some(Container::Object),
            b'"' => {
                self.string_is_key = self.expect_key && self.top() == Some(Container::Object);
                self.buffer.clear();
                self.state = State::InString;
            }
            b if b.is_ascii_whitespace() => {}
            b => {
                self.buffer.clear();
                self.push(b);
                self.state = State::Literal;
            }
        }
    }

    fn open(&mut self, container: Container) {
        if self.overflow > 0 || self.stack.push(container).is_err() {
            self.overflow += 1;
        }
    }

    fn close(&mut self) {
        if self.overflow > 0 {
            self.overflow -= 1;
        } else {
            self.stack.pop();
        }
    }

    fn after_close(&mut self) {
        self.expect_key = false;
        if self.depth() == 0 {
            self.state = State::Finished;
        }
    }

    /// Innermost tracked container. Untracked levels borrow the deepest
    /// known kind.
    fn top(&self) -> Option<Container> {
        self.stack.last().copied()
    }

    fn emit_literal<L: JsonListener + ?Sized>(&mut self, listener: &mut L) {
        let token = String::from_utf8_lossy(&self.buffer).into_owned();
        listener.value(&token);
        self.buffer.clear();
        self.state = State::Structure;
    }

    fn code_point(&mut self, code: u32) {
        match code {
            0xD800..=0xDBFF => {
                self.flush_surrogate();
                self.pending_high = Some(code);
            }
            0xDC00..=0xDFFF => match self.pending_high.take() {
                Some(high) => {
                    let combined = 0x10000 + ((high - 0xD800) << 10) + (code - 0xDC00);
                    self.push_char(char::from_u32(combined).unwrap_or(char::REPLACEMENT_CHARACTER));
                }
                None => self.push_char(char::REPLACEMENT_CHARACTER),
            },
            _ => {
                self.flush_surrogate();
                self.push_char(char::from_u32(code).unwrap_or(char::REPLACEMENT_CHARACTER));
            }
        }
    }

    /// A high surrogate not followed by a low one decodes as U+FFFD.
    fn flush_surrogate(&mut self) {
        if self.pending_high.take().is_some() {
            self.push_char(char::REPLACEMENT_CHARACTER);
        }
    }

    fn push(&mut self, byte: u8) {
        let _ = self.buffer.push(byte);
    }

    fn push_char(&mut self, c: char) {
        let mut utf8 = [0u8; 4];
        let encoded = c.encode_utf8(&mut utf8).as_bytes();
        if self.buffer.capacity() - self.buffer.len() >= encoded.len() {
            let _ = self.buffer.extend_from_slice(encoded);
        }
    }

}

/// A tokenizer bound to its listener.
#[derive(Debug)]
pub struct JsonStream<L> {
    tokenizer: JsonTokenizer,
    listener: L,
}

impl<L: JsonListener> JsonStream<L> {
    pub fn new(listener: L) -> Self {
        Self {
            tokenizer: JsonTokenizer::new(),
            listener,
        }
    }

    pub fn feed(&mut self, byte: u8) {
        self.tokenizer.feed(byte, &mut self.listener);
    }

    /// Feed bytes until the listener reports it is done.
    pub fn feed_slice(&mut self, bytes: &[u8]) {
        for &b in bytes {
            if self.is_done() {
                return;
            }
            self.tokenizer.feed(b, &mut self.listener);
        }
    }

    /// True when the document has closed or the listener wants no more.
    pub fn is_done(&self) -> bool {
        self.tokenizer.is_finished() || self.listener.is_done()
    }

    pub fn reset(&mut self) {
        self.tokenizer.reset();
    }

    pub fn listener(&self) -> &L {
        &self.listener
    }

    pub fn listener_mut(&mut self) -> &mut L {
        &mut self.listener
    }

    pub fn into_listener(self) -> L {
        self.listener
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Event {
        Key(String),
        Value(String),
        StartObject,
        EndObject,
        StartArray,
        EndArray,
    }

    #[derive(Default)]
    struct Recorder(Vec<Event>);

    impl JsonListener for Recorder {
        fn key(&mut self, key: &str) {
            self.0.push(Event::Key(key.to_string()));
        }
        fn value(&mut self, value: &str) {
            self.0.push(Event::Value(value.to_string()));
        }
        fn start_object(&mut self) {
            self.0.push(Event::StartObject);
        }
        fn end_object(&mut self) {
            self.0.push(Event::EndObject);
        }
        fn start_array(&mut self) {
            self.0.push(Event::StartArray);
        }
        fn end_array(&mut self) {
            self.0.push(Event::EndArray);
        }
    }

    fn events(input: &str) -> Vec<Event> {
        let mut stream = JsonStream::new(Recorder::default());
        stream.feed_slice(input.as_bytes());
        stream.into_listener().0
    }

    fn key(s: &str) -> Event {
        Event::Key(s.to_string())
    }
    fn value(s: &str) -> Event {
        Event::Value(s.to_string())
    }

    #[test]
    fn object_with_mixed_values() {
        use Event::*;
        assert_eq!(
            events(r#"{"a": 1, "b": [true, null, "x"], "c": {"d": -2.5e3}}"#),
            [
                StartObject,
                key("a"),
                value("1"),
                key("b"),
                StartArray,
                value("true"),
                value("null"),
                value("x"),
                EndArray,
                key("c"),
                StartObject,
                key("d"),
                value("-2.5e3"),
                EndObject,
                EndObject,
            ]
        );
    }

    #[test]
    fn strings_in_arrays_are_values() {
        use Event::*;
        assert_eq!(
            events(r#"[{"k":"v"},"w"]"#),
            [StartArray, StartObject, key("k"), value("v"), EndObject, value("w"), EndArray]
        );
    }

    #[test]
    fn escapes_are_decoded() {
        let ev = events(r#"{"s": "a\"b\\c\/d\te\u00e9\ud83d\ude86"}"#);
        assert_eq!(ev[2], value("a\"b\\c/d\te\u{e9}\u{1F686}"));
    }

    #[test]
    fn lone_surrogate_becomes_replacement() {
        let ev = events(r#"{"s": "x\ud83dy"}"#);
        assert_eq!(ev[2], value("x\u{FFFD}y"));
    }

    #[test]
    fn preamble_is_skipped() {
        use Event::*;
        assert_eq!(
            events("1a3\r\n{\"k\":2}"),
            [StartObject, key("k"), value("2"), EndObject]
        );
    }

    #[test]
    fn nothing_after_root_closes() {
        use Event::*;
        assert_eq!(events("{}{\"k\":1}"), [StartObject, EndObject]);
    }

    #[test]
    fn long_strings_truncate() {
        let long = "y".repeat(TOKEN_CAPACITY + 10);
        let ev = events(&format!(r#"{{"k":"{long}"}}"#));
        assert_eq!(ev[2], value(&"y".repeat(TOKEN_CAPACITY)));
    }

    #[test]
    fn deep_nesting_is_counted() {
        let doc = format!("{}{}", "[".repeat(MAX_DEPTH + 5), "]".repeat(MAX_DEPTH + 5));
        let mut tokenizer = JsonTokenizer::new();
        let mut rec = Recorder::default();
        for &b in doc.as_bytes() {
            tokenizer.feed(b, &mut rec);
        }
        assert!(tokenizer.is_finished());
        assert_eq!(tokenizer.depth(), 0);
    }

    struct StopAfter(usize, usize);

    impl JsonListener for StopAfter {
        fn value(&mut self, _value: &str) {
            self.0 += 1;
        }
        fn is_done(&self) -> bool {
            self.0 >= self.1
        }
    }

    #[test]
    fn listener_can_stop_the_stream() {
        let mut stream = JsonStream::new(StopAfter(0, 2));
        stream.feed_slice(br#"[1,2,3,4,5]"#);
        assert!(stream.is_done());
        assert_eq!(stream.listener().0, 2);
    }

    proptest! {
        #[test]
        fn chunking_does_not_change_events(
            values in proptest::collection::vec("[a-zA-Z0-9 ]{0,12}", 0..6),
            cut in 0usize..400,
        ) {
            let body: Vec<String> = values.iter().enumerate().map(|(i, v)| format!(r#""k{i}": "{v}""#)).collect();
            let doc = format!("{{{}}}", body.join(", "));
            let whole = events(&doc);

            let cut = cut % (doc.len() + 1);
            let mut stream = JsonStream::new(Recorder::default());
            stream.feed_slice(&doc.as_bytes()[..cut]);
            stream.feed_slice(&doc.as_bytes()[cut..]);
            prop_assert_eq!(stream.into_listener().0, whole);
        }
    }
}
