//! Incremental XML tokenizer.
//!
//! A byte-driven state machine that emits tag, text and attribute events
//! through an [`XmlListener`] without ever holding more than one token. It
//! understands only what the two rail endpoints actually send: no entity
//! decoding, no CDATA, no comments, no single-quoted attributes. Anything it
//! does not understand is skipped rather than reported.

use std::borrow::Cow;

/// Capacity of the token buffer. Bytes beyond this are dropped.
pub const TOKEN_CAPACITY: usize = 348;

/// Receives tokenizer events.
///
/// All methods default to no-ops so listeners only implement what they use.
pub trait XmlListener {
    /// An opening tag name, e.g. `lt4:std` for `<lt4:std>`.
    fn start_tag(&mut self, _name: &str) {}

    /// A closing tag name.
    ///
    /// Self-closing tags synthesize one. When the self-closing tag carried
    /// attributes the name is a single space, because the real name has
    /// already been overwritten by then.
    fn end_tag(&mut self, _name: &str) {}

    /// Text content with leading whitespace removed.
    fn text(&mut self, _value: &str) {}

    /// One raw attribute, e.g. `location="https://host/path"`.
    fn attribute(&mut self, _raw: &str) {}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    /// Waiting for the first `<`.
    Begin,
    /// Just seen `<`.
    StartTag,
    TagName,
    TagContents,
    EndTag,
    /// Inside `<name .../`, waiting for `>`.
    EmptyTag,
    Attribute,
}

/// The tokenizer state. Feed it one byte at a time.
///
/// # Examples
///
/// ```
/// use departures_core::xml::{XmlListener, XmlTokenizer};
///
/// #[derive(Default)]
/// struct Texts(Vec<String>);
///
/// impl XmlListener for Texts {
///     fn text(&mut self, value: &str) {
///         self.0.push(value.to_string());
///     }
/// }
///
/// let mut tokenizer = XmlTokenizer::new();
/// let mut texts = Texts::default();
/// for &b in b"<a><b>  hello</b></a>" {
///     tokenizer.feed(b, &mut texts);
/// }
/// assert_eq!(texts.0, ["hello"]);
/// ```
#[derive(Debug, Clone)]
pub struct XmlTokenizer {
    state: State,
    buffer: heapless::Vec<u8, TOKEN_CAPACITY>,
    in_quote: bool,
}

impl Default for XmlTokenizer {
    fn default() -> Self {
        Self::new()
    }
}

impl XmlTokenizer {
    pub fn new() -> Self {
        Self {
            state: State::Begin,
            buffer: heapless::Vec::new(),
            in_quote: false,
        }
    }

    /// Return to the initial state, discarding any partial token.
    pub fn reset(&mut self) {
        self.state = State::Begin;
        self.buffer.clear();
        self.in_quote = false;
    }

    /// Advance the state machine by one byte.
    pub fn feed<L: XmlListener + ?Sized>(&mut self, byte: u8, listener: &mut L) {
        match self.state {
            State::Begin => {
                if byte == b'<' {
                    self.enter(State::StartTag);
                }
            }
            State::StartTag => match byte {
                b'<' | b'>' => {}
                b if is_space(b) => {}
                b'/' => self.enter(State::EndTag),
                b => {
                    self.buffer.clear();
                    self.push(b);
                    self.state = State::TagName;
                }
            },
            State::TagName => {
                let next = match byte {
                    b if is_space(b) => State::Attribute,
                    b'/' => State::EmptyTag,
                    b'>' => State::TagContents,
                    b => {
                        self.push(b);
                        return;
                    }
                };
                if !self.buffer.is_empty() {
                    listener.start_tag(&self.token());
                }
                if next == State::EmptyTag {
                    // Keep the name for the synthesized end tag
                    self.state = next;
                } else {
                    self.enter(next);
                }
            }
            State::EmptyTag => {
                if byte == b'>' {
                    if !self.buffer.is_empty() {
                        listener.end_tag(&self.token());
                    }
                    self.enter(State::TagContents);
                }
            }
            State::TagContents => match byte {
                b'<' => {
                    if !self.buffer.is_empty() {
                        listener.text(&self.token());
                    }
                    self.enter(State::StartTag);
                }
                b if is_space(b) && self.buffer.is_empty() => {}
                b => self.push(b),
            },
            State::Attribute => self.attribute_byte(byte, listener),
            State::EndTag => match byte {
                b'<' => {}
                b if is_space(b) => {}
                b'>' => {
                    if !self.buffer.is_empty() {
                        listener.end_tag(&self.token());
                    }
                    self.enter(State::TagContents);
                }
                b => self.push(b),
            },
        }
    }

    fn attribute_byte<L: XmlListener + ?Sized>(&mut self, byte: u8, listener: &mut L) {
        match byte {
            b'"' => {
                self.in_quote = !self.in_quote;
                self.push(b'"');
            }
            b if is_space(b) => {
                if self.in_quote {
                    self.push(b);
                } else if !self.buffer.is_empty() {
                    self.emit_attribute(listener);
                    self.enter(State::Attribute);
                }
            }
            b'/' if !self.in_quote => {
                if !self.buffer.is_empty() {
                    listener.attribute(&self.token());
                }
                self.buffer.clear();
                self.push(b' ');
                self.state = State::EmptyTag;
            }
            b'>' if !self.in_quote => {
                self.emit_attribute(listener);
                self.enter(State::TagContents);
            }
            b => self.push(b),
        }
    }

    fn emit_attribute<L: XmlListener + ?Sized>(&mut self, listener: &mut L) {
        if !self.buffer.is_empty() {
            self.in_quote = false;
            listener.attribute(&self.token());
        }
    }

    /// Switch state, starting with an empty buffer.
    fn enter(&mut self, state: State) {
        self.state = state;
        self.buffer.clear();
    }

    fn push(&mut self, byte: u8) {
        // Overflow is dropped
        let _ = self.buffer.push(byte);
    }

    fn token(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.buffer)
    }
}

fn is_space(b: u8) -> bool {
    matches!(b, b' ' | b'\r' | b'\n' | b'\t')
}

/// A tokenizer bound to its listener.
///
/// This is the usual way to drive a mapper: construct one per document,
/// feed it the body as it arrives, then take the listener back.
#[derive(Debug)]
pub struct XmlStream<L> {
    tokenizer: XmlTokenizer,
    listener: L,
}

impl<L: XmlListener> XmlStream<L> {
    pub fn new(listener: L) -> Self {
        Self {
            tokenizer: XmlTokenizer::new(),
            listener,
        }
    }

    pub fn feed(&mut self, byte: u8) {
        self.tokenizer.feed(byte, &mut self.listener);
    }

    pub fn feed_slice(&mut self, bytes: &[u8]) {
        for &b in bytes {
            self.tokenizer.feed(b, &mut self.listener);
        }
    }

    /// Reset the tokenizer. The listener is left as it is.
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
