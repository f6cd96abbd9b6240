//! Key and container tracking for JSON listeners.

use crate::domain::Text;

/// Capacity of a tracked key or container name.
pub const NAME_LEN: usize = 32;

const MAX_FRAMES: usize = 16;

type Name = Text<NAME_LEN>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Object,
    Array,
}

#[derive(Debug, Clone)]
struct Frame {
    kind: Kind,
    name: Name,
}

/// Where a JSON listener currently is.
///
/// Each container is named after the key that introduced it. An object
/// directly inside an array takes the array's name, so every element of
/// `"assets": [...]` is an `assets` object.
///
/// # Examples
///
/// ```
/// use departures_core::json::JsonPath;
///
/// let mut path = JsonPath::new();
/// path.start_object();
/// path.key("assets");
/// path.start_array();
/// path.start_object();
/// path.key("uploader");
/// path.start_object();
///
/// assert_eq!(path.current_array(), "assets");
/// assert_eq!(path.current_object(), "uploader");
/// assert!(path.inside_array("assets"));
/// assert!(path.inside_object("uploader"));
///
/// path.end_object();
/// assert_eq!(path.current_object(), "assets");
/// ```
#[derive(Debug, Clone, Default)]
pub struct JsonPath {
    key: Name,
    frames: heapless::Vec<Frame, MAX_FRAMES>,
    /// Containers opened while `frames` was full.
    untracked: usize,
}

impl JsonPath {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn key(&mut self, key: &str) {
        self.key.set(key);
    }

    pub fn start_object(&mut self) {
        let name = match self.frames.last() {
            Some(Frame {
                kind: Kind::Array,
                name,
            }) if self.untracked == 0 => name.clone(),
            _ => self.key.clone(),
        };
        self.push(Kind::Object, name);
    }

    pub fn end_object(&mut self) {
        self.pop();
    }

    pub fn start_array(&mut self) {
        let name = self.key.clone();
        self.push(Kind::Array, name);
    }

    pub fn end_array(&mut self) {
        self.pop();
    }

    /// The most recent key.
    pub fn current_key(&self) -> &str {
        &self.key
    }

    /// Name of the innermost enclosing object, or `""` at the root.
    pub fn current_object(&self) -> &str {
        self.innermost(Kind::Object)
    }

    /// Name of the innermost enclosing array, or `""` outside any array.
    pub fn current_array(&self) -> &str {
        self.innermost(Kind::Array)
    }

    /// True if any enclosing array is named `name`.
    pub fn inside_array(&self, name: &str) -> bool {
        self.frames
            .iter()
            .any(|f| f.kind == Kind::Array && f.name == name)
    }

    /// True if any enclosing object is named `name`.
    pub fn inside_object(&self, name: &str) -> bool {
        self.frames
            .iter()
            .any(|f| f.kind == Kind::Object && f.name == name)
    }

    /// Number of open containers.
    pub fn depth(&self) -> usize {
        self.frames.len() + self.untracked
    }

    fn innermost(&self, kind: Kind) -> &str {
        self.frames
            .iter()
            .rev()
            .find(|f| f.kind == kind)
            .map_or("", |f| f.name.as_str())
    }

    fn push(&mut self, kind: Kind, name: Name) {
        if self.untracked > 0 || self.frames.push(Frame { kind, name }).is_err() {
            self.untracked += 1;
        }
    }

    fn pop(&mut self) {
        if self.untracked > 0 {
            self.untracked -= 1;
        } else {
            self.frames.pop();
        }
    }
}
