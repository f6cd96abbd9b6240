//! Tag ancestry tracking for XML mappers.

use crate::domain::Text;

/// Capacity of a single tag name.
pub const TAG_NAME_LEN: usize = 48;

type TagName = Text<TAG_NAME_LEN>;

/// The innermost three tag names, their slash-joined path and the depth.
///
/// The path is only rebuilt on a start tag. After an end tag the
/// grandparent slot is unknown and holds `??`, so the path keeps describing
/// the most recently opened element until the next one opens.
///
/// # Examples
///
/// ```
/// use departures_core::xml::TagContext;
///
/// let mut ctx = TagContext::new();
/// ctx.start("lt5:destination");
/// ctx.start("lt4:location");
/// ctx.start("lt4:locationName");
/// assert_eq!(ctx.path(), "lt5:destination/lt4:location/lt4:locationName");
/// assert_eq!(ctx.level(), 3);
///
/// ctx.end();
/// assert_eq!(ctx.name(), "lt4:location");
/// assert_eq!(ctx.level(), 2);
/// ```
#[derive(Debug, Clone, Default)]
pub struct TagContext {
    name: TagName,
    parent: TagName,
    grandparent: TagName,
    path: Text<{ 3 * TAG_NAME_LEN + 2 }>,
    level: i32,
}

impl TagContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget everything, as at the start of a document.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// An element opened.
    pub fn start(&mut self, name: &str) {
        self.level += 1;
        self.grandparent = std::mem::take(&mut self.parent);
        self.parent = std::mem::take(&mut self.name);
        self.name.set(name);

        self.path.set(&self.grandparent);
        self.path.push('/');
        self.path.push_str(&self.parent);
        self.path.push('/');
        self.path.push_str(&self.name);
    }

    /// An element closed.
    pub fn end(&mut self) {
        self.level -= 1;
        self.name = std::mem::take(&mut self.parent);
        self.parent = std::mem::take(&mut self.grandparent);
        self.grandparent.set("??");
    }

    /// Name of the innermost open element.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parent(&self) -> &str {
        &self.parent
    }

    pub fn grandparent(&self) -> &str {
        &self.grandparent
    }

    /// `grandparent/parent/name` as of the last start tag.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Nesting depth. Every start tag counts, including the `?xml` prolog.
    pub fn level(&self) -> i32 {
        self.level
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_at_shallow_depth_has_empty_ancestors() {
        let mut ctx = TagContext::new();
        ctx.start("root");
        assert_eq!(ctx.path(), "//root");
        ctx.start("child");
        assert_eq!(ctx.path(), "/root/child");
    }

    #[test]
    fn end_marks_grandparent_unknown() {
        let mut ctx = TagContext::new();
        ctx.start("a");
        ctx.start("b");
        ctx.start("c");
        ctx.end();
        assert_eq!(ctx.name(), "b");
        assert_eq!(ctx.parent(), "a");
        assert_eq!(ctx.grandparent(), "??");

        ctx.start("d");
        assert_eq!(ctx.path(), "a/b/d");
    }

    #[test]
    fn reset_clears_level() {
        let mut ctx = TagContext::new();
        ctx.start("a");
        ctx.reset();
        assert_eq!(ctx.level(), 0);
        assert_eq!(ctx.name(), "");
    }
}
