//! Streaming XML support.
//!
//! Responses are parsed as they arrive, one byte at a time, so a document
//! of any size is handled in constant memory.

mod context;
mod tokenizer;

pub use context::{TAG_NAME_LEN, TagContext};
pub use tokenizer::{TOKEN_CAPACITY, XmlListener, XmlStream, XmlTokenizer};
