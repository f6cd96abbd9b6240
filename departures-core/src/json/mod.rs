//! Streaming JSON support.
//!
//! A byte-fed tokenizer plus a small path tracker. Listeners only see keys,
//! scalar values and container boundaries; the whole document is never
//! held in memory.

mod path;
mod tokenizer;

pub use path::JsonPath;
pub use tokenizer::{JsonListener, JsonStream, JsonTokenizer, MAX_DEPTH, TOKEN_CAPACITY};
