//! London Underground arrivals from the TfL unified API.
//!
//! Arrival predictions and station disruptions are two JSON documents read
//! with the streaming tokenizer. Predictions are sorted by seconds to
//! arrival and the nearest are published; the board only counts as changed
//! when the leading destinations change.

mod client;
#[cfg(test)]
pub(crate) mod fixtures;
mod mapper;

pub use client::{TflClient, TflConfig};
pub use mapper::{
    DEFAULT_DESTINATION, Document, MAX_READ_SERVICES, UndergroundMapper, short_destination,
};
