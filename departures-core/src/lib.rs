//! Data core of a live departures board.
//!
//! Polls National Rail (SOAP/XML) or the London Underground (JSON) feeds,
//! maps the documents as they stream in onto a fixed-capacity board, and
//! keeps the device current with MD5-verified over-the-air updates. The
//! current weather at the station can be shown beneath the board.

pub mod config;
pub mod darwin;
pub mod domain;
pub mod feed;
pub mod http;
pub mod json;
pub mod tfl;
pub mod update;
pub mod weather;
pub mod xml;
