//! Current weather at the board's location from OpenWeatherMap.
//!
//! One JSON document per refresh, read with the streaming tokenizer and
//! rendered as a single line for the bottom of the board.

mod client;
#[cfg(test)]
pub(crate) mod fixtures;
mod mapper;

pub use client::{WEATHER_REFRESH, WEATHER_RETRY, WeatherClient, WeatherConfig, next_refresh};
pub use mapper::{WEATHER_LEN, WeatherMapper, WeatherReport};
