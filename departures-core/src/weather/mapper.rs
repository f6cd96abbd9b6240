//! Maps a current-weather document onto a report.

use std::fmt;

use crate::domain::Text;
use crate::feed::{BoardError, EntryCount};
use crate::json::{JsonListener, JsonPath};

/// Capacity of the one-line summary shown under the board.
pub const WEATHER_LEN: usize = 45;

const DESCRIPTION_LEN: usize = 32;
const MPH_PER_METRE_PER_SECOND: f32 = 2.236_936;

/// Current conditions at the board's location.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WeatherReport {
    /// The first reported condition, e.g. "light rain"
    pub description: Text<DESCRIPTION_LEN>,
    /// Degrees Celsius
    pub temperature: f32,
    /// Metres per second
    pub wind_speed: f32,
}

impl WeatherReport {
    pub fn wind_mph(&self) -> f32 {
        self.wind_speed * MPH_PER_METRE_PER_SECOND
    }

    /// The display line, e.g. `Light rain 12° Wind: 8mph`.
    ///
    /// ```
    /// use departures_core::weather::WeatherReport;
    ///
    /// let mut report = WeatherReport::default();
    /// report.description.set("light rain");
    /// report.temperature = 11.6;
    /// report.wind_speed = 3.6;
    /// assert_eq!(report.summary(), "Light rain 12° Wind: 8mph");
    /// ```
    pub fn summary(&self) -> Text<WEATHER_LEN> {
        Text::from_str_truncating(&self.to_string())
    }
}

impl fmt::Display for WeatherReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut chars = self.description.chars();
        if let Some(first) = chars.next() {
            write!(f, "{}{} ", first.to_uppercase(), chars.as_str())?;
        }
        write!(
            f,
            "{}° Wind: {}mph",
            self.temperature.round() as i32,
            self.wind_mph().round() as i32
        )
    }
}

/// Streaming listener for the current-weather document.
///
/// Only the first entry of the `weather` array supplies the description.
/// The temperature comes from `main.temp` and the wind from `wind.speed`.
#[derive(Debug, Default)]
pub struct WeatherMapper {
    path: JsonPath,
    report: WeatherReport,
    conditions: usize,
    has_temperature: bool,
}

impl WeatherMapper {
    pub fn new() -> Self {
        Self::default()
    }

    /// Entries of the `weather` array read so far.
    pub fn conditions(&self) -> usize {
        self.conditions
    }

    /// The report, provided the document carried a temperature.
    pub fn finish(self) -> Result<WeatherReport, BoardError> {
        if !self.has_temperature {
            return Err(BoardError::Incomplete("no temperature in weather report"));
        }
        Ok(self.report)
    }
}

fn parse_number(value: &str) -> f32 {
    value.trim().parse().unwrap_or(0.0)
}

impl JsonListener for WeatherMapper {
    fn key(&mut self, key: &str) {
        self.path.key(key);
    }

    fn value(&mut self, value: &str) {
        match (self.path.current_object(), self.path.current_key()) {
            ("weather", "description") if self.conditions == 0 => {
                self.report.description.set(value);
            }
            ("main", "temp") => {
                self.report.temperature = parse_number(value);
                self.has_temperature = true;
            }
            ("wind", "speed") => self.report.wind_speed = parse_number(value),
            _ => {}
        }
    }

    fn start_object(&mut self) {
        self.path.start_object();
    }

    fn end_object(&mut self) {
        if self.path.current_object() == "weather" {
            self.conditions += 1;
        }
        self.path.end_object();
    }

    fn start_array(&mut self) {
        self.path.start_array();
    }

    fn end_array(&mut self) {
        self.path.end_array();
    }
}

impl EntryCount for WeatherMapper {
    fn entries(&self) -> usize {
        self.conditions()
    }
}
