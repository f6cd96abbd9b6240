//! Current weather client.

use std::time::Duration;

use tracing::{debug, info};

use crate::feed::{BoardError, Progress, ProgressSink};
use crate::http::{Connector, HttpClient, HttpConfig, Request};
use crate::json::JsonStream;

use super::mapper::{WeatherMapper, WeatherReport};

/// Default base URL for the weather API.
const DEFAULT_BASE_URL: &str = "http://api.openweathermap.org";

/// How long a good report is shown before it is refreshed.
pub const WEATHER_REFRESH: Duration = Duration::from_secs(20 * 60);

/// How soon a failed refresh is retried.
pub const WEATHER_RETRY: Duration = Duration::from_secs(30);

/// Delay before the next refresh after `result`.
pub fn next_refresh<T, E>(result: &Result<T, E>) -> Duration {
    match result {
        Ok(_) => WEATHER_REFRESH,
        Err(_) => WEATHER_RETRY,
    }
}

/// Configuration for the weather client.
#[derive(Debug, Clone)]
pub struct WeatherConfig {
    /// Sent as `appid`
    pub api_key: String,
    pub latitude: f64,
    pub longitude: f64,
    /// Base URL for the API (defaults to production)
    pub base_url: String,
    pub http: HttpConfig,
}

impl WeatherConfig {
    pub fn new(api_key: impl Into<String>, latitude: f64, longitude: f64) -> Self {
        Self {
            api_key: api_key.into(),
            latitude,
            longitude,
            base_url: DEFAULT_BASE_URL.to_string(),
            http: Self::default_http(),
        }
    }

    /// Weather timeouts: 15 connection attempts 200ms apart, 8s to the
    /// first byte and 10s for the body.
    pub fn default_http() -> HttpConfig {
        HttpConfig::new()
            .with_connect_retry(15, Duration::from_millis(200))
            .with_response_timeout(Duration::from_secs(8))
            .with_body_timeout(Duration::from_secs(10))
    }

    /// Set a custom base URL (for testing).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn with_http(mut self, http: HttpConfig) -> Self {
        self.http = http;
        self
    }

    fn current_url(&self) -> String {
        format!(
            "{}/data/2.5/weather?units=metric&lang=en&lat={}&lon={}&appid={}",
            self.base_url, self.latitude, self.longitude, self.api_key
        )
    }
}

/// Current weather client.
#[derive(Debug)]
pub struct WeatherClient<C> {
    http: HttpClient<C>,
    config: WeatherConfig,
}

impl<C: Connector> WeatherClient<C> {
    pub fn new(connector: C, config: WeatherConfig) -> Self {
        let http = HttpClient::new(connector, config.http.clone());
        Self { http, config }
    }

    pub fn config(&self) -> &WeatherConfig {
        &self.config
    }

    /// Fetch the current conditions at the configured location.
    pub async fn update_weather<P: FnMut(Progress)>(
        &self,
        mut progress: P,
    ) -> Result<WeatherReport, BoardError> {
        let request = Request::get(&self.config.current_url())?;
        progress(Progress::RequestSent);
        let response = self.http.send(&request).await?;

        let mut stream = JsonStream::new(WeatherMapper::new());
        let received = response
            .read_body(&mut ProgressSink::new(&mut stream, &mut progress))
            .await?;
        debug!(bytes = received, "weather document received");

        let mapper = stream.into_listener();
        let conditions = mapper.conditions();
        let report = mapper.finish()?;
        progress(Progress::Complete { entries: conditions });
        info!(summary = %report.summary(), "weather updated");
        Ok(report)
    }
}
