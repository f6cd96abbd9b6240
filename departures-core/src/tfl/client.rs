//! Underground arrivals client.
//!
//! Each poll makes two sequential requests against the unified API: the
//! arrival predictions for a stop point, then its disruptions.

use std::time::Duration;

use tracing::{debug, info};

use crate::domain::{BoardPublisher, StationRecord, UpdateCode};
use crate::feed::{BoardError, Progress, ProgressSink};
use crate::http::{Connector, HttpClient, HttpConfig, Request};
use crate::json::JsonStream;

use super::mapper::{Document, UndergroundMapper};

/// Default base URL for the unified API.
const DEFAULT_BASE_URL: &str = "https://api.tfl.gov.uk";

/// Configuration for the underground client.
#[derive(Debug, Clone)]
pub struct TflConfig {
    /// Application key sent as `app_key`
    pub app_key: String,
    /// Stop point id, e.g. "940GZZLUOXC"
    pub stop_id: String,
    /// Base URL for the API (defaults to production)
    pub base_url: String,
    pub http: HttpConfig,
}

impl TflConfig {
    pub fn new(app_key: impl Into<String>, stop_id: impl Into<String>) -> Self {
        Self {
            app_key: app_key.into(),
            stop_id: stop_id.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            http: Self::default_http(),
        }
    }

    /// Underground timeouts: 15 connection attempts 200ms apart, 8s to the
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

    fn arrivals_url(&self) -> String {
        format!(
            "{}/StopPoint/{}/Arrivals?app_key={}",
            self.base_url, self.stop_id, self.app_key
        )
    }

    fn disruptions_url(&self) -> String {
        format!(
            "{}/StopPoint/{}/Disruption?getFamily=true&flattenResponse=true&app_key={}",
            self.base_url, self.stop_id, self.app_key
        )
    }
}

/// Underground board client.
#[derive(Debug)]
pub struct TflClient<C> {
    http: HttpClient<C>,
    config: TflConfig,
    publisher: BoardPublisher,
}

impl<C: Connector> TflClient<C> {
    pub fn new(connector: C, config: TflConfig) -> Self {
        let http = HttpClient::new(connector, config.http.clone());
        Self {
            http,
            config,
            publisher: BoardPublisher::new(),
        }
    }

    pub fn config(&self) -> &TflConfig {
        &self.config
    }

    /// Poll arrivals and disruptions and publish them over `live`.
    ///
    /// The live location is left alone. Either request failing leaves
    /// `live` untouched.
    pub async fn update_arrivals<P: FnMut(Progress)>(
        &mut self,
        live: &mut StationRecord,
        mut progress: P,
    ) -> Result<UpdateCode, BoardError> {
        let mapper = UndergroundMapper::new();
        let mapper = self
            .read_document(&self.config.arrivals_url(), mapper, &mut progress)
            .await?;
        let mapper = self
            .read_document(
                &self.config.disruptions_url(),
                mapper.next_document(Document::Disruptions),
                &mut progress,
            )
            .await?;

        let shadow = mapper.finish();
        let code = self.publisher.publish_primary(shadow, live);
        progress(Progress::Complete {
            entries: live.services.len(),
        });
        info!(
            stop = %self.config.stop_id,
            services = live.services.len(),
            messages = live.messages.len(),
            result = %code,
            "underground board updated"
        );
        Ok(code)
    }

    async fn read_document<P: FnMut(Progress)>(
        &self,
        url: &str,
        mapper: UndergroundMapper,
        progress: &mut P,
    ) -> Result<UndergroundMapper, BoardError> {
        let request = Request::get(url)?;
        progress(Progress::RequestSent);
        let response = self.http.send(&request).await?;

        let document = mapper.document();
        let mut stream = JsonStream::new(mapper);
        let received = response
            .read_body(&mut ProgressSink::new(&mut stream, progress))
            .await?;
        debug!(?document, bytes = received, "underground document received");
        Ok(stream.into_listener())
    }
}
