//! Rail departure board client.
//!
//! Discovers the SOAP endpoint from the service description once, then
//! posts a board request per poll and streams the reply through the
//! [`RailMapper`].

use std::time::Duration;

use tracing::{debug, info};

use crate::domain::{BoardPublisher, MAX_SERVICES, StationRecord, UpdateCode};
use crate::feed::{BoardError, Progress, ProgressSink};
use crate::http::{Connector, HttpClient, HttpConfig, HttpVersion, Request};
use crate::xml::XmlStream;

use super::mapper::RailMapper;
use super::soap::departure_board_request;
use super::wsdl::{SoapEndpoint, WsdlListener};

/// Service description for the 2021-11-01 board API.
pub const DEFAULT_WSDL_URL: &str =
    "https://lite.realtime.nationalrail.co.uk/OpenLDBWS/wsdl.aspx?ver=2021-11-01";

/// Configuration for the rail client.
#[derive(Debug, Clone)]
pub struct RailConfig {
    /// Access token sent in the SOAP header
    pub token: String,
    /// Station CRS code
    pub crs: String,
    /// Rows requested per board
    pub num_rows: usize,
    /// Keep replacement bus services
    pub include_bus: bool,
    pub wsdl_url: String,
    pub http: HttpConfig,
}

impl RailConfig {
    /// Create a config for `crs` with the default endpoint and timeouts.
    pub fn new(token: impl Into<String>, crs: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            crs: crs.into(),
            num_rows: MAX_SERVICES,
            include_bus: false,
            wsdl_url: DEFAULT_WSDL_URL.to_string(),
            http: Self::default_http(),
        }
    }

    /// Rail timeouts: 30 connection attempts 100ms apart, 3s to the first
    /// byte, 1s for the headers and 10s for the body.
    pub fn default_http() -> HttpConfig {
        HttpConfig::new()
            .with_connect_retry(30, Duration::from_millis(100))
            .with_response_timeout(Duration::from_secs(3))
            .with_header_timeout(Duration::from_secs(1))
            .with_body_timeout(Duration::from_secs(10))
    }

    /// Set a custom service description URL (for testing).
    pub fn with_wsdl_url(mut self, url: impl Into<String>) -> Self {
        self.wsdl_url = url.into();
        self
    }

    pub fn with_num_rows(mut self, rows: usize) -> Self {
        self.num_rows = rows;
        self
    }

    pub fn with_include_bus(mut self, include: bool) -> Self {
        self.include_bus = include;
        self
    }

    pub fn with_http(mut self, http: HttpConfig) -> Self {
        self.http = http;
        self
    }
}

/// Rail board client.
///
/// Holds the discovered endpoint and the publisher state, so one client
/// should be kept for the life of a board.
#[derive(Debug)]
pub struct RailClient<C> {
    http: HttpClient<C>,
    config: RailConfig,
    endpoint: Option<SoapEndpoint>,
    publisher: BoardPublisher,
}

impl<C: Connector> RailClient<C> {
    pub fn new(connector: C, config: RailConfig) -> Self {
        let http = HttpClient::new(connector, config.http.clone());
        Self {
            http,
            config,
            endpoint: None,
            publisher: BoardPublisher::new(),
        }
    }

    pub fn config(&self) -> &RailConfig {
        &self.config
    }

    /// The endpoint found by [`init`](Self::init), if it has run.
    pub fn endpoint(&self) -> Option<&SoapEndpoint> {
        self.endpoint.as_ref()
    }

    /// Fetch the service description and record the SOAP endpoint.
    pub async fn init(&mut self) -> Result<&SoapEndpoint, BoardError> {
        let request = Request::get(&self.config.wsdl_url)?;
        let response = self.http.send(&request).await?;

        let mut stream = XmlStream::new(WsdlListener::new());
        let mut ignore = |_: Progress| {};
        response
            .read_body(&mut ProgressSink::new(&mut stream, &mut ignore))
            .await?;

        let endpoint = stream.listener().endpoint()?;
        info!(host = %endpoint.host, path = %endpoint.path, "rail endpoint discovered");
        Ok(self.endpoint.insert(endpoint))
    }

    /// Poll the board and publish it over `live`.
    ///
    /// Discovers the endpoint first if [`init`](Self::init) has not run.
    /// `live` is only modified on success.
    pub async fn update_departures<P: FnMut(Progress)>(
        &mut self,
        live: &mut StationRecord,
        mut progress: P,
    ) -> Result<UpdateCode, BoardError> {
        let endpoint = if let Some(endpoint) = self.endpoint.clone() {
            endpoint
        } else {
            self.init().await?.clone()
        };

        let body = departure_board_request(&self.config.token, &self.config.crs, self.config.num_rows);
        let request = Request::post(&endpoint.url(), body)?
            .with_version(HttpVersion::Http11)
            .with_header("Content-Type", "text/xml;charset=UTF-8");

        progress(Progress::RequestSent);
        let response = self.http.send(&request).await?;

        let mut stream = XmlStream::new(RailMapper::new());
        let received = response
            .read_body(&mut ProgressSink::new(&mut stream, &mut progress))
            .await?;
        debug!(crs = %self.config.crs, bytes = received, "rail board received");

        let shadow = stream.into_listener().finish(self.config.include_bus)?;
        let code = self.publisher.publish(shadow, live);
        progress(Progress::Complete {
            entries: live.services.len(),
        });
        info!(
            station = %live.location,
            services = live.services.len(),
            result = %code,
            "rail board updated"
        );
        Ok(code)
    }
}
