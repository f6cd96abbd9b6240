//! Service endpoint discovery from the rail WSDL.

use crate::feed::{BoardError, EntryCount};
use crate::xml::{TagContext, XmlListener};

/// Where departure board requests are posted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SoapEndpoint {
    pub host: String,
    pub path: String,
}

impl SoapEndpoint {
    /// Split an `https://host/path` address.
    ///
    /// # Examples
    ///
    /// ```
    /// use departures_core::darwin::SoapEndpoint;
    ///
    /// let endpoint = SoapEndpoint::parse("https://lite.realtime.nationalrail.co.uk/OpenLDBWS/ldb12.asmx").unwrap();
    /// assert_eq!(endpoint.host, "lite.realtime.nationalrail.co.uk");
    /// assert_eq!(endpoint.path, "/OpenLDBWS/ldb12.asmx");
    /// ```
    pub fn parse(address: &str) -> Result<Self, BoardError> {
        let rest = address
            .strip_prefix("https://")
            .ok_or_else(|| BoardError::Data(format!("endpoint is not https: {address}")))?;
        match rest.find('/') {
            Some(slash) if slash > 0 => Ok(Self {
                host: rest[..slash].to_string(),
                path: rest[slash..].to_string(),
            }),
            _ => Err(BoardError::Data(format!("endpoint has no path: {address}"))),
        }
    }

    pub fn url(&self) -> String {
        format!("https://{}{}", self.host, self.path)
    }
}

/// Picks the `location` attribute off the `soap:address` element.
#[derive(Debug, Default)]
pub struct WsdlListener {
    ctx: TagContext,
    location: Option<String>,
}

impl WsdlListener {
    pub fn new() -> Self {
        Self::default()
    }

    /// The raw address, if one was seen.
    pub fn location(&self) -> Option<&str> {
        self.location.as_deref()
    }

    pub fn endpoint(&self) -> Result<SoapEndpoint, BoardError> {
        let location = self
            .location
            .as_deref()
            .ok_or_else(|| BoardError::Data("no soap:address in service description".into()))?;
        SoapEndpoint::parse(location)
    }
}

impl XmlListener for WsdlListener {
    fn start_tag(&mut self, name: &str) {
        self.ctx.start(name);
    }

    fn end_tag(&mut self, _name: &str) {
        self.ctx.end();
    }

    fn attribute(&mut self, raw: &str) {
        if self.ctx.name() != "soap:address" {
            return;
        }
        if let Some(value) = raw
            .strip_prefix("location=\"")
            .and_then(|v| v.strip_suffix('"'))
        {
            self.location = Some(value.to_string());
        }
    }
}

impl EntryCount for WsdlListener {
    fn entries(&self) -> usize {
        0
    }
}
