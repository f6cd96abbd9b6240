//! National Rail live departure boards over SOAP.
//!
//! The service description is fetched once to find the SOAP endpoint. Each
//! poll then posts a `GetDepBoardWithDetails` envelope and streams the XML
//! reply through a [`RailMapper`], which fills a shadow board that is
//! cleaned, filtered and published over the live one.
//!
//! Key characteristics of the feed:
//! - Times are "HH:MM" strings in UK local time
//! - Calling points arrive inline with each service
//! - Free text fields carry entity-escaped HTML

mod client;
#[cfg(test)]
pub(crate) mod fixtures;
mod mapper;
pub mod sanitize;
pub mod soap;
mod wsdl;

pub use client::{DEFAULT_WSDL_URL, RailClient, RailConfig};
pub use mapper::RailMapper;
pub use wsdl::{SoapEndpoint, WsdlListener};
