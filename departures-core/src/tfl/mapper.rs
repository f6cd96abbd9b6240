//! Maps the underground arrivals and disruption documents onto a board.

use tracing::debug;

use crate::domain::{
    LINE_LEN, MAX_MESSAGES, MAX_SERVICES, Message, ServiceEntry, StationRecord, Text, leading_int,
};
use crate::feed::EntryCount;
use crate::json::{JsonListener, JsonPath};

/// Arrivals read before the rest of the document is ignored.
pub const MAX_READ_SERVICES: usize = 20;

/// Destination shown when a prediction does not name one.
pub const DEFAULT_DESTINATION: &str = "Check front of train";

const DESTINATION_SUFFIXES: [&str; 3] = [" Underground Station", " DLR Station", " (H&C Line)"];

/// Which of the two stop point documents is being read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Document {
    /// `/StopPoint/{id}/Arrivals`: one object per prediction, each
    /// starting with an `id` key.
    Arrivals,
    /// `/StopPoint/{id}/Disruption`: one object per disruption, each with a
    /// `description`.
    Disruptions,
}

/// Strip the station-type suffixes predictions carry.
///
/// # Examples
///
/// ```
/// use departures_core::tfl::short_destination;
///
/// assert_eq!(short_destination("Brixton Underground Station"), "Brixton");
/// assert_eq!(short_destination("Hammersmith (H&C Line)"), "Hammersmith");
/// assert_eq!(short_destination("Walthamstow Central"), "Walthamstow Central");
/// ```
pub fn short_destination(name: &str) -> &str {
    DESTINATION_SUFFIXES
        .iter()
        .find_map(|suffix| name.strip_suffix(suffix))
        .unwrap_or(name)
}

/// Streaming listener for both underground documents.
///
/// One mapper reads the arrivals document, is switched over with
/// [`next_document`](Self::next_document), reads the disruptions and is
/// then finished into a board.
#[derive(Debug)]
pub struct UndergroundMapper {
    document: Document,
    path: JsonPath,
    arrivals: heapless::Vec<ServiceEntry, MAX_READ_SERVICES>,
    messages: heapless::Vec<Message, MAX_MESSAGES>,
    done: bool,
}

impl Default for UndergroundMapper {
    fn default() -> Self {
        Self::new()
    }
}

impl UndergroundMapper {
    /// A mapper ready for the arrivals document.
    pub fn new() -> Self {
        Self {
            document: Document::Arrivals,
            path: JsonPath::new(),
            arrivals: heapless::Vec::new(),
            messages: heapless::Vec::new(),
            done: false,
        }
    }

    pub fn document(&self) -> Document {
        self.document
    }

    /// Switch to reading `document`, keeping what has been mapped.
    pub fn next_document(mut self, document: Document) -> Self {
        self.document = document;
        self.path.reset();
        self.done = false;
        self
    }

    /// Sort arrivals soonest first and keep what fits on the board.
    pub fn finish(mut self) -> StationRecord {
        let read = self.arrivals.len();
        self.arrivals.sort_by_key(|s| s.time_to_station);

        let mut board = StationRecord::new();
        for service in self.arrivals.into_iter().take(MAX_SERVICES) {
            board.push_service(service);
        }
        board.messages = self.messages;
        debug!(
            read,
            kept = board.services.len(),
            messages = board.messages.len(),
            "underground board mapped"
        );
        board
    }

    fn start_entry(&mut self) {
        let mut entry = ServiceEntry::default();
        entry.destination.set(DEFAULT_DESTINATION);
        if self.arrivals.push(entry).is_err() {
            self.done = true;
        }
    }

    fn start_message(&mut self) {
        if self.messages.push(Message::new()).is_err() {
            self.done = true;
        }
    }
}

impl JsonListener for UndergroundMapper {
    fn key(&mut self, key: &str) {
        self.path.key(key);
        match (self.document, key) {
            (Document::Arrivals, "id") => self.start_entry(),
            (Document::Disruptions, "description") => self.start_message(),
            _ => {}
        }
    }

    fn value(&mut self, value: &str) {
        match self.document {
            Document::Arrivals => {
                let Some(entry) = self.arrivals.last_mut() else { return };
                match self.path.current_key() {
                    "destinationName" => entry.destination.set(short_destination(value)),
                    "timeToStation" => entry.time_to_station = leading_int(value),
                    "lineName" => entry.via.set(&Text::<LINE_LEN>::from_str_truncating(value)),
                    _ => {}
                }
            }
            Document::Disruptions => {
                if self.path.current_key() == "description" {
                    if let Some(message) = self.messages.last_mut() {
                        message.set(value);
                    }
                }
            }
        }
    }

    fn start_object(&mut self) {
        self.path.start_object();
    }

    fn end_object(&mut self) {
        self.path.end_object();
    }

    fn start_array(&mut self) {
        self.path.start_array();
    }

    fn end_array(&mut self) {
        self.path.end_array();
    }

    fn is_done(&self) -> bool {
        self.done
    }
}

impl EntryCount for UndergroundMapper {
    fn entries(&self) -> usize {
        match self.document {
            Document::Arrivals => self.arrivals.len(),
            Document::Disruptions => self.messages.len(),
        }
    }
}
