//! Maps the SOAP departure board onto a [`StationRecord`].
//!
//! Fields are recognised by their nesting level and their last three
//! element names, which is all a [`TagContext`] keeps. Everything the mapper
//! does not recognise is ignored.

use tracing::debug;

use crate::domain::{
    Classes, MESSAGE_LEN, ServiceEntry, ServiceType, StationRecord, leading_int,
};
use crate::feed::{BoardError, EntryCount};
use crate::xml::{TagContext, XmlListener};

use super::sanitize::{clean_board_message, clean_location, clean_service_message};

/// Room for the calling-point list, terminator included.
const CALLING_SIZE: usize = MESSAGE_LEN + 1;

/// Which board field a text node fills.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    CallingPoint,
    CallingTime,
    CoachClass,
    Length,
    Operator,
    ServiceType,
    Scheduled,
    Estimated,
    Platform,
    DelayReason,
    CancelReason,
    Origin,
    Destination,
    Via,
    Location,
    PlatformAvailable,
    Message,
}

fn classify(ctx: &TagContext) -> Option<Field> {
    let level = ctx.level();
    if level < 6 || level == 9 || level > 11 {
        return None;
    }
    let name = ctx.name();
    let path = ctx.path();

    let field = match level {
        11 if path.ends_with("callingPoint/lt8:locationName") => Some(Field::CallingPoint),
        11 if path.ends_with("callingPoint/lt8:st") => Some(Field::CallingTime),
        11 if name == "lt7:coachClass" => Some(Field::CoachClass),
        8 => match name {
            "lt4:length" => Some(Field::Length),
            "lt4:operator" => Some(Field::Operator),
            "lt4:serviceType" => Some(Field::ServiceType),
            "lt4:std" => Some(Field::Scheduled),
            "lt4:etd" => Some(Field::Estimated),
            "lt4:platform" => Some(Field::Platform),
            "lt4:delayReason" => Some(Field::DelayReason),
            "lt4:cancelReason" => Some(Field::CancelReason),
            _ => None,
        },
        10 if path.starts_with("lt5:origin/lt4:location/lt4:loc") => Some(Field::Origin),
        10 if path.starts_with("lt5:destination/lt4:location/lt4:lo") => Some(Field::Destination),
        10 if path == "lt5:destination/lt4:location/lt4:via" => Some(Field::Via),
        6 if name == "lt4:locationName" => Some(Field::Location),
        6 if name == "lt4:platformAvailable" => Some(Field::PlatformAvailable),
        _ => None,
    };
    field.or_else(|| path.ends_with("nrccMessages/lt:message").then_some(Field::Message))
}

/// Streaming listener that builds a shadow rail board.
///
/// Services start at their scheduled-time element; fields seen before the
/// first one, or after the board is full, are dropped.
#[derive(Debug, Default)]
pub struct RailMapper {
    ctx: TagContext,
    board: StationRecord,
    current: Option<usize>,
    coaches: u32,
    added_stop: bool,
}

impl RailMapper {
    pub fn new() -> Self {
        Self::default()
    }

    /// The board as mapped so far, before clean-up.
    pub fn board(&self) -> &StationRecord {
        &self.board
    }

    /// Finish the document: validate, clean, filter and sort.
    ///
    /// Fails with [`BoardError::Incomplete`] when the document never named
    /// the station.
    pub fn finish(mut self, include_bus: bool) -> Result<StationRecord, BoardError> {
        self.flush_coaches();
        let mut board = self.board;
        if board.location.is_empty() {
            return Err(BoardError::Incomplete("no station name in board"));
        }

        let parsed = board.services.len();
        board.retain_services(ServiceEntry::is_displayable);
        for service in board.services.iter_mut() {
            service.destination.rewrite(clean_location);
            service.calling.rewrite(clean_location);
            service.via.rewrite(clean_location);
            service.message.rewrite(|m| clean_service_message(m, MESSAGE_LEN));
        }
        for message in board.messages.iter_mut() {
            message.rewrite(|m| clean_board_message(m, MESSAGE_LEN));
        }
        if !include_bus {
            board.retain_services(|s| s.service_type != ServiceType::Bus);
        }
        board.sort_by_schedule();

        debug!(
            station = %board.location,
            parsed,
            kept = board.services.len(),
            messages = board.messages.len(),
            "rail board mapped"
        );
        Ok(board)
    }

    fn current(&mut self) -> Option<&mut ServiceEntry> {
        self.current.and_then(|i| self.board.services.get_mut(i))
    }

    /// A service with no length gets the number of coach elements seen.
    fn flush_coaches(&mut self) {
        let counted = self.coaches;
        if let Some(entry) = self.current() {
            if entry.coaches == 0 {
                entry.coaches = counted;
            }
        }
    }

    fn start_service(&mut self, scheduled: &str) {
        self.flush_coaches();
        self.coaches = 0;
        self.added_stop = false;

        let mut entry = ServiceEntry::default();
        entry.scheduled.set(scheduled);
        self.current = if self.board.push_service(entry) {
            Some(self.board.services.len() - 1)
        } else {
            debug!(scheduled, "board full, service dropped");
            None
        };
    }

    fn calling_point(&mut self, name: &str) {
        let Some(entry) = self.current() else { return };
        let calling = &mut entry.calling;
        if calling.len() + name.len() + 13 < CALLING_SIZE {
            if !calling.is_empty() {
                calling.push_str(", ");
            }
            calling.push_str(name);
            self.added_stop = true;
        }
    }

    fn calling_time(&mut self, time: &str) {
        if !self.added_stop {
            return;
        }
        self.added_stop = false;
        let Some(entry) = self.current() else { return };
        let calling = &mut entry.calling;
        if calling.len() + time.len() + 4 < CALLING_SIZE {
            calling.push_str(" (");
            calling.push_str(time);
            calling.push(')');
        }
    }

    fn service_field(&mut self, field: Field, value: &str) {
        let Some(entry) = self.current() else { return };
        match field {
            Field::Length => entry.coaches = u32::try_from(leading_int(value)).unwrap_or(0),
            Field::Operator => entry.operator.set(value),
            Field::ServiceType => {
                if let Some(kind) = ServiceType::from_feed(value) {
                    entry.service_type = kind;
                }
            }
            Field::Estimated => entry.estimated.set(value),
            Field::Platform => entry.platform.set(value),
            Field::DelayReason => {
                entry.message.set(value);
                entry.delayed = true;
            }
            Field::CancelReason => {
                entry.message.set(value);
                entry.cancelled = true;
            }
            Field::Origin => entry.origin.set(value),
            Field::Destination => entry.destination.set(value),
            Field::Via => entry.via.set(value),
            _ => {}
        }
    }
}

impl XmlListener for RailMapper {
    fn start_tag(&mut self, name: &str) {
        self.ctx.start(name);
    }

    fn end_tag(&mut self, _name: &str) {
        self.ctx.end();
    }

    fn text(&mut self, value: &str) {
        let Some(field) = classify(&self.ctx) else { return };
        match field {
            Field::Scheduled => self.start_service(value),
            Field::CallingPoint => self.calling_point(value),
            Field::CallingTime => self.calling_time(value),
            Field::CoachClass => {
                if let (Some(class), Some(entry)) = (Classes::from_coach_class(value), self.current()) {
                    entry.classes.insert(class);
                }
                self.coaches += 1;
            }
            Field::Location => self.board.location.set(value),
            Field::PlatformAvailable => {
                if value == "true" {
                    self.board.platform_available = true;
                }
            }
            Field::Message => {
                if !self.board.push_message(value) {
                    debug!("message dropped, board full");
                }
            }
            field => self.service_field(field, value),
        }
    }
}

impl EntryCount for RailMapper {
    fn entries(&self) -> usize {
        self.board.services.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::darwin::fixtures::{ServiceXml, board_document, service_xml, wrap_services};
    use crate::xml::XmlStream;

    fn map(document: &str, include_bus: bool) -> Result<StationRecord, BoardError> {
        let mut stream = XmlStream::new(RailMapper::new());
        stream.feed_slice(document.as_bytes());
        stream.into_listener().finish(include_bus)
    }

    #[test]
    fn realistic_board() {
        let board = map(&board_document(), false).unwrap();

        assert_eq!(board.location, "Reading");
        assert!(board.platform_available);
        assert_eq!(board.messages.len(), 1);
        assert_eq!(board.messages[0], "Disruption between Reading & Didcot Parkway.");

        let times: Vec<&str> = board.services.iter().map(|s| s.scheduled.as_str()).collect();
        assert_eq!(times, ["09:58", "10:15", "10:45"]);

        let newbury = &board.services[0];
        assert_eq!(newbury.destination, "Newbury");
        assert_eq!(newbury.coaches, 4);
        assert_eq!(newbury.estimated, "10:02");

        let bristol = &board.services[1];
        assert_eq!(bristol.destination, "Bristol Temple Meads");
        assert_eq!(bristol.origin, "London Paddington");
        assert_eq!(bristol.via, "via Bath Spa");
        assert_eq!(bristol.platform, "4");
        assert_eq!(bristol.operator, "Great Western Railway");
        assert_eq!(bristol.calling, "Didcot Parkway (10:30), Swindon (10:45)");
        assert_eq!(bristol.coaches, 3);
        assert!(bristol.classes.contains(Classes::FIRST));
        assert!(bristol.classes.contains(Classes::STANDARD));

        let oxford = &board.services[2];
        assert_eq!(oxford.destination, "Oxford & District");
        assert!(oxford.delayed);
        assert!(!oxford.cancelled);
        assert_eq!(oxford.message, "This train has been delayed by a signalling fault.");
    }

    #[test]
    fn bus_services_kept_on_request() {
        let board = map(&board_document(), true).unwrap();
        let times: Vec<&str> = board.services.iter().map(|s| s.scheduled.as_str()).collect();
        assert_eq!(times, ["09:58", "10:05", "10:15", "10:45"]);
        assert_eq!(board.services[1].service_type, ServiceType::Bus);
    }

    #[test]
    fn missing_location_is_incomplete() {
        let doc = board_document().replace("<lt4:locationName>Reading</lt4:locationName>", "");
        assert!(matches!(map(&doc, false), Err(BoardError::Incomplete(_))));
    }

    #[test]
    fn overflow_services_dropped() {
        let services: String = (0..12)
            .map(|i| {
                service_xml(&ServiceXml {
                    std: &format!("11:{i:02}"),
                    etd: Some("On time"),
                    destination: Some(&format!("Stop {i}")),
                    ..ServiceXml::default()
                })
            })
            .collect();
        let board = map(&wrap_services("Reading", &services), false).unwrap();
        assert_eq!(board.services.len(), crate::domain::MAX_SERVICES);
        assert_eq!(board.services[8].destination, "Stop 8");
    }

    #[test]
    fn cancelled_service() {
        let services = service_xml(&ServiceXml {
            std: "12:00",
            etd: Some("Cancelled"),
            destination: Some("Swindon"),
            cancel_reason: Some("This train has been cancelled because of a shortage of staff..."),
            ..ServiceXml::default()
        });
        let board = map(&wrap_services("Reading", &services), false).unwrap();
        let service = &board.services[0];
        assert!(service.cancelled);
        assert_eq!(service.message, "This train has been cancelled because of a shortage of staff.");
    }

    #[test]
    fn calling_time_only_follows_added_stop() {
        let mut mapper = RailMapper::new();
        mapper.start_service("10:00");
        mapper.calling_time("10:05");
        mapper.calling_point("Twyford");
        mapper.calling_time("10:10");
        mapper.calling_time("10:11");
        assert_eq!(mapper.board().services[0].calling, "Twyford (10:10)");
    }

    #[test]
    fn calling_points_stop_before_overflow() {
        let mut mapper = RailMapper::new();
        mapper.start_service("10:00");
        let stop = "x".repeat(40);
        for _ in 0..20 {
            mapper.calling_point(&stop);
            mapper.calling_time("10:10");
        }
        let calling = &mapper.board().services[0].calling;
        assert!(calling.len() < CALLING_SIZE);
        assert!(calling.ends_with("(10:10)"));
    }

    #[test]
    fn whitespace_between_elements_is_irrelevant() {
        let compact = board_document().replace('\n', "");
        assert_eq!(map(&compact, false).unwrap(), map(&board_document(), false).unwrap());
    }
}
