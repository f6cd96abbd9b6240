//! The published arrivals/departures board.

use std::fmt;

use super::text::Text;
use super::time::schedule_sort_key;

/// Maximum services shown on a board.
pub const MAX_SERVICES: usize = 9;

/// Maximum free-text board messages.
pub const MAX_MESSAGES: usize = 4;

/// Capacity of message-class fields (board messages, calling points,
/// service messages).
pub const MESSAGE_LEN: usize = 399;

/// Capacity of location-class fields (station, destination, via, origin).
pub const LOCATION_LEN: usize = 44;

/// Capacity of the underground line name.
pub const LINE_LEN: usize = 19;

/// A free-text board message.
pub type Message = Text<MESSAGE_LEN>;

/// Kind of vehicle operating a service.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ServiceType {
    #[default]
    Other,
    Train,
    Bus,
}

impl ServiceType {
    /// Parse the feed's service type text ("train", "bus").
    pub fn from_feed(s: &str) -> Option<Self> {
        match s {
            "train" => Some(ServiceType::Train),
            "bus" => Some(ServiceType::Bus),
            _ => None,
        }
    }
}

/// Seating classes available on a service, as a bitmask.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Classes(u8);

impl Classes {
    pub const FIRST: Classes = Classes(0b01);
    pub const STANDARD: Classes = Classes(0b10);

    pub const fn bits(self) -> u8 {
        self.0
    }

    pub const fn contains(self, other: Classes) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn insert(&mut self, other: Classes) {
        self.0 |= other.0;
    }

    /// Map a coach class name from the feed.
    pub fn from_coach_class(s: &str) -> Option<Self> {
        match s {
            "First" => Some(Classes::FIRST),
            "Standard" => Some(Classes::STANDARD),
            _ => None,
        }
    }
}

impl fmt::Debug for Classes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Classes({:#04b})", self.0)
    }
}

/// One scheduled or real-time service on a board.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServiceEntry {
    /// Scheduled time, "HH:MM".
    pub scheduled: Text<5>,
    pub destination: Text<LOCATION_LEN>,
    /// Via point; the line name on underground boards.
    pub via: Text<LOCATION_LEN>,
    pub origin: Text<LOCATION_LEN>,
    /// Estimated departure text ("On time", "Delayed", "10:15", ...).
    pub estimated: Text<10>,
    pub platform: Text<3>,
    pub operator: Text<49>,
    /// Calling points, comma-joined with scheduled times.
    pub calling: Text<MESSAGE_LEN>,
    /// Delay or cancellation reason.
    pub message: Text<MESSAGE_LEN>,
    pub cancelled: bool,
    pub delayed: bool,
    pub coaches: u32,
    pub classes: Classes,
    pub service_type: ServiceType,
    /// Seconds until arrival (underground boards only).
    pub time_to_station: i64,
}

impl ServiceEntry {
    /// True when the fields a board row cannot be drawn without are present.
    pub fn is_displayable(&self) -> bool {
        !self.destination.is_empty() && !self.estimated.is_empty() && !self.scheduled.is_empty()
    }

    /// Numeric ordering key for the scheduled time.
    pub fn schedule_key(&self) -> (i64, i64) {
        schedule_sort_key(&self.scheduled)
    }
}

/// One published board.
///
/// Capacity is fixed: `services` never holds more than [`MAX_SERVICES`]
/// entries and `messages` never more than [`MAX_MESSAGES`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StationRecord {
    pub location: Text<LOCATION_LEN>,
    pub platform_available: bool,
    pub services: heapless::Vec<ServiceEntry, MAX_SERVICES>,
    /// Set when the primary services changed in the last poll.
    pub board_changed: bool,
    pub messages: heapless::Vec<Message, MAX_MESSAGES>,
}

impl StationRecord {
    /// An empty board.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a service. Returns `false` (and drops it) when full.
    pub fn push_service(&mut self, entry: ServiceEntry) -> bool {
        self.services.push(entry).is_ok()
    }

    /// Append a message. Returns `false` (and drops it) when full.
    pub fn push_message(&mut self, text: &str) -> bool {
        self.messages.push(Message::from_str_truncating(text)).is_ok()
    }

    /// Remove service `index`, shifting later entries down.
    pub fn delete_service(&mut self, index: usize) {
        if index < self.services.len() {
            self.services.remove(index);
        }
    }

    /// Remove services for which `keep` returns false, preserving order.
    pub fn retain_services(&mut self, keep: impl FnMut(&ServiceEntry) -> bool) {
        self.services.retain(keep);
    }

    /// Stable sort by scheduled time.
    pub fn sort_by_schedule(&mut self) {
        self.services.sort_by_key(ServiceEntry::schedule_key);
    }

    /// Content equality ignoring the `board_changed` flag.
    pub fn same_content(&self, other: &StationRecord) -> bool {
        self.location == other.location
            && self.platform_available == other.platform_available
            && self.services == other.services
            && self.messages == other.messages
    }
}

/// A plain-text rendering of the board, one service per line.
impl fmt::Display for StationRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.location)?;
        for service in &self.services {
            if service.scheduled.is_empty() {
                write!(f, "{:>3} min", service.time_to_station / 60)?;
            } else {
                write!(f, "{:<7}", service.scheduled)?;
            }
            write!(f, " {}", service.destination)?;
            if !service.via.is_empty() {
                write!(f, " ({})", service.via)?;
            }
            if !service.platform.is_empty() {
                write!(f, "  plat {}", service.platform)?;
            }
            if service.cancelled {
                write!(f, "  Cancelled")?;
            } else if !service.estimated.is_empty() {
                write!(f, "  {}", service.estimated)?;
            }
            writeln!(f)?;
        }
        for message in &self.messages {
            writeln!(f, "* {message}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(time: &str, dest: &str) -> ServiceEntry {
        let mut e = ServiceEntry::default();
        e.scheduled.set(time);
        e.destination.set(dest);
        e.estimated.set("On time");
        e
    }

    #[test]
    fn push_drops_beyond_capacity() {
        let mut board = StationRecord::new();
        for i in 0..MAX_SERVICES + 3 {
            let accepted = board.push_service(entry("10:00", &format!("Dest {i}")));
            assert_eq!(accepted, i < MAX_SERVICES);
        }
        assert_eq!(board.services.len(), MAX_SERVICES);
        assert_eq!(board.services[MAX_SERVICES - 1].destination, "Dest 8");
    }

    #[test]
    fn delete_shifts_down() {
        let mut board = StationRecord::new();
        board.push_service(entry("10:00", "A"));
        board.push_service(entry("10:05", "B"));
        board.push_service(entry("10:10", "C"));

        board.delete_service(1);
        let dests: Vec<&str> = board.services.iter().map(|s| s.destination.as_str()).collect();
        assert_eq!(dests, ["A", "C"]);

        board.delete_service(7);
        assert_eq!(board.services.len(), 2);
    }

    #[test]
    fn sort_is_stable_and_numeric() {
        let mut board = StationRecord::new();
        board.push_service(entry("10:15", "Late"));
        board.push_service(entry("9:50", "Early"));
        board.push_service(entry("10:15", "Late too"));
        board.sort_by_schedule();

        let dests: Vec<&str> = board.services.iter().map(|s| s.destination.as_str()).collect();
        assert_eq!(dests, ["Early", "Late", "Late too"]);
    }

    #[test]
    fn classes_bitmask() {
        let mut classes = Classes::default();
        classes.insert(Classes::from_coach_class("Standard").unwrap());
        assert_eq!(classes.bits(), 0b10);
        classes.insert(Classes::FIRST);
        assert!(classes.contains(Classes::FIRST));
        assert!(classes.contains(Classes::STANDARD));
        assert!(Classes::from_coach_class("Sleeper").is_none());
    }

    #[test]
    fn text_rendering() {
        let mut board = StationRecord::new();
        board.location.set("Reading");
        let mut rail = entry("10:15", "Bristol Temple Meads");
        rail.platform.set("4");
        board.push_service(rail);
        let mut tube = ServiceEntry::default();
        tube.destination.set("Brixton");
        tube.via.set("Victoria");
        tube.time_to_station = 125;
        board.push_service(tube);
        board.push_message("Lifts out of order");

        assert_eq!(
            board.to_string(),
            "Reading\n\
             10:15   Bristol Temple Meads  plat 4  On time\n  \
             2 min Brixton (Victoria)\n\
             * Lifts out of order\n"
        );
    }

    #[test]
    fn same_content_ignores_changed_flag() {
        let mut a = StationRecord::new();
        a.location.set("Reading");
        let mut b = a.clone();
        b.board_changed = true;
        assert!(a.same_content(&b));

        b.location.set("Readinh");
        assert!(!a.same_content(&b));
    }
}
