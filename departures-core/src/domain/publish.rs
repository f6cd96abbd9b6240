//! Publishing a freshly parsed board over the live one.
//!
//! Each poll builds a shadow [`StationRecord`]; the live record the display
//! reads is only touched here, once the poll has fully succeeded.

use super::board::StationRecord;
use super::code::UpdateCode;

/// How many leading services an underground board compares by destination.
pub const PRIMARY_SERVICES: usize = 2;

/// Decides whether a shadow board replaces the live one.
#[derive(Debug, Clone)]
pub struct BoardPublisher {
    first_load: bool,
}

impl Default for BoardPublisher {
    fn default() -> Self {
        Self::new()
    }
}

impl BoardPublisher {
    pub fn new() -> Self {
        Self { first_load: true }
    }

    /// True until the first successful publish.
    pub fn is_first_load(&self) -> bool {
        self.first_load
    }

    /// Rail boards: compare every field and copy only on a difference.
    ///
    /// The first publish always copies.
    ///
    /// # Examples
    ///
    /// ```
    /// use departures_core::domain::{BoardPublisher, StationRecord, UpdateCode};
    ///
    /// let mut publisher = BoardPublisher::new();
    /// let mut live = StationRecord::new();
    /// let mut shadow = StationRecord::new();
    /// shadow.location.set("Reading");
    ///
    /// assert_eq!(publisher.publish(shadow.clone(), &mut live), UpdateCode::Success);
    /// assert_eq!(publisher.publish(shadow, &mut live), UpdateCode::NoChange);
    /// assert_eq!(live.location, "Reading");
    /// ```
    pub fn publish(&mut self, mut shadow: StationRecord, live: &mut StationRecord) -> UpdateCode {
        let changed = self.first_load || !live.same_content(&shadow);
        self.first_load = false;
        if changed {
            shadow.board_changed = true;
            *live = shadow;
            UpdateCode::Success
        } else {
            live.board_changed = false;
            UpdateCode::NoChange
        }
    }

    /// Underground boards: services and messages are always copied, but the
    /// board only counts as changed when the service count differs or one
    /// of the first [`PRIMARY_SERVICES`] destinations differs.
    ///
    /// The live location and platform flag are left alone; underground
    /// feeds do not carry them.
    pub fn publish_primary(&mut self, shadow: StationRecord, live: &mut StationRecord) -> UpdateCode {
        let changed = shadow.services.len() != live.services.len()
            || shadow
                .services
                .iter()
                .zip(live.services.iter())
                .take(PRIMARY_SERVICES)
                .any(|(new, old)| new.destination != old.destination);
        self.first_load = false;

        live.services = shadow.services;
        live.messages = shadow.messages;
        live.board_changed = changed;
        if changed {
            UpdateCode::Success
        } else {
            UpdateCode::NoChange
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ServiceEntry;

    fn service(time: &str, dest: &str) -> ServiceEntry {
        let mut e = ServiceEntry::default();
        e.scheduled.set(time);
        e.destination.set(dest);
        e.estimated.set("On time");
        e
    }

    fn board(services: &[(&str, &str)]) -> StationRecord {
        let mut b = StationRecord::new();
        b.location.set("Paddington");
        for (t, d) in services {
            b.push_service(service(t, d));
        }
        b
    }

    #[test]
    fn first_load_always_publishes() {
        let mut publisher = BoardPublisher::new();
        let mut live = StationRecord::new();
        assert_eq!(publisher.publish(StationRecord::new(), &mut live), UpdateCode::Success);
        assert!(!publisher.is_first_load());
        assert!(live.board_changed);
    }

    #[test]
    fn one_character_difference_publishes() {
        let mut publisher = BoardPublisher::new();
        let mut live = StationRecord::new();
        publisher.publish(board(&[("10:00", "Bristol")]), &mut live);

        let mut shadow = board(&[("10:00", "Bristol")]);
        shadow.services[0].platform.set("2");
        assert_eq!(publisher.publish(shadow, &mut live), UpdateCode::Success);
        assert_eq!(live.services[0].platform, "2");
    }

    #[test]
    fn identical_board_is_no_change() {
        let mut publisher = BoardPublisher::new();
        let mut live = StationRecord::new();
        publisher.publish(board(&[("10:00", "Bristol")]), &mut live);
        assert_eq!(
            publisher.publish(board(&[("10:00", "Bristol")]), &mut live),
            UpdateCode::NoChange
        );
        assert!(!live.board_changed);
    }

    #[test]
    fn underground_only_checks_leading_destinations() {
        let mut publisher = BoardPublisher::new();
        let mut live = StationRecord::new();
        live.location.set("Oxford Circus");

        let first = board(&[("", "Brixton"), ("", "Walthamstow"), ("", "Brixton")]);
        assert_eq!(publisher.publish_primary(first, &mut live), UpdateCode::Success);
        assert_eq!(live.location, "Oxford Circus");

        // Third destination differs: copied, but not a change
        let third = board(&[("", "Brixton"), ("", "Walthamstow"), ("", "Stockwell")]);
        assert_eq!(publisher.publish_primary(third, &mut live), UpdateCode::NoChange);
        assert_eq!(live.services[2].destination, "Stockwell");
        assert!(!live.board_changed);

        let second = board(&[("", "Brixton"), ("", "Brixton"), ("", "Stockwell")]);
        assert_eq!(publisher.publish_primary(second, &mut live), UpdateCode::Success);
        assert!(live.board_changed);
    }
}
