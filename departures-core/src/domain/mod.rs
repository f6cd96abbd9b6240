//! Domain types for the departures board.
//!
//! Everything here is fixed-capacity: a board, its services and its
//! messages live in stack-allocated buffers and truncate on overflow.

mod board;
mod code;
mod publish;
mod text;
mod time;
mod version;

pub use board::{
    Classes, LINE_LEN, LOCATION_LEN, MAX_MESSAGES, MAX_SERVICES, MESSAGE_LEN, Message,
    ServiceEntry, ServiceType, StationRecord,
};
pub use code::UpdateCode;
pub use publish::{BoardPublisher, PRIMARY_SERVICES};
pub use text::{Text, leading_int};
pub use time::schedule_sort_key;
pub use version::Version;
