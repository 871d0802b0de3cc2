pub mod log;

pub use self::log::{Event, EventLog};
