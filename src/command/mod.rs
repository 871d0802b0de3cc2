pub mod bus;
pub mod types;

pub use bus::{CommandBus, CommandReceiver, CommandSender, LaneMessage, LoadedSong};
pub use types::{Command, CommandSource};
