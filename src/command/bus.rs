use std::time::Duration;

use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};

use super::types::{Command, CommandSource};
use crate::transport::MixerEngine;

/// A decoded song ready to be installed on the lane
pub struct LoadedSong {
    pub engine: MixerEngine,
    pub title: Option<String>,
}

/// Everything the control lane accepts, in submission order
pub enum LaneMessage {
    Command(Command, CommandSource),
    Install(Box<LoadedSong>),
    /// Acknowledged once every earlier message has executed
    Flush(Sender<()>),
    Shutdown,
}

/// Central command bus feeding the control lane.
///
/// Unbounded: commands are never dropped or coalesced.
pub struct CommandBus {
    tx: Sender<LaneMessage>,
    rx: Receiver<LaneMessage>,
}

impl CommandBus {
    pub fn new() -> Self {
        let (tx, rx) = unbounded();
        Self { tx, rx }
    }

    /// Get a sender that can be cloned and shared
    pub fn sender(&self) -> CommandSender {
        CommandSender {
            tx: self.tx.clone(),
        }
    }

    /// Get a receiver (for the control lane)
    pub fn receiver(&self) -> CommandReceiver {
        CommandReceiver {
            rx: self.rx.clone(),
        }
    }
}

impl Default for CommandBus {
    fn default() -> Self {
        Self::new()
    }
}

/// Cloneable sender for dispatching commands
#[derive(Clone)]
pub struct CommandSender {
    tx: Sender<LaneMessage>,
}

impl CommandSender {
    /// Send a command (non-blocking). False once the lane is gone.
    pub fn send(&self, cmd: Command, source: CommandSource) -> bool {
        self.post(LaneMessage::Command(cmd, source))
    }

    pub fn post(&self, msg: LaneMessage) -> bool {
        match self.tx.send(msg) {
            Ok(()) => true,
            Err(_) => {
                log::warn!("Control lane is gone, dropping message");
                false
            }
        }
    }
}

/// Receiver for consuming lane messages
#[derive(Clone)]
pub struct CommandReceiver {
    rx: Receiver<LaneMessage>,
}

impl CommandReceiver {
    /// Block until the next message; None once every sender is gone
    pub fn recv(&self) -> Option<LaneMessage> {
        self.rx.recv().ok()
    }

    pub fn recv_timeout(&self, timeout: Duration) -> Option<LaneMessage> {
        match self.rx.recv_timeout(timeout) {
            Ok(msg) => Some(msg),
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => None,
        }
    }

    /// Try to receive a message (non-blocking)
    pub fn try_recv(&self) -> Option<LaneMessage> {
        self.rx.try_recv().ok()
    }
}
