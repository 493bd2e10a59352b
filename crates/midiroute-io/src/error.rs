//! Error types for the output routing subsystem.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Unsupported operation on {endpoint} endpoint: {operation}")]
    UnsupportedOperation {
        endpoint: &'static str,
        operation: &'static str,
    },

    #[error("MIDI send failed: {0}")]
    SendFailure(String),

    #[error("Sysex transfer {0} still in flight")]
    TransferInFlight(u64),

    #[error("Endpoint closed: {0}")]
    EndpointClosed(String),

    #[error("Invalid message: {0}")]
    InvalidMessage(#[from] midiroute_core::Error),

    #[error("MIDI port error: {0}")]
    MidiPort(String),

    #[error("MIDI device error: {0}")]
    MidiDevice(String),

    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("Failed to spawn thread: {0}")]
    Spawn(#[from] std::io::Error),
}

impl Error {
    #[inline]
    pub fn is_unsupported(&self) -> bool {
        matches!(self, Error::UnsupportedOperation { .. })
    }
}

#[cfg(feature = "midi-io")]
impl From<midir::InitError> for Error {
    fn from(e: midir::InitError) -> Self {
        Error::MidiDevice(e.to_string())
    }
}

#[cfg(feature = "midi-io")]
impl From<midir::ConnectError<midir::MidiOutput>> for Error {
    fn from(e: midir::ConnectError<midir::MidiOutput>) -> Self {
        Error::MidiPort(e.to_string())
    }
}

#[cfg(feature = "midi-io")]
impl From<midir::SendError> for Error {
    fn from(e: midir::SendError) -> Self {
        Error::SendFailure(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
