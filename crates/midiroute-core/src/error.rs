//! Error types for midiroute-core.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("Empty MIDI message")]
    EmptyMessage,

    #[error("Not a system-exclusive message (status byte {0:#04x})")]
    NotSysEx(u8),

    #[error("Sysex data byte {byte:#04x} at offset {offset} has the high bit set")]
    InvalidSysExData { offset: usize, byte: u8 },

    #[error("Sysex request {0} already finished")]
    RequestFinished(u64),
}

pub type Result<T> = std::result::Result<T, Error>;
