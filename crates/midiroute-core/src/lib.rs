//! Core types for MIDI output routing.
//!
//! Provides host time and clocks, the opaque outgoing message type, asynchronous
//! sysex send requests, and the lifecycle notifications endpoints emit.
//!
//! # Example
//!
//! ```ignore
//! use midiroute_core::{HostTime, MidiMessage, Notifier, OutputNotification};
//!
//! let msg = MidiMessage::sysex(HostTime::ZERO, &[0x7E, 0x7F, 0x06, 0x01])?;
//! assert!(msg.is_sysex());
//!
//! let notifier: Notifier<OutputNotification> = Notifier::new();
//! let rx = notifier.subscribe();
//! ```

pub mod error;
pub use error::{Error, Result};

pub mod time;
pub use time::{HostClock, HostTime, ManualClock, MonotonicClock};

pub mod message;
pub use message::{MidiMessage, MessageBytes, SYSEX_END, SYSEX_START};

pub mod sysex;
pub use sysex::{RequestId, SysExSendRequest, SysExState};

pub mod notify;
pub use notify::{Notifier, OutputNotification, SysExDisposition};

pub use midi_msg::MidiMsg;
