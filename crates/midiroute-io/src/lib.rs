//! MIDI output routing.
//!
//! An [`OutputRouter`] presents one send/configure/cancel contract over either a
//! [`PortEndpoint`] (I/O thread, timestamp scheduling, chunked asynchronous sysex) or a
//! [`VirtualEndpoint`] (synchronous, software-only).
//!
//! Feature gates: `midi-io` (hardware transport via midir).

pub mod error;
pub use error::{Error, Result};

pub mod config;
pub use config::{InFlightPolicy, PortConfig, RouterConfig};

mod destination;
pub use destination::MessageDestination;

mod transport;
#[cfg(feature = "midi-io")]
pub use transport::MidirTransport;
pub use transport::PacketTransport;

mod endpoint;
pub use endpoint::{Capability, EndpointKind, OutputEndpoint, PortEndpoint, VirtualEndpoint};

mod router;
pub use router::{OutputRouter, OutputRouterBuilder};

pub use midiroute_core::{
    HostClock, HostTime, ManualClock, MidiMessage, MonotonicClock, Notifier,
    OutputNotification, RequestId, SysExDisposition, SysExSendRequest, SysExState,
};

#[cfg(test)]
mod test_support;
