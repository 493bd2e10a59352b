//! # midiroute - MIDI Output Router
//!
//! One send/configure/cancel contract over two kinds of MIDI output endpoint.
//!
//! ## Architecture
//!
//! midiroute is an umbrella crate that coordinates:
//! - **midiroute-core** - Host time, messages, sysex send requests, notifications
//! - **midiroute-io** - Port and virtual endpoints, transports, the output router
//!
//! ## Quick Start
//!
//! ```ignore
//! use midiroute::prelude::*;
//!
//! let router = midiroute::connect_port("IAC", PortConfig::default())?;
//! router.set_sends_sysex_asynchronously(true)?;
//!
//! let events = router.subscribe();
//! router.send(MidiMessage::sysex(HostTime::ZERO, &patch_dump)?)?;
//!
//! for event in events.iter() {
//!     if let OutputNotification::FinishedSysExSend { disposition, .. } = event {
//!         println!("transfer finished: {:?}", disposition);
//!         break;
//!     }
//! }
//! ```
//!
//! ## Feature Flags
//!
//! - `default` - Hardware I/O enabled
//! - `midi-io` - midir-backed transports (`connect_port`, `create_virtual_source`)

/// Re-export of midiroute-core for direct access
pub use midiroute_core as core;

/// Re-export of midiroute-io for direct access
pub use midiroute_io as io;

pub use midiroute_core::{
    HostClock, HostTime, ManualClock, MidiMessage, MidiMsg, MonotonicClock, Notifier,
    OutputNotification, RequestId, SysExDisposition, SysExSendRequest, SysExState,
};

pub use midiroute_io::{
    Capability, EndpointKind, InFlightPolicy, MessageDestination, OutputEndpoint, OutputRouter,
    OutputRouterBuilder, PacketTransport, PortConfig, PortEndpoint, RouterConfig,
    VirtualEndpoint,
};

#[cfg(feature = "midi-io")]
pub use midiroute_io::MidirTransport;

mod error;
pub use error::{Error, Result};

mod connect;
pub use connect::router_for;

#[cfg(feature = "midi-io")]
pub use connect::connect_port;

#[cfg(all(feature = "midi-io", unix))]
pub use connect::create_virtual_source;

/// Convenience prelude for common imports
pub mod prelude {
    // Router
    pub use crate::{InFlightPolicy, OutputRouter, OutputRouterBuilder, RouterConfig};

    // Endpoints
    pub use crate::{
        Capability, EndpointKind, OutputEndpoint, PacketTransport, PortConfig, PortEndpoint,
        VirtualEndpoint,
    };

    // Messages and transfers
    pub use crate::{
        HostTime, MidiMessage, OutputNotification, SysExDisposition, SysExSendRequest,
    };

    #[cfg(feature = "midi-io")]
    pub use crate::MidirTransport;
}
