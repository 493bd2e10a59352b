//! Concrete output endpoints and the capability set the router forwards through.
//!
//! - [`PortEndpoint`]: hardware-visible destination driven by a dedicated I/O thread.
//!   Supports timestamp scheduling and chunked asynchronous sysex transfers.
//! - [`VirtualEndpoint`]: software-only source. Sends synchronously on the caller's
//!   thread; sysex always goes out as a plain packet.

mod port;
mod virtual_endpoint;

pub use port::PortEndpoint;
pub use virtual_endpoint::VirtualEndpoint;

use crate::destination::MessageDestination;
use crate::error::Result;
use crossbeam_channel::Receiver;
use midiroute_core::{HostClock, MidiMessage, OutputNotification};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EndpointKind {
    Port,
    Virtual,
}

impl EndpointKind {
    pub fn as_str(self) -> &'static str {
        match self {
            EndpointKind::Port => "port",
            EndpointKind::Virtual => "virtual",
        }
    }
}

impl std::fmt::Display for EndpointKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Operations only some endpoints can perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    /// Stream sysex in chunks on the I/O thread and emit lifecycle notifications.
    AsyncSysEx,
    /// Cancel an in-flight sysex transfer.
    SysExCancel,
    /// Drop scheduled-but-undelivered packets.
    FlushOutput,
    /// Adjust the gap between sysex chunks.
    SysExPacing,
}

impl Capability {
    pub const ALL: [Capability; 4] = [
        Capability::AsyncSysEx,
        Capability::SysExCancel,
        Capability::FlushOutput,
        Capability::SysExPacing,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Capability::AsyncSysEx => "asynchronous sysex",
            Capability::SysExCancel => "sysex cancellation",
            Capability::FlushOutput => "flush output",
            Capability::SysExPacing => "sysex pacing",
        }
    }
}

/// Exactly one endpoint kind, exclusively owned by whoever holds it.
#[derive(Debug)]
pub enum OutputEndpoint {
    Port(PortEndpoint),
    Virtual(VirtualEndpoint),
}

impl OutputEndpoint {
    pub fn kind(&self) -> EndpointKind {
        match self {
            OutputEndpoint::Port(_) => EndpointKind::Port,
            OutputEndpoint::Virtual(_) => EndpointKind::Virtual,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            OutputEndpoint::Port(port) => port.name(),
            OutputEndpoint::Virtual(virt) => virt.name(),
        }
    }

    pub fn clock(&self) -> Arc<dyn HostClock> {
        match self {
            OutputEndpoint::Port(port) => port.clock(),
            OutputEndpoint::Virtual(virt) => virt.clock(),
        }
    }

    /// `AsyncSysEx` is asked of the transport each time; the rest are fixed per kind.
    pub fn supports(&self, capability: Capability) -> bool {
        match (self, capability) {
            (OutputEndpoint::Port(port), Capability::AsyncSysEx) => {
                port.can_send_sysex_asynchronously()
            }
            (OutputEndpoint::Port(_), _) => true,
            (OutputEndpoint::Virtual(_), _) => false,
        }
    }

    #[inline]
    pub fn can_send_sysex_asynchronously(&self) -> bool {
        self.supports(Capability::AsyncSysEx)
    }

    /// Immediate-packet path. Sysex is sent whole as a plain packet.
    pub fn send(&self, message: &MidiMessage) -> Result<()> {
        match self {
            OutputEndpoint::Port(port) => port.send(message),
            OutputEndpoint::Virtual(virt) => virt.send(message),
        }
    }

    /// Lifecycle notifications, if this endpoint emits any.
    pub fn subscribe(&self) -> Option<Receiver<OutputNotification>> {
        match self {
            OutputEndpoint::Port(port) => Some(port.subscribe()),
            OutputEndpoint::Virtual(_) => None,
        }
    }

    pub fn as_port(&self) -> Option<&PortEndpoint> {
        match self {
            OutputEndpoint::Port(port) => Some(port),
            OutputEndpoint::Virtual(_) => None,
        }
    }
}

impl From<PortEndpoint> for OutputEndpoint {
    fn from(port: PortEndpoint) -> Self {
        OutputEndpoint::Port(port)
    }
}

impl From<VirtualEndpoint> for OutputEndpoint {
    fn from(virt: VirtualEndpoint) -> Self {
        OutputEndpoint::Virtual(virt)
    }
}

impl MessageDestination for OutputEndpoint {
    fn take_message(&self, message: MidiMessage) -> Result<()> {
        self.send(&message)
    }
}
