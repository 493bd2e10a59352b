//! Software-only output. No I/O thread and no notifications: every message, sysex
//! included, goes to the transport on the caller's thread as one plain packet.

use crate::error::Result;
use crate::transport::PacketTransport;
use midiroute_core::{HostClock, MidiMessage, MonotonicClock};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::trace;

pub struct VirtualEndpoint {
    name: String,
    transport: Mutex<Box<dyn PacketTransport>>,
    clock: Arc<dyn HostClock>,
}

impl VirtualEndpoint {
    pub fn new(transport: impl PacketTransport + 'static) -> Self {
        Self::with_clock(transport, Arc::new(MonotonicClock::new()))
    }

    pub fn with_clock(transport: impl PacketTransport + 'static, clock: Arc<dyn HostClock>) -> Self {
        Self {
            name: transport.name().to_string(),
            transport: Mutex::new(Box::new(transport)),
            clock,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn clock(&self) -> Arc<dyn HostClock> {
        Arc::clone(&self.clock)
    }

    /// The stamp is handed to the transport unchanged; unstamped messages get "now".
    pub fn send(&self, message: &MidiMessage) -> Result<()> {
        let timestamp = if message.is_immediate() {
            self.clock.now()
        } else {
            message.timestamp
        };
        if message.is_sysex() {
            trace!(
                "Sending {}-byte sysex as a plain packet on {}",
                message.len(),
                self.name
            );
        }
        self.transport.lock().send(message.bytes(), timestamp)
    }
}

impl std::fmt::Debug for VirtualEndpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VirtualEndpoint")
            .field("name", &self.name)
            .finish()
    }
}
