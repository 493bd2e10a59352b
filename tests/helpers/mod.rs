//! Test helpers and fixtures for midiroute integration tests.
//!
//! Everything runs against [`LoopbackTransport`], so no MIDI backend is required.

use midiroute::prelude::*;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// How long to wait for a notification that should arrive.
pub const WAIT: Duration = Duration::from_secs(2);

/// How long to listen before concluding nothing else is coming.
pub const QUIET: Duration = Duration::from_millis(100);

/// Records every packet. Clones share state, so tests keep one to inspect what the
/// endpoint wrote.
#[derive(Clone)]
pub struct LoopbackTransport {
    packets: Arc<Mutex<Vec<Vec<u8>>>>,
    async_sysex: Arc<AtomicBool>,
}

impl LoopbackTransport {
    pub fn new() -> Self {
        Self {
            packets: Arc::new(Mutex::new(Vec::new())),
            async_sysex: Arc::new(AtomicBool::new(true)),
        }
    }

    pub fn packets(&self) -> Vec<Vec<u8>> {
        self.packets.lock().clone()
    }

    pub fn joined(&self) -> Vec<u8> {
        self.packets.lock().concat()
    }

    pub fn set_async_sysex(&self, value: bool) {
        self.async_sysex.store(value, Ordering::SeqCst);
    }
}

impl PacketTransport for LoopbackTransport {
    fn name(&self) -> &str {
        "loopback"
    }

    fn send(&mut self, bytes: &[u8], _timestamp: HostTime) -> midiroute::io::Result<()> {
        self.packets.lock().push(bytes.to_vec());
        Ok(())
    }

    fn supports_async_sysex(&self) -> bool {
        self.async_sysex.load(Ordering::SeqCst)
    }
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

/// A sysex message of exactly `total` bytes, framing included.
pub fn sysex_of_len(total: usize) -> MidiMessage {
    let body: Vec<u8> = (0..total - 2).map(|i| (i % 0x80) as u8).collect();
    MidiMessage::sysex(HostTime::ZERO, &body).unwrap()
}

/// Paced port config so transfers stay in flight long enough to observe.
pub fn slow_port_config(chunk: usize) -> PortConfig {
    PortConfig {
        sysex_chunk_size: chunk,
        sysex_chunk_interval_ms: 20,
        ..Default::default()
    }
}
