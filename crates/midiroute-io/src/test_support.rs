//! Shared test doubles.

use crate::error::{Error, Result};
use crate::transport::PacketTransport;
use midiroute_core::HostTime;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Delivered {
    pub bytes: Vec<u8>,
    pub timestamp: HostTime,
}

/// Transport that records every packet. Clones share state.
#[derive(Clone, Default)]
pub(crate) struct RecordingTransport {
    pub delivered: Arc<Mutex<Vec<Delivered>>>,
    pub async_sysex: Arc<AtomicBool>,
    pub fail_sends: Arc<AtomicBool>,
}

impl RecordingTransport {
    pub fn new() -> Self {
        let transport = Self::default();
        transport.async_sysex.store(true, Ordering::SeqCst);
        transport
    }

    pub fn packets(&self) -> Vec<Delivered> {
        self.delivered.lock().clone()
    }

    pub fn total_bytes(&self) -> usize {
        self.delivered.lock().iter().map(|d| d.bytes.len()).sum()
    }
}

impl PacketTransport for RecordingTransport {
    fn name(&self) -> &str {
        "recording"
    }

    fn send(&mut self, bytes: &[u8], timestamp: HostTime) -> Result<()> {
        if self.fail_sends.load(Ordering::SeqCst) {
            return Err(Error::SendFailure("transport offline".to_string()));
        }
        self.delivered.lock().push(Delivered {
            bytes: bytes.to_vec(),
            timestamp,
        });
        Ok(())
    }

    fn supports_async_sysex(&self) -> bool {
        self.async_sysex.load(Ordering::SeqCst)
    }
}
