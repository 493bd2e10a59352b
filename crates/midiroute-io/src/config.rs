//! Router and port endpoint configuration.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// What to do when an asynchronous sysex send is requested while another is in flight.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum InFlightPolicy {
    /// Fail with `Error::TransferInFlight` until the current transfer finishes.
    #[default]
    Reject,
    /// Cancel the current transfer and start the new one.
    Replace,
    /// Hand the new transfer to the endpoint, which runs it after the current one.
    Queue,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouterConfig {
    pub ignores_timestamps: bool,
    pub sends_sysex_asynchronously: bool,
    pub in_flight_policy: InFlightPolicy,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortConfig {
    /// Depth of the I/O thread's command queue.
    pub command_capacity: usize,
    /// Bytes per packet when streaming sysex.
    pub sysex_chunk_size: usize,
    /// Gap between sysex chunks. Slow hardware drops bytes without it.
    pub sysex_chunk_interval_ms: u64,
    /// Wake-up interval while idle.
    pub idle_poll_ms: u64,
    /// Wake-up interval while packets are waiting for their timestamp.
    pub schedule_poll_ms: u64,
}

impl Default for PortConfig {
    fn default() -> Self {
        Self {
            command_capacity: 1024,
            sysex_chunk_size: 256,
            sysex_chunk_interval_ms: 0,
            idle_poll_ms: 100,
            schedule_poll_ms: 1,
        }
    }
}

impl PortConfig {
    pub fn validate(&self) -> Result<()> {
        if self.command_capacity == 0 {
            return Err(Error::InvalidConfig(
                "command_capacity must be at least 1".to_string(),
            ));
        }
        if self.sysex_chunk_size < 4 || self.sysex_chunk_size > 65536 {
            return Err(Error::InvalidConfig(format!(
                "sysex_chunk_size {} out of range (4-65536 bytes)",
                self.sysex_chunk_size
            )));
        }
        if self.idle_poll_ms == 0 || self.schedule_poll_ms == 0 {
            return Err(Error::InvalidConfig(
                "poll intervals must be non-zero".to_string(),
            ));
        }
        if self.schedule_poll_ms > self.idle_poll_ms {
            return Err(Error::InvalidConfig(format!(
                "schedule_poll_ms {} exceeds idle_poll_ms {}",
                self.schedule_poll_ms, self.idle_poll_ms
            )));
        }
        Ok(())
    }

    #[inline]
    pub fn sysex_chunk_interval(&self) -> Duration {
        Duration::from_millis(self.sysex_chunk_interval_ms)
    }

    #[inline]
    pub fn idle_poll(&self) -> Duration {
        Duration::from_millis(self.idle_poll_ms)
    }

    #[inline]
    pub fn schedule_poll(&self) -> Duration {
        Duration::from_millis(self.schedule_poll_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_configs() {
        let router = RouterConfig::default();
        assert!(!router.ignores_timestamps);
        assert!(!router.sends_sysex_asynchronously);
        assert_eq!(router.in_flight_policy, InFlightPolicy::Reject);

        let port = PortConfig::default();
        assert!(port.validate().is_ok());
        assert_eq!(port.sysex_chunk_interval(), Duration::ZERO);
    }

    #[test]
    fn test_port_config_validation() {
        let bad_chunk = PortConfig {
            sysex_chunk_size: 2,
            ..Default::default()
        };
        assert!(matches!(bad_chunk.validate(), Err(Error::InvalidConfig(_))));

        let bad_queue = PortConfig {
            command_capacity: 0,
            ..Default::default()
        };
        assert!(bad_queue.validate().is_err());

        let bad_poll = PortConfig {
            idle_poll_ms: 5,
            schedule_poll_ms: 10,
            ..Default::default()
        };
        assert!(bad_poll.validate().is_err());
    }

    #[test]
    fn test_config_serialization() {
        let config = RouterConfig {
            ignores_timestamps: true,
            sends_sysex_asynchronously: true,
            in_flight_policy: InFlightPolicy::Queue,
        };
        let bytes = bincode::serialize(&config).unwrap();
        let back: RouterConfig = bincode::deserialize(&bytes).unwrap();
        assert_eq!(back, config);
    }
}
