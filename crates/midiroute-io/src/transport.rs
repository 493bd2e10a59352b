//! Packet transports: the driver-level sink an endpoint writes bytes into.
//!
//! The host MIDI service (or a test double) implements [`PacketTransport`]. With the
//! `midi-io` feature, [`MidirTransport`] adapts a midir output connection.

use crate::error::Result;
use midiroute_core::HostTime;

/// Driver-level MIDI output.
///
/// `timestamp` is the stamp the packet was scheduled for; endpoints only hand a packet
/// over once it is due, so most transports can ignore it.
pub trait PacketTransport: Send {
    fn name(&self) -> &str;

    fn send(&mut self, bytes: &[u8], timestamp: HostTime) -> Result<()>;

    /// Whether a long sysex message may be streamed in chunks. Queried on every call,
    /// since a driver may lose the ability at runtime.
    fn supports_async_sysex(&self) -> bool {
        true
    }

    /// Discard anything buffered but not yet on the wire.
    fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}

impl<T: PacketTransport + ?Sized> PacketTransport for Box<T> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn send(&mut self, bytes: &[u8], timestamp: HostTime) -> Result<()> {
        (**self).send(bytes, timestamp)
    }

    fn supports_async_sysex(&self) -> bool {
        (**self).supports_async_sysex()
    }

    fn flush(&mut self) -> Result<()> {
        (**self).flush()
    }
}

#[cfg(feature = "midi-io")]
pub use midir_transport::MidirTransport;

#[cfg(feature = "midi-io")]
mod midir_transport {
    use super::PacketTransport;
    use crate::error::{Error, Result};
    use midiroute_core::HostTime;
    use midir::{MidiOutput, MidiOutputConnection};
    use tracing::debug;

    const CLIENT_NAME: &str = "midiroute-output";

    /// midir-backed transport. Sysex streaming is done by the port endpoint, so the
    /// connection only ever sees complete packets or sysex chunks.
    pub struct MidirTransport {
        connection: MidiOutputConnection,
        name: String,
    }

    impl MidirTransport {
        pub fn connect(port_index: usize) -> Result<Self> {
            let midi_output = MidiOutput::new(CLIENT_NAME)?;
            let ports = midi_output.ports();
            let port = ports.get(port_index).ok_or_else(|| {
                Error::MidiDevice(format!("MIDI output device {} not found", port_index))
            })?;
            let name = midi_output
                .port_name(port)
                .unwrap_or_else(|_| format!("Device {}", port_index));
            let connection = midi_output.connect(port, CLIENT_NAME)?;
            debug!("Connected MIDI output transport: {}", name);
            Ok(Self { connection, name })
        }

        /// Case-insensitive partial match on the port name.
        pub fn connect_by_name(fragment: &str) -> Result<Self> {
            let midi_output = MidiOutput::new(CLIENT_NAME)?;
            let needle = fragment.to_lowercase();
            let index = midi_output
                .ports()
                .iter()
                .position(|port| {
                    midi_output
                        .port_name(port)
                        .map(|name| name.to_lowercase().contains(&needle))
                        .unwrap_or(false)
                })
                .ok_or_else(|| {
                    Error::MidiDevice(format!(
                        "No MIDI output device found matching '{}'",
                        fragment
                    ))
                })?;
            Self::connect(index)
        }

        /// Publishes a software-only source other applications can read from.
        #[cfg(unix)]
        pub fn create_virtual(name: &str) -> Result<Self> {
            use midir::os::unix::VirtualOutput;

            let midi_output = MidiOutput::new(CLIENT_NAME)?;
            let connection = midi_output.create_virtual(name)?;
            debug!("Created virtual MIDI source: {}", name);
            Ok(Self {
                connection,
                name: name.to_string(),
            })
        }
    }

    impl PacketTransport for MidirTransport {
        fn name(&self) -> &str {
            &self.name
        }

        fn send(&mut self, bytes: &[u8], _timestamp: HostTime) -> Result<()> {
            self.connection.send(bytes)?;
            Ok(())
        }
    }

    impl std::fmt::Debug for MidirTransport {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.debug_struct("MidirTransport")
                .field("name", &self.name)
                .finish()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    struct Counting {
        sent: usize,
    }

    impl PacketTransport for Counting {
        fn name(&self) -> &str {
            "counting"
        }

        fn send(&mut self, bytes: &[u8], _timestamp: HostTime) -> Result<()> {
            if bytes.is_empty() {
                return Err(Error::SendFailure("empty packet".to_string()));
            }
            self.sent += 1;
            Ok(())
        }
    }

    #[test]
    fn test_boxed_transport_forwards() {
        let mut transport: Box<dyn PacketTransport> = Box::new(Counting { sent: 0 });
        assert_eq!(transport.name(), "counting");
        assert!(transport.supports_async_sysex());
        assert!(transport.flush().is_ok());

        transport.send(&[0xF8], HostTime::ZERO).unwrap();
        assert!(matches!(
            transport.send(&[], HostTime::ZERO),
            Err(Error::SendFailure(_))
        ));
    }
}
