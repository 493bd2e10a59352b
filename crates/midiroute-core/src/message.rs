//! Outgoing MIDI message: an opaque byte payload with a delivery timestamp.

use crate::error::{Error, Result};
use crate::time::HostTime;
use midi_msg::MidiMsg;
use smallvec::SmallVec;

pub const SYSEX_START: u8 = 0xF0;
pub const SYSEX_END: u8 = 0xF7;

/// Channel messages fit inline; sysex spills to the heap.
pub type MessageBytes = SmallVec<[u8; 4]>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MidiMessage {
    /// When to deliver. `HostTime::ZERO` means as soon as possible.
    pub timestamp: HostTime,
    bytes: MessageBytes,
}

impl MidiMessage {
    pub fn new(timestamp: HostTime, bytes: impl AsRef<[u8]>) -> Result<Self> {
        let bytes = bytes.as_ref();
        if bytes.is_empty() {
            return Err(Error::EmptyMessage);
        }
        Ok(Self {
            timestamp,
            bytes: SmallVec::from_slice(bytes),
        })
    }

    pub fn immediate(bytes: impl AsRef<[u8]>) -> Result<Self> {
        Self::new(HostTime::ZERO, bytes)
    }

    /// Wraps `body` in `F0 ... F7`. Every body byte must be a 7-bit data byte.
    pub fn sysex(timestamp: HostTime, body: &[u8]) -> Result<Self> {
        if let Some((offset, &byte)) = body.iter().enumerate().find(|(_, b)| **b & 0x80 != 0) {
            return Err(Error::InvalidSysExData { offset, byte });
        }
        let mut bytes = MessageBytes::with_capacity(body.len() + 2);
        bytes.push(SYSEX_START);
        bytes.extend_from_slice(body);
        bytes.push(SYSEX_END);
        Ok(Self { timestamp, bytes })
    }

    pub fn from_msg(timestamp: HostTime, msg: &MidiMsg) -> Result<Self> {
        Self::new(timestamp, msg.to_midi())
    }

    #[inline]
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    #[inline]
    pub fn into_bytes(self) -> MessageBytes {
        self.bytes
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    #[inline]
    pub fn status(&self) -> u8 {
        self.bytes[0]
    }

    #[inline]
    pub fn is_sysex(&self) -> bool {
        self.status() == SYSEX_START
    }

    #[inline]
    pub fn is_immediate(&self) -> bool {
        self.timestamp.is_zero()
    }

    #[inline]
    pub fn with_timestamp(mut self, timestamp: HostTime) -> Self {
        self.timestamp = timestamp;
        self
    }
}

impl AsRef<[u8]> for MidiMessage {
    fn as_ref(&self) -> &[u8] {
        &self.bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use midi_msg::{Channel, ChannelVoiceMsg};

    #[test]
    fn test_empty_message_rejected() {
        assert_eq!(MidiMessage::immediate([]), Err(Error::EmptyMessage));
    }

    #[test]
    fn test_sysex_framing() {
        let msg = MidiMessage::sysex(HostTime::ZERO, &[0x41, 0x10, 0x7F]).unwrap();
        assert_eq!(msg.bytes(), &[0xF0, 0x41, 0x10, 0x7F, 0xF7]);
        assert!(msg.is_sysex());
        assert!(msg.is_immediate());
    }

    #[test]
    fn test_sysex_rejects_status_bytes_in_body() {
        assert_eq!(
            MidiMessage::sysex(HostTime::ZERO, &[0x41, 0x10, 0xFF]),
            Err(Error::InvalidSysExData {
                offset: 2,
                byte: 0xFF
            })
        );
        assert_eq!(
            MidiMessage::sysex(HostTime::ZERO, &[0xF7]),
            Err(Error::InvalidSysExData {
                offset: 0,
                byte: 0xF7
            })
        );
    }

    #[test]
    fn test_channel_message_is_not_sysex() {
        let msg = MidiMessage::immediate([0x90, 60, 100]).unwrap();
        assert!(!msg.is_sysex());
        assert_eq!(msg.status(), 0x90);
        assert_eq!(msg.len(), 3);
    }

    #[test]
    fn test_from_midi_msg() {
        let msg = MidiMsg::ChannelVoice {
            channel: Channel::Ch2,
            msg: ChannelVoiceMsg::NoteOn {
                note: 60,
                velocity: 100,
            },
        };
        let out = MidiMessage::from_msg(HostTime::from_nanos(5), &msg).unwrap();
        assert_eq!(out.bytes(), &[0x91, 60, 100]);
        assert_eq!(out.timestamp.as_nanos(), 5);
    }

    #[test]
    fn test_with_timestamp() {
        let msg = MidiMessage::immediate([0xF8]).unwrap();
        let stamped = msg.with_timestamp(HostTime::from_nanos(42));
        assert!(!stamped.is_immediate());
        assert_eq!(stamped.timestamp.as_nanos(), 42);
    }
}
