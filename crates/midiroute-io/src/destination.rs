//! The "accept and send a message" contract consumed by upstream producers.

use crate::error::Result;
use midiroute_core::MidiMessage;

pub trait MessageDestination {
    fn take_message(&self, message: MidiMessage) -> Result<()>;

    /// Stops at the first failure; messages after it are not sent.
    fn take_messages(&self, messages: Vec<MidiMessage>) -> Result<()> {
        for message in messages {
            self.take_message(message)?;
        }
        Ok(())
    }
}
