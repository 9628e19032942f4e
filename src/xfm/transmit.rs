// Sending patches to the device.
//
// The device doesn't acknowledge anything, it just needs some time
// between messages. A transmitter sends the three messages of a patch
// with a delay in between, and doesn't let another patch cut in.

use std::io;
use std::sync::Mutex;
use std::thread;
use std::time::Duration;
use log::info;

use crate::xfm::patch::Patch;
use crate::xfm::sysex::encode_outbound_patch;

/// Destination for raw MIDI bytes, like an open output port.
pub trait MidiOutput {
    fn send_raw(&mut self, data: &[u8]) -> io::Result<()>;
}

/// Collects everything that is sent. Handy for writing .syx files.
impl MidiOutput for Vec<Vec<u8>> {
    fn send_raw(&mut self, data: &[u8]) -> io::Result<()> {
        self.push(data.to_vec());
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct TransmitterConfig {
    pub message_delay: Duration,  // between consecutive messages of a patch
    pub log_sysex: bool,
}

impl Default for TransmitterConfig {
    fn default() -> Self {
        Self {
            message_delay: Duration::from_micros(16_700),
            log_sysex: false,
        }
    }
}

pub struct Transmitter<O: MidiOutput> {
    output: Mutex<O>,
    config: TransmitterConfig,
}

impl<O: MidiOutput> Transmitter<O> {
    pub fn new(output: O, config: TransmitterConfig) -> Self {
        Self { output: Mutex::new(output), config }
    }

    pub fn config(&self) -> &TransmitterConfig {
        &self.config
    }

    /// Sends a patch as three messages, in order.
    /// The output stays locked until the last message is out.
    pub fn send_patch(&self, patch: &Patch) -> io::Result<()> {
        let messages = encode_outbound_patch(patch);

        // A panic elsewhere doesn't leave the port in a bad state
        let mut output = self.output.lock().unwrap_or_else(|e| e.into_inner());

        for (index, message) in messages.iter().enumerate() {
            if index > 0 && !self.config.message_delay.is_zero() {
                thread::sleep(self.config.message_delay);
            }
            if self.config.log_sysex {
                info!("SysEx out ({} bytes): {:02X?}", message.len(), message);
            }
            output.send_raw(message)?;
        }

        Ok(())
    }

    /// Gives back the output.
    pub fn into_inner(self) -> O {
        self.output.into_inner().unwrap_or_else(|e| e.into_inner())
    }
}
