//! Inbound RTP-MIDI packet as handed over by the wire codec.

use smallvec::SmallVec;

use crate::command::MidiCommand;

pub type CommandList = SmallVec<[MidiCommand; 4]>;

/// A parsed RTP-MIDI data packet.
///
/// The codec owns framing; this is only the part the session logic reads.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MidiPacket {
    pub sequence_number: u16,
    pub timestamp: u32,
    pub ssrc: u32,
    pub commands: CommandList,
    /// Raw recovery journal section, empty when the J bit was clear.
    pub journal: Vec<u8>,
}

impl MidiPacket {
    pub fn new(sequence_number: u16) -> Self {
        Self {
            sequence_number,
            ..Default::default()
        }
    }

    pub fn with_commands(mut self, commands: impl IntoIterator<Item = MidiCommand>) -> Self {
        self.commands.extend(commands);
        self
    }

    pub fn with_journal(mut self, journal: Vec<u8>) -> Self {
        self.journal = journal;
        self
    }

    pub fn with_ssrc(mut self, ssrc: u32) -> Self {
        self.ssrc = ssrc;
        self
    }

    #[inline]
    pub fn journal(&self) -> Option<&[u8]> {
        if self.journal.is_empty() {
            None
        } else {
            Some(&self.journal)
        }
    }
}
