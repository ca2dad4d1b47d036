//! Stuck-note reset.

use std::ops::Range;

use midihub_journal::{MidiCommand, CHANNEL_COUNT};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NoteRange {
    Low,
    Mid,
    High,
    All,
}

impl NoteRange {
    pub fn notes(self) -> Range<u8> {
        match self {
            Self::Low => 0..43,
            Self::Mid => 43..86,
            Self::High => 86..127,
            Self::All => 0..127,
        }
    }
}

/// Silence a range of notes on every channel of the peer behind `port`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResetRequest {
    pub port: u16,
    pub range: NoteRange,
}

impl ResetRequest {
    pub fn new(port: u16, range: NoteRange) -> Self {
        Self { port, range }
    }

    /// Note-offs for the range, one batch of all channels per note.
    pub fn note_offs(&self) -> impl Iterator<Item = [MidiCommand; CHANNEL_COUNT]> {
        self.range.notes().map(|note| {
            std::array::from_fn(|channel| MidiCommand::note_off(channel as u8, note, 0))
        })
    }
}
