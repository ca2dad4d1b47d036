//! Recovery journal and channel journal headers (RFC 6295 §5, §A.1).

use crate::error::DecodeError;

pub(crate) const JOURNAL_HEADER_LEN: usize = 3;
pub(crate) const CHANNEL_HEADER_LEN: usize = 3;
pub(crate) const SYSTEM_HEADER_LEN: usize = 2;

const FLAG_SINGLE_LOSS: u8 = 0x80;
const FLAG_SYSTEM: u8 = 0x40;
const FLAG_CHANNELS: u8 = 0x20;
const FLAG_ENHANCED: u8 = 0x10;

/// Top-level recovery journal header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JournalHeader {
    /// S bit: the journal only covers a single lost packet.
    pub single_loss: bool,
    /// Y bit: a system journal follows the header.
    pub system_journal: bool,
    /// A bit: channel journals follow.
    pub channel_journals: bool,
    /// H bit: enhanced Chapter C encoding.
    pub enhanced_control: bool,
    /// TOTCHAN field; channel journal count is this plus one.
    pub total_channels: u8,
    pub checkpoint: u16,
}

impl JournalHeader {
    pub fn parse(bytes: &[u8]) -> Result<Self, DecodeError> {
        let [flags, hi, lo] = match bytes.get(..JOURNAL_HEADER_LEN) {
            Some(&[a, b, c]) => [a, b, c],
            _ => {
                return Err(DecodeError::Header {
                    needed: JOURNAL_HEADER_LEN,
                    available: bytes.len(),
                })
            }
        };

        Ok(Self {
            single_loss: flags & FLAG_SINGLE_LOSS != 0,
            system_journal: flags & FLAG_SYSTEM != 0,
            channel_journals: flags & FLAG_CHANNELS != 0,
            enhanced_control: flags & FLAG_ENHANCED != 0,
            total_channels: flags & 0x0f,
            checkpoint: u16::from_be_bytes([hi, lo]),
        })
    }

    /// Number of channel journals that follow.
    #[inline]
    pub fn channel_count(&self) -> usize {
        if self.channel_journals {
            usize::from(self.total_channels) + 1
        } else {
            0
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        !self.system_journal && !self.channel_journals
    }
}

/// Header of one channel journal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelJournalHeader {
    pub single_loss: bool,
    /// MIDI channel 0-15.
    pub channel: u8,
    pub enhanced_control: bool,
    /// Total length in bytes, header included.
    pub length: usize,
    pub chapters: super::ChapterFlags,
}

impl ChannelJournalHeader {
    pub fn parse(bytes: &[u8]) -> Result<Self, DecodeError> {
        let [b0, b1, b2] = match bytes.get(..CHANNEL_HEADER_LEN) {
            Some(&[a, b, c]) => [a, b, c],
            _ => {
                return Err(DecodeError::Header {
                    needed: CHANNEL_HEADER_LEN,
                    available: bytes.len(),
                })
            }
        };

        let length = (usize::from(b0 & 0x03) << 8) | usize::from(b1);
        if length < CHANNEL_HEADER_LEN {
            return Err(DecodeError::ChannelLength { length });
        }

        Ok(Self {
            single_loss: b0 & 0x80 != 0,
            channel: (b0 >> 3) & 0x0f,
            enhanced_control: b0 & 0x04 != 0,
            length,
            chapters: super::ChapterFlags::from_bits(b2),
        })
    }
}

/// Length of the system journal, header included.
pub(crate) fn system_journal_length(bytes: &[u8]) -> Result<usize, DecodeError> {
    match bytes.get(..SYSTEM_HEADER_LEN) {
        Some(&[b0, b1]) => Ok((usize::from(b0 & 0x03) << 8) | usize::from(b1)),
        _ => Err(DecodeError::Header {
            needed: SYSTEM_HEADER_LEN,
            available: bytes.len(),
        }),
    }
}
