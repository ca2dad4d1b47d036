//! Channel journal chapters (RFC 6295 Appendix A).
//!
//! Chapters are not self-delimiting as a group: each one must be walked in the
//! fixed P, C, M, W, N, E, T, A order to find where the next one starts.

use std::fmt;

use smallvec::SmallVec;

use crate::error::DecodeError;

const NOTE_HEADER_LEN: usize = 2;
const NOTE_LOG_LEN: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Chapter {
    Program,
    Control,
    Parameter,
    Wheel,
    Note,
    Extra,
    Touch,
    Aftertouch,
}

impl Chapter {
    /// Decode order, which is also flag-bit order from the MSB down.
    pub const ORDER: [Chapter; 8] = [
        Chapter::Program,
        Chapter::Control,
        Chapter::Parameter,
        Chapter::Wheel,
        Chapter::Note,
        Chapter::Extra,
        Chapter::Touch,
        Chapter::Aftertouch,
    ];

    #[inline]
    pub fn flag(self) -> u8 {
        0x80 >> (self as u8)
    }
}

impl fmt::Display for Chapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Chapter::Program => write!(f, "program change"),
            Chapter::Control => write!(f, "control change"),
            Chapter::Parameter => write!(f, "parameter system"),
            Chapter::Wheel => write!(f, "pitch wheel"),
            Chapter::Note => write!(f, "note on/off"),
            Chapter::Extra => write!(f, "note extras"),
            Chapter::Touch => write!(f, "channel aftertouch"),
            Chapter::Aftertouch => write!(f, "poly aftertouch"),
        }
    }
}

/// The P C M W N E T A presence byte of a channel journal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChapterFlags(u8);

impl ChapterFlags {
    #[inline]
    pub fn from_bits(bits: u8) -> Self {
        Self(bits)
    }

    #[inline]
    pub fn bits(self) -> u8 {
        self.0
    }

    #[inline]
    pub fn contains(self, chapter: Chapter) -> bool {
        self.0 & chapter.flag() != 0
    }

    pub fn with(self, chapter: Chapter) -> Self {
        Self(self.0 | chapter.flag())
    }

    /// Present chapters, in decode order.
    pub fn iter(self) -> impl Iterator<Item = Chapter> {
        Chapter::ORDER
            .into_iter()
            .filter(move |chapter| self.contains(*chapter))
    }
}

/// Chapter P contents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgramLog {
    pub program: u8,
    pub bank_msb: u8,
    pub bank_lsb: u8,
}

/// One entry of the Chapter N note log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NoteLog {
    pub note: u8,
    pub velocity: u8,
}

/// What one channel journal told us about the packets we missed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChannelReport {
    pub channel: u8,
    pub chapters: ChapterFlags,
    pub enhanced_control: bool,
    pub program: Option<ProgramLog>,
    pub pitch_wheel: Option<u16>,
    pub notes: SmallVec<[NoteLog; 8]>,
    /// B bit of Chapter N: the previous packet carried a note-off.
    pub note_off_in_previous: bool,
    pub channel_pressure: Option<u8>,
    /// Per-chapter byte lengths of the variable-size chapters.
    pub chapter_lengths: SmallVec<[(Chapter, usize); 4]>,
    /// Bytes of chapter data walked.
    pub consumed: usize,
    /// Set when the walk stopped early.
    pub error: Option<DecodeError>,
}

struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn remaining(&self) -> usize {
        self.buf.len().saturating_sub(self.pos)
    }

    fn peek(&self, chapter: Chapter, n: usize) -> Result<&'a [u8], DecodeError> {
        self.buf
            .get(self.pos..self.pos + n)
            .ok_or(DecodeError::Truncated {
                chapter,
                needed: n,
                available: self.remaining(),
            })
    }

    fn take(&mut self, chapter: Chapter, n: usize) -> Result<&'a [u8], DecodeError> {
        let bytes = self.peek(chapter, n)?;
        self.pos += n;
        Ok(bytes)
    }

    fn peek_byte(&self, chapter: Chapter) -> Result<u8, DecodeError> {
        self.peek(chapter, 1).map(|b| b[0])
    }
}

/// Walk the chapters named by `flags` over `body` (channel journal minus header).
///
/// Decoding stops at the first malformed chapter; whatever was decoded up to
/// that point is kept and the error is recorded on the report.
pub fn decode_chapters(channel: u8, flags: ChapterFlags, body: &[u8]) -> ChannelReport {
    let mut report = ChannelReport {
        channel,
        chapters: flags,
        ..Default::default()
    };
    let mut reader = Reader::new(body);

    for chapter in flags.iter() {
        if let Err(e) = decode_chapter(chapter, &mut reader, &mut report) {
            report.error = Some(e);
            break;
        }
    }

    report.consumed = reader.pos;
    report
}

fn decode_chapter(
    chapter: Chapter,
    reader: &mut Reader<'_>,
    report: &mut ChannelReport,
) -> Result<(), DecodeError> {
    match chapter {
        Chapter::Program => {
            let b = reader.take(chapter, 3)?;
            report.program = Some(ProgramLog {
                program: b[0] & 0x7f,
                bank_msb: b[1] & 0x7f,
                bank_lsb: b[2] & 0x7f,
            });
        }
        Chapter::Control | Chapter::Extra | Chapter::Aftertouch => {
            let length = usize::from(reader.peek_byte(chapter)? & 0x7f);
            reader.take(chapter, length)?;
            report.chapter_lengths.push((chapter, length));
        }
        Chapter::Parameter => {
            let b = reader.peek(chapter, 2)?;
            let length = (usize::from(b[0] & 0x03) << 8) | usize::from(b[1]);
            reader.take(chapter, length)?;
            report.chapter_lengths.push((chapter, length));
        }
        Chapter::Wheel => {
            let b = reader.take(chapter, 2)?;
            report.pitch_wheel = Some(u16::from(b[0] & 0x7f) * 256 + u16::from(b[1] & 0x7f));
        }
        Chapter::Note => decode_notes(reader, report)?,
        Chapter::Touch => {
            let b = reader.take(chapter, 1)?;
            report.channel_pressure = Some(b[0] & 0x7f);
        }
    }
    Ok(())
}

fn decode_notes(reader: &mut Reader<'_>, report: &mut ChannelReport) -> Result<(), DecodeError> {
    let header = reader.take(Chapter::Note, NOTE_HEADER_LEN)?;
    report.note_off_in_previous = header[0] & 0x80 != 0;

    let declared = usize::from(header[0] & 0x7f) * NOTE_LOG_LEN;
    if declared > reader.remaining() {
        return Err(DecodeError::NoteLengthOverrun {
            declared,
            available: reader.remaining(),
        });
    }

    let logs = reader.take(Chapter::Note, declared)?;
    report
        .notes
        .extend(logs.chunks_exact(NOTE_LOG_LEN).map(|log| NoteLog {
            note: log[0] & 0x7f,
            velocity: log[1] & 0x7f,
        }));
    report.chapter_lengths.push((Chapter::Note, NOTE_HEADER_LEN + declared));
    Ok(())
}
