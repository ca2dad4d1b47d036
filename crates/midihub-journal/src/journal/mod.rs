//! Recovery journal decoding and per-peer sequence continuity.
//!
//! Decoding is diagnostic: the journal is walked to classify and report what
//! a gap in the sequence lost, never to replay the lost events.

mod chapter;
mod header;

pub use chapter::{decode_chapters, ChannelReport, Chapter, ChapterFlags, NoteLog, ProgramLog};
pub use header::{ChannelJournalHeader, JournalHeader};

use header::{CHANNEL_HEADER_LEN, JOURNAL_HEADER_LEN};

use crate::error::DecodeError;
use crate::packet::MidiPacket;
use crate::session::{PeerId, PeerSession};

/// Everything decoded from one recovery journal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JournalReport {
    pub header: JournalHeader,
    /// Length of the system journal, header included.
    pub system_journal_len: Option<usize>,
    pub channels: Vec<ChannelReport>,
    /// Set when the channel journal list could not be walked to the end.
    pub error: Option<DecodeError>,
}

/// Decode a raw recovery journal.
///
/// Only a malformed top-level header is an error; problems inside a channel
/// journal end up on the report.
pub fn decode_journal(bytes: &[u8]) -> Result<JournalReport, DecodeError> {
    let header = JournalHeader::parse(bytes)?;
    let mut report = JournalReport {
        header,
        system_journal_len: None,
        channels: Vec::with_capacity(header.channel_count()),
        error: None,
    };
    let mut cursor = JOURNAL_HEADER_LEN;

    if header.system_journal {
        match header::system_journal_length(&bytes[cursor..]) {
            Ok(length) => {
                report.system_journal_len = Some(length);
                cursor += length;
            }
            Err(e) => {
                report.error = Some(e);
                return Ok(report);
            }
        }
    }

    for _ in 0..header.channel_count() {
        let rest = bytes.get(cursor..).unwrap_or_default();
        let channel_header = match ChannelJournalHeader::parse(rest) {
            Ok(h) => h,
            Err(e) => {
                report.error = Some(e);
                break;
            }
        };

        let end = channel_header.length.min(rest.len());
        let mut channel = decode_chapters(
            channel_header.channel,
            channel_header.chapters,
            &rest[CHANNEL_HEADER_LEN..end],
        );
        channel.enhanced_control = channel_header.enhanced_control;
        report.channels.push(channel);
        cursor += channel_header.length;
    }

    Ok(report)
}

/// How a packet's loss was classified.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LossKind {
    /// Gap with no journal to recover from.
    Unrecoverable { missing: u16 },
    /// Exactly one packet missing and the journal's S bit confirms it.
    SinglePacket,
    /// Gap covered by a journal, decoded best-effort.
    MultiPacket { missing: u16 },
}

/// Sequencing verdict for one inbound packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// First packet from the peer; recorded unconditionally.
    First,
    InOrder,
    Loss(LossKind),
    /// Behind or equal to the last accepted packet.
    Stale { last: u16 },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PacketOutcome {
    pub verdict: Verdict,
    pub report: Option<JournalReport>,
}

impl PacketOutcome {
    #[inline]
    pub fn is_accepted(&self) -> bool {
        !matches!(self.verdict, Verdict::Stale { .. })
    }
}

/// Sequence checker and journal walker for a single peer's packets.
///
/// Holds no state of its own: the last sequence number lives on the
/// [`PeerSession`], so one decoder serves every peer.
#[derive(Debug, Default, Clone, Copy)]
pub struct JournalDecoder;

impl JournalDecoder {
    pub fn new() -> Self {
        Self
    }

    /// Classify `packet` against the session's last sequence number and
    /// advance it if the packet is accepted.
    pub fn process(&self, session: &mut PeerSession, packet: &MidiPacket) -> PacketOutcome {
        let sequence = packet.sequence_number;
        let peer = session.peer_id().clone();

        let Some(last) = session.last_sequence() else {
            session.set_last_sequence(sequence);
            tracing::debug!("{}: first packet seq={}", peer, sequence);
            return PacketOutcome {
                verdict: Verdict::First,
                report: None,
            };
        };

        // Serial-number comparison so 65535 -> 0 counts as in order
        let delta = sequence.wrapping_sub(last) as i16;
        if delta <= 0 {
            tracing::debug!("{}: seq={} <= last={} - skipping", peer, sequence, last);
            return PacketOutcome {
                verdict: Verdict::Stale { last },
                report: None,
            };
        }

        let report = packet.journal().and_then(|bytes| match decode_journal(bytes) {
            Ok(report) => Some(report),
            Err(e) => {
                tracing::warn!("{}: unreadable recovery journal: {}", peer, e);
                None
            }
        });

        let verdict = if delta == 1 {
            Verdict::InOrder
        } else {
            let missing = (delta - 1) as u16;
            Verdict::Loss(classify_gap(&peer, sequence, last, missing, report.as_ref()))
        };

        if let Some(report) = &report {
            log_report(&peer, report);
        }

        session.set_last_sequence(sequence);
        PacketOutcome { verdict, report }
    }
}

fn classify_gap(
    peer: &PeerId,
    sequence: u16,
    last: u16,
    missing: u16,
    report: Option<&JournalReport>,
) -> LossKind {
    match report {
        None => {
            tracing::warn!(
                "{}: missed {} packet(s) before seq={} but no journal present - continuing",
                peer,
                missing,
                sequence
            );
            LossKind::Unrecoverable { missing }
        }
        Some(report) if report.header.single_loss && missing == 1 => {
            tracing::warn!("{}: single packet loss before seq={} - continuing", peer, sequence);
            LossKind::SinglePacket
        }
        Some(_) => {
            tracing::warn!(
                "{}: seq={} > last={} ({} missing) - processing journal",
                peer,
                sequence,
                last,
                missing
            );
            LossKind::MultiPacket { missing }
        }
    }
}

fn log_report(peer: &PeerId, report: &JournalReport) {
    if report.header.is_empty() {
        tracing::debug!("{}: empty journal", peer);
    }
    if let Some(len) = report.system_journal_len {
        tracing::debug!("{}: system journal, {} bytes", peer, len);
    }
    for channel in &report.channels {
        let chapters: Vec<String> = channel.chapters.iter().map(|c| c.to_string()).collect();
        tracing::debug!(
            "{}: channel {} journal [{}] consumed {} bytes",
            peer,
            channel.channel,
            chapters.join(", "),
            channel.consumed
        );
        if let Some(e) = &channel.error {
            tracing::warn!("{}: channel {} journal: {}", peer, channel.channel, e);
        }
    }
    if let Some(e) = &report.error {
        tracing::warn!("{}: journal: {}", peer, e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn channel_journal(channel: u8, flags: u8, body: &[u8]) -> Vec<u8> {
        let length = CHANNEL_HEADER_LEN + body.len();
        let mut out = vec![
            (channel << 3) | ((length >> 8) as u8 & 0x03),
            (length & 0xff) as u8,
            flags,
        ];
        out.extend_from_slice(body);
        out
    }

    fn session() -> PeerSession {
        PeerSession::new(PeerId::from("peer"))
    }

    #[test]
    fn test_decode_single_channel_journal() {
        let mut bytes = vec![0x20, 0x00, 0x05];
        bytes.extend(channel_journal(2, Chapter::Wheel.flag(), &[0x10, 0x20]));

        let report = decode_journal(&bytes).unwrap();
        assert_eq!(report.channels.len(), 1);
        assert_eq!(report.channels[0].channel, 2);
        assert_eq!(report.channels[0].pitch_wheel, Some(4128));
        assert_eq!(report.channels[0].consumed, 2);
        assert!(report.error.is_none());
    }

    #[test]
    fn test_decode_skips_system_journal() {
        // Y and A set, system journal of 4 bytes, one channel journal
        let mut bytes = vec![0x60, 0x00, 0x00, 0x00, 0x04, 0xEE, 0xEE];
        bytes.extend(channel_journal(0, Chapter::Touch.flag(), &[0x12]));

        let report = decode_journal(&bytes).unwrap();
        assert_eq!(report.system_journal_len, Some(4));
        assert_eq!(report.channels[0].channel_pressure, Some(0x12));
    }

    #[test]
    fn test_decode_two_channels() {
        let mut bytes = vec![0x21, 0x00, 0x00];
        bytes.extend(channel_journal(0, Chapter::Touch.flag(), &[0x01]));
        bytes.extend(channel_journal(9, Chapter::Touch.flag(), &[0x02]));

        let report = decode_journal(&bytes).unwrap();
        let pressures: Vec<_> = report
            .channels
            .iter()
            .map(|c| (c.channel, c.channel_pressure))
            .collect();
        assert_eq!(pressures, vec![(0, Some(1)), (9, Some(2))]);
    }

    #[test]
    fn test_decode_missing_channel_journal() {
        // TOTCHAN says two channels, only one present
        let mut bytes = vec![0x21, 0x00, 0x00];
        bytes.extend(channel_journal(0, 0, &[]));

        let report = decode_journal(&bytes).unwrap();
        assert_eq!(report.channels.len(), 1);
        assert!(matches!(report.error, Some(DecodeError::Header { .. })));
    }

    #[test]
    fn test_first_packet_recorded_unconditionally() {
        let mut s = session();
        let packet = MidiPacket::new(100).with_journal(vec![0xff]);
        let outcome = JournalDecoder.process(&mut s, &packet);
        assert_eq!(outcome.verdict, Verdict::First);
        assert!(outcome.report.is_none());
        assert_eq!(s.last_sequence(), Some(100));
    }

    #[test]
    fn test_in_order_sequence() {
        let mut s = session();
        for seq in [100, 101, 102] {
            assert!(JournalDecoder.process(&mut s, &MidiPacket::new(seq)).is_accepted());
        }
        assert_eq!(s.last_sequence(), Some(102));
    }

    #[test]
    fn test_gap_without_journal() {
        let mut s = session();
        JournalDecoder.process(&mut s, &MidiPacket::new(100));
        let outcome = JournalDecoder.process(&mut s, &MidiPacket::new(102));
        assert_eq!(
            outcome.verdict,
            Verdict::Loss(LossKind::Unrecoverable { missing: 1 })
        );
        assert_eq!(s.last_sequence(), Some(102));
    }

    #[test]
    fn test_stale_packet_rejected() {
        let mut s = session();
        JournalDecoder.process(&mut s, &MidiPacket::new(100));
        let outcome = JournalDecoder.process(&mut s, &MidiPacket::new(99));
        assert_eq!(outcome.verdict, Verdict::Stale { last: 100 });
        assert!(!outcome.is_accepted());
        assert_eq!(s.last_sequence(), Some(100));
    }

    #[test]
    fn test_duplicate_packet_rejected() {
        let mut s = session();
        JournalDecoder.process(&mut s, &MidiPacket::new(100));
        assert!(!JournalDecoder.process(&mut s, &MidiPacket::new(100)).is_accepted());
    }

    #[test]
    fn test_single_loss_confirmed_by_journal() {
        let mut s = session();
        JournalDecoder.process(&mut s, &MidiPacket::new(100));
        let packet = MidiPacket::new(102).with_journal(vec![0x80, 0x00, 0x64]);
        let outcome = JournalDecoder.process(&mut s, &packet);
        assert_eq!(outcome.verdict, Verdict::Loss(LossKind::SinglePacket));
        assert!(outcome.report.is_some());
    }

    #[test]
    fn test_multi_loss_decodes_journal() {
        let mut s = session();
        JournalDecoder.process(&mut s, &MidiPacket::new(100));
        let mut journal = vec![0xA0, 0x00, 0x64];
        journal.extend(channel_journal(0, Chapter::Wheel.flag(), &[0x40, 0x00]));
        let outcome = JournalDecoder.process(&mut s, &MidiPacket::new(105).with_journal(journal));
        assert_eq!(
            outcome.verdict,
            Verdict::Loss(LossKind::MultiPacket { missing: 4 })
        );
        let report = outcome.report.unwrap();
        assert_eq!(report.channels[0].pitch_wheel, Some(0x4000));
        assert_eq!(s.last_sequence(), Some(105));
    }

    #[test]
    fn test_wraparound_is_in_order() {
        let mut s = session();
        JournalDecoder.process(&mut s, &MidiPacket::new(u16::MAX));
        let outcome = JournalDecoder.process(&mut s, &MidiPacket::new(0));
        assert_eq!(outcome.verdict, Verdict::InOrder);
        assert_eq!(s.last_sequence(), Some(0));
    }

    #[test]
    fn test_unreadable_journal_counts_as_absent() {
        let mut s = session();
        JournalDecoder.process(&mut s, &MidiPacket::new(10));
        let outcome = JournalDecoder.process(&mut s, &MidiPacket::new(13).with_journal(vec![0x20]));
        assert_eq!(
            outcome.verdict,
            Verdict::Loss(LossKind::Unrecoverable { missing: 2 })
        );
    }
}
