//! Per-channel MIDI state remembered for each peer.

use std::time::Instant;

/// Number of MIDI channels in a session.
pub const CHANNEL_COUNT: usize = 16;

/// Number of note and controller slots per channel.
pub const SLOT_COUNT: usize = 128;

/// Pitch wheel rest position (14-bit center).
pub const PITCH_WHEEL_CENTER: u16 = 0x2000;

const CC_BANK_SELECT_MSB: u8 = 0;
const CC_BANK_SELECT_LSB: u8 = 32;

/// Last known state of one MIDI channel of a peer.
///
/// Slots are `None` until the peer has sent something for them. Note-off is
/// stored as a note-on with velocity 0.
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelState {
    pub pitch_wheel: u16,
    pub note_on_time: [Option<Instant>; SLOT_COUNT],
    pub note_on_sequence: [Option<u16>; SLOT_COUNT],
    pub note_on_velocity: [Option<u8>; SLOT_COUNT],
    pub controller_value: [Option<u8>; SLOT_COUNT],
    pub program_number: Option<u8>,
    pub bank_msb: Option<u8>,
    pub bank_lsb: Option<u8>,
}

impl Default for ChannelState {
    fn default() -> Self {
        Self {
            pitch_wheel: PITCH_WHEEL_CENTER,
            note_on_time: [None; SLOT_COUNT],
            note_on_sequence: [None; SLOT_COUNT],
            note_on_velocity: [None; SLOT_COUNT],
            controller_value: [None; SLOT_COUNT],
            program_number: None,
            bank_msb: None,
            bank_lsb: None,
        }
    }
}

impl ChannelState {
    pub fn note_on(&mut self, note: u8, velocity: u8, sequence: Option<u16>) {
        let slot = usize::from(note) % SLOT_COUNT;
        self.note_on_time[slot] = Some(Instant::now());
        self.note_on_sequence[slot] = sequence;
        self.note_on_velocity[slot] = Some(velocity);
    }

    #[inline]
    pub fn note_off(&mut self, note: u8, sequence: Option<u16>) {
        self.note_on(note, 0, sequence);
    }

    pub fn control_change(&mut self, controller: u8, value: u8) {
        self.controller_value[usize::from(controller) % SLOT_COUNT] = Some(value);
        match controller {
            CC_BANK_SELECT_MSB => self.bank_msb = Some(value),
            CC_BANK_SELECT_LSB => self.bank_lsb = Some(value),
            _ => {}
        }
    }

    #[inline]
    pub fn pitch_bend(&mut self, value: u16) {
        self.pitch_wheel = value & 0x3fff;
    }

    #[inline]
    pub fn program_change(&mut self, program: u8) {
        self.program_number = Some(program);
    }

    /// True if the last event recorded for `note` was a note-on with velocity > 0.
    pub fn is_note_sounding(&self, note: u8) -> bool {
        matches!(self.note_on_velocity[usize::from(note) % SLOT_COUNT], Some(v) if v > 0)
    }

    /// Notes whose last recorded event is a sounding note-on.
    pub fn sounding_notes(&self) -> impl Iterator<Item = u8> + '_ {
        (0..SLOT_COUNT as u8).filter(move |note| self.is_note_sounding(*note))
    }
}
