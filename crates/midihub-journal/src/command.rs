//! MIDI channel voice commands carried inside RTP-MIDI packets.

use midi_msg::{Channel, ChannelVoiceMsg, ControlChange};

/// A single channel voice command, as handed over by the RTP-MIDI codec.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MidiCommand {
    pub channel: Channel,
    pub msg: ChannelVoiceMsg,
}

impl MidiCommand {
    #[inline]
    pub fn new(channel: Channel, msg: ChannelVoiceMsg) -> Self {
        Self { channel, msg }
    }

    #[inline]
    pub fn note_on(channel: u8, note: u8, velocity: u8) -> Self {
        Self::new(
            Channel::from_u8(channel),
            ChannelVoiceMsg::NoteOn { note, velocity },
        )
    }

    #[inline]
    pub fn note_off(channel: u8, note: u8, velocity: u8) -> Self {
        Self::new(
            Channel::from_u8(channel),
            ChannelVoiceMsg::NoteOff { note, velocity },
        )
    }

    #[inline]
    pub fn control_change(channel: u8, control: u8, value: u8) -> Self {
        Self::new(
            Channel::from_u8(channel),
            ChannelVoiceMsg::ControlChange {
                control: ControlChange::CC { control, value },
            },
        )
    }

    /// 14-bit bend, 0x2000 is center.
    #[inline]
    pub fn pitch_bend(channel: u8, bend: u16) -> Self {
        Self::new(Channel::from_u8(channel), ChannelVoiceMsg::PitchBend { bend })
    }

    #[inline]
    pub fn poly_aftertouch(channel: u8, note: u8, pressure: u8) -> Self {
        Self::new(
            Channel::from_u8(channel),
            ChannelVoiceMsg::PolyPressure { note, pressure },
        )
    }

    #[inline]
    pub fn aftertouch(channel: u8, pressure: u8) -> Self {
        Self::new(
            Channel::from_u8(channel),
            ChannelVoiceMsg::ChannelPressure { pressure },
        )
    }

    #[inline]
    pub fn program_change(channel: u8, program: u8) -> Self {
        Self::new(
            Channel::from_u8(channel),
            ChannelVoiceMsg::ProgramChange { program },
        )
    }

    /// Channel as 0-15.
    #[inline]
    pub fn channel_num(&self) -> u8 {
        self.channel as u8
    }
}
