//! Per-peer session state and the registry that owns it.
//!
//! The registry is single-writer: only the control loop touches it. Threads
//! that see peer traffic hand events over a channel instead of calling in.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fmt;

use midi_msg::{ChannelVoiceMsg, ControlChange};

use crate::channel::{ChannelState, CHANNEL_COUNT};
use crate::command::MidiCommand;
use crate::error::{Error, Result};
use crate::journal::{JournalDecoder, PacketOutcome};
use crate::packet::MidiPacket;

/// Identity of a remote RTP-MIDI participant (its announced session name).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PeerId(String);

impl PeerId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for PeerId {
    fn from(name: &str) -> Self {
        Self(name.to_string())
    }
}

impl From<String> for PeerId {
    fn from(name: String) -> Self {
        Self(name)
    }
}

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// State kept for one connected peer.
#[derive(Debug, Clone)]
pub struct PeerSession {
    peer: PeerId,
    last_sequence: Option<u16>,
    channels: Vec<ChannelState>,
}

impl PeerSession {
    pub fn new(peer: PeerId) -> Self {
        Self {
            peer,
            last_sequence: None,
            channels: vec![ChannelState::default(); CHANNEL_COUNT],
        }
    }

    #[inline]
    pub fn peer_id(&self) -> &PeerId {
        &self.peer
    }

    /// `None` until the first packet arrives.
    #[inline]
    pub fn last_sequence(&self) -> Option<u16> {
        self.last_sequence
    }

    #[inline]
    pub fn is_synced(&self) -> bool {
        self.last_sequence.is_some()
    }

    pub(crate) fn set_last_sequence(&mut self, sequence: u16) {
        self.last_sequence = Some(sequence);
    }

    /// Channel 0-15; out of range channels wrap.
    pub fn channel(&self, channel: u8) -> &ChannelState {
        &self.channels[usize::from(channel) % CHANNEL_COUNT]
    }

    /// Note-offs for every note this peer left sounding, channel by channel.
    pub fn release_commands(&self) -> impl Iterator<Item = MidiCommand> + '_ {
        self.channels.iter().zip(0u8..).flat_map(|(state, channel)| {
            state
                .sounding_notes()
                .map(move |note| MidiCommand::note_off(channel, note, 0))
        })
    }

    /// Update the channel fields touched by `command`.
    ///
    /// Aftertouch has no tracked field and leaves the state alone.
    pub fn apply(&mut self, command: &MidiCommand) {
        let sequence = self.last_sequence;
        let state = &mut self.channels[usize::from(command.channel_num()) % CHANNEL_COUNT];

        match command.msg {
            ChannelVoiceMsg::NoteOn { note, velocity } => state.note_on(note, velocity, sequence),
            ChannelVoiceMsg::NoteOff { note, .. } => state.note_off(note, sequence),
            ChannelVoiceMsg::PitchBend { bend } => state.pitch_bend(bend),
            ChannelVoiceMsg::ControlChange {
                control: ControlChange::CC { control, value },
            } => state.control_change(control, value),
            ChannelVoiceMsg::ProgramChange { program } => state.program_change(program),
            ChannelVoiceMsg::PolyPressure { .. } | ChannelVoiceMsg::ChannelPressure { .. } => {}
            other => tracing::debug!("{}: not tracking {:?}", self.peer, other),
        }
    }
}

/// Owns every [`PeerSession`], keyed by peer identity.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: HashMap<PeerId, PeerSession>,
    decoder: JournalDecoder,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a fresh session. A reconnecting peer loses its old state.
    pub fn on_connect(&mut self, peer: PeerId) -> &mut PeerSession {
        tracing::info!("Peer connected: {}", peer);
        match self.sessions.entry(peer) {
            Entry::Occupied(mut entry) => {
                tracing::debug!("{} reconnected - resetting session", entry.key());
                let fresh = PeerSession::new(entry.key().clone());
                entry.insert(fresh);
                entry.into_mut()
            }
            Entry::Vacant(entry) => {
                let session = PeerSession::new(entry.key().clone());
                entry.insert(session)
            }
        }
    }

    /// Drop the peer's session. Returns `false` if there was none.
    pub fn on_disconnect(&mut self, peer: &PeerId) -> bool {
        tracing::info!("Peer disconnected: {}", peer);
        self.sessions.remove(peer).is_some()
    }

    pub fn apply(&mut self, peer: &PeerId, command: &MidiCommand) -> Result<()> {
        let session = self
            .sessions
            .get_mut(peer)
            .ok_or_else(|| Error::UnknownPeer(peer.clone()))?;
        session.apply(command);
        Ok(())
    }

    /// Sequence an inbound packet and, if accepted, apply its commands.
    pub fn receive(&mut self, peer: &PeerId, packet: &MidiPacket) -> Result<PacketOutcome> {
        let session = self
            .sessions
            .get_mut(peer)
            .ok_or_else(|| Error::UnknownPeer(peer.clone()))?;

        let outcome = self.decoder.process(session, packet);
        if outcome.is_accepted() {
            for command in &packet.commands {
                session.apply(command);
            }
        }
        Ok(outcome)
    }

    pub fn get(&self, peer: &PeerId) -> Option<&PeerSession> {
        self.sessions.get(peer)
    }

    pub fn contains(&self, peer: &PeerId) -> bool {
        self.sessions.contains_key(peer)
    }

    pub fn peers(&self) -> impl Iterator<Item = &PeerId> {
        self.sessions.keys()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
