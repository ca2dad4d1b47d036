//! Session bookkeeping for the MIDI hub.
//!
//! Tracks per-peer RTP-MIDI state and walks recovery journals to classify
//! packet loss.
//!
//! ```ignore
//! use midihub_journal::{MidiPacket, PeerId, SessionRegistry};
//!
//! let mut sessions = SessionRegistry::new();
//! let peer = PeerId::from("Keyboard");
//! sessions.on_connect(peer.clone());
//!
//! let outcome = sessions.receive(&peer, &packet)?;
//! if !outcome.is_accepted() {
//!     // stale packet, nothing applied
//! }
//! ```

pub mod error;
pub use error::{DecodeError, Error, Result};

pub mod channel;
pub use channel::{ChannelState, CHANNEL_COUNT, PITCH_WHEEL_CENTER};

mod command;
pub use command::MidiCommand;

mod packet;
pub use packet::{CommandList, MidiPacket};

pub mod journal;
pub use journal::{
    decode_journal, JournalDecoder, JournalReport, LossKind, PacketOutcome, Verdict,
};

mod session;
pub use session::{PeerId, PeerSession, SessionRegistry};

// Re-export the upstream message types so callers don't need midi-msg directly
pub use midi_msg::{Channel, ChannelVoiceMsg, ControlChange};
