//! Seam to the RTP-MIDI wire codec and UDP sockets.

use std::time::Duration;

use midihub_journal::{MidiPacket, PeerId};

use crate::error::Result;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    PeerConnected {
        port: u16,
        peer: PeerId,
    },
    PeerDisconnected {
        port: u16,
        peer: PeerId,
    },
    /// A parsed data packet from `peer`.
    Midi {
        port: u16,
        peer: PeerId,
        packet: MidiPacket,
    },
}

impl TransportEvent {
    pub fn port(&self) -> u16 {
        match self {
            Self::PeerConnected { port, .. }
            | Self::PeerDisconnected { port, .. }
            | Self::Midi { port, .. } => *port,
        }
    }
}

/// Sessions on one or more local UDP ports.
pub trait RtpTransport {
    /// Wait at most `timeout` for the next event. `Ok(None)` on timeout.
    fn poll(&mut self, timeout: Duration) -> Result<Option<TransportEvent>>;

    /// Send `packet` to `peer` from local `port`.
    fn send(&mut self, port: u16, peer: &PeerId, packet: &MidiPacket) -> Result<()>;
}
