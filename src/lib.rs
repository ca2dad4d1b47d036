//! # midihub - Headless RTP-MIDI Hub
//!
//! Lets remote musicians play together through a server with no local MIDI
//! hardware.
//!
//! ## Architecture
//!
//! midihub is an umbrella crate that coordinates:
//! - **midihub-daemon** - Per-port daemon supervision, participant discovery,
//!   mesh wiring, reporting, and the `midihub` binary
//! - **midihub-journal** - Per-peer session state and recovery journal decoding
//! - **midihub-bridge** - Listener/bridge variant that terminates sessions
//!   in-process and talks to a local sequencer
//!
//! ## Quick Start
//!
//! ```ignore
//! use midihub::prelude::*;
//!
//! let (tx, rx) = control_channel();
//! install_signal_handlers(tx)?;
//!
//! let mut hub = Orchestrator::builder(HubConfig::from_env()?).build()?;
//! hub.run(&rx);
//! ```
//!
//! ## Feature Flags
//!
//! - `default` - Hub daemon, session tracking and the bridge
//! - `bridge` - Listener/bridge variant

mod error;
pub use error::{Error, Result};

/// Re-export of midihub-journal for direct access
pub use midihub_journal as journal;

/// Re-export of midihub-daemon for direct access
pub use midihub_daemon as daemon;

// Sessions and journal decoding
pub use midihub_journal::{
    ChannelState, JournalDecoder, JournalReport, LossKind, MidiCommand, MidiPacket,
    PacketOutcome, PeerId, PeerSession, SessionRegistry, Verdict,
};

// Supervision, discovery and mesh
pub use midihub_daemon::{
    control_channel, install_signal_handlers, ControlRequest, HubClient, HubConfig,
    MeshConnector, Orchestrator, OrchestratorBuilder, ParticipantRef, PortConfig, PortPair,
    PortSpec, ProcessSupervisor, TopologyDiscoverer,
};

// Bridge variant
#[cfg(feature = "bridge")]
pub use midihub_bridge as bridge;

#[cfg(feature = "bridge")]
pub use midihub_bridge::{Bridge, BridgeHandle, NoteRange, ResetRequest};

/// Convenience prelude for common imports
pub mod prelude {
    // Hub loop
    pub use crate::{control_channel, install_signal_handlers, HubConfig, Orchestrator};

    // Sessions
    pub use crate::{MidiCommand, MidiPacket, PeerId, SessionRegistry};

    // Host seams
    pub use crate::daemon::{DaemonLauncher, ProcessTable, ReportSink, SequencerGraph};

    // Bridge
    #[cfg(feature = "bridge")]
    pub use crate::bridge::{Bridge, RtpTransport, SequencerInput, SequencerOutput};
}
