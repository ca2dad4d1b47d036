//! Listener/bridge variant of the hub.
//!
//! Instead of wiring remote participants to each other through the host
//! sequencer, the bridge terminates RTP-MIDI sessions itself. It tracks each
//! peer through [`midihub_journal::SessionRegistry`], plays accepted commands
//! into a local sequencer, forwards receive ports to their paired send port,
//! and sends local sequencer input back out.

pub mod error;
pub use error::{Error, Result};

mod transport;
pub use transport::{RtpTransport, TransportEvent};

mod sequencer;
pub use sequencer::{
    handoff, InboundEvent, InputWorker, SequencerInput, SequencerOutput, HANDOFF_CAPACITY,
};

mod reset;
pub use reset::{NoteRange, ResetRequest};

mod bridge;
pub use bridge::{Bridge, BridgeHandle, StepSummary, DEFAULT_POLL_TIMEOUT};
