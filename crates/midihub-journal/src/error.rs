//! Error types for session tracking and journal decoding.

use thiserror::Error;

use crate::journal::Chapter;
use crate::session::PeerId;

#[derive(Error, Debug)]
pub enum Error {
    #[error("No session for peer {0}")]
    UnknownPeer(PeerId),

    #[error("Journal decode error: {0}")]
    Decode(#[from] DecodeError),
}

/// Failures while walking a recovery journal.
///
/// These never abort packet processing; the decoder logs them and gives up on
/// the affected channel journal only.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("Journal truncated in {chapter}: need {needed} bytes, {available} available")]
    Truncated {
        chapter: Chapter,
        needed: usize,
        available: usize,
    },

    #[error("Note chapter declares {declared} bytes of note logs but only {available} remain")]
    NoteLengthOverrun { declared: usize, available: usize },

    #[error("Journal header truncated: need {needed} bytes, {available} available")]
    Header { needed: usize, available: usize },

    #[error("Channel journal length {length} is shorter than its header")]
    ChannelLength { length: usize },
}

pub type Result<T> = std::result::Result<T, Error>;
