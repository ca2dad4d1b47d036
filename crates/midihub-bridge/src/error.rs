use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Sequencer error: {0}")]
    Sequencer(String),

    #[error(transparent)]
    Journal(#[from] midihub_journal::Error),

    #[error("Bridge handoff channel closed")]
    HandoffClosed,
}

pub type Result<T> = std::result::Result<T, Error>;
