//! Seam to the local sequencer, and the worker thread that reads it.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, Sender};
use midihub_journal::MidiCommand;

use crate::error::{Error, Result};
use crate::reset::ResetRequest;

/// Capacity of the worker -> loop handoff.
pub const HANDOFF_CAPACITY: usize = 1024;

/// How long the worker blocks on the sequencer before rechecking `running`.
const INPUT_POLL: Duration = Duration::from_millis(100);

pub trait SequencerOutput {
    fn emit(&mut self, command: &MidiCommand) -> Result<()>;

    /// Flush everything emitted so far.
    fn drain(&mut self) -> Result<()>;
}

pub trait SequencerInput: Send + 'static {
    /// Wait at most `timeout` for the next event. `Ok(None)` on timeout.
    fn read(&mut self, timeout: Duration) -> Result<Option<MidiCommand>>;
}

/// Work handed to the bridge loop from other threads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundEvent {
    Command(MidiCommand),
    Reset(ResetRequest),
}

pub fn handoff() -> (Sender<InboundEvent>, Receiver<InboundEvent>) {
    bounded(HANDOFF_CAPACITY)
}

/// Reads a [`SequencerInput`] on its own thread.
///
/// The worker never touches session state. Everything it reads goes through
/// the handoff channel; it stops when asked or when the loop side is gone.
pub struct InputWorker {
    running: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl InputWorker {
    pub fn spawn(input: impl SequencerInput, tx: Sender<InboundEvent>) -> Result<Self> {
        let running = Arc::new(AtomicBool::new(true));
        let running_clone = Arc::clone(&running);

        let handle = thread::Builder::new()
            .name("midihub-sequencer-input".to_string())
            .spawn(move || Self::input_thread(input, tx, running_clone))
            .map_err(|e| Error::Sequencer(format!("Failed to spawn input thread: {e}")))?;

        Ok(Self {
            running,
            handle: Some(handle),
        })
    }

    fn input_thread(
        mut input: impl SequencerInput,
        tx: Sender<InboundEvent>,
        running: Arc<AtomicBool>,
    ) {
        while running.load(Ordering::Acquire) {
            match input.read(INPUT_POLL) {
                Ok(Some(command)) => {
                    if tx.send(InboundEvent::Command(command)).is_err() {
                        tracing::debug!("Bridge gone - stopping sequencer input");
                        break;
                    }
                }
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!("Sequencer input failed: {}", e);
                    thread::sleep(INPUT_POLL);
                }
            }
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Stop the worker and wait for it.
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::Release);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                tracing::warn!("Sequencer input thread panicked");
            }
        }
    }
}

impl Drop for InputWorker {
    fn drop(&mut self) {
        self.stop();
    }
}
