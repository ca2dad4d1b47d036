//! Test fakes shared by the integration tests.
//!
//! Every fake keeps its state behind `Arc<Mutex<_>>` so a test can hold a
//! clone after handing the fake to the code under test.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

#[cfg(feature = "bridge")]
use midihub::bridge::{RtpTransport, SequencerOutput, TransportEvent};
use midihub::daemon::{
    DaemonLauncher, DaemonProcess, DaemonSpec, ProcessEntry, ProcessTable, SequencerGraph,
};
use midihub::{MidiCommand, MidiPacket, PeerId};

/// Listing with one meshable client (128: three musicians), one lone
/// musician (129), a reserved client and hub-to-hub links.
pub const TWO_PORT_LISTING: &str = "\
client 0: 'System' [type=kernel]
    0 'Timer           '
    1 'Announce        '
client 14: 'Midi Through' [type=kernel]
    0 'Midi Through Port-0'
client 128: 'midiHub-Sydney-5004' [type=user,pid=2001]
    0 'Network         '
\tConnecting To: 131:0
    1 'Keys            '
    2 'Drums           '
    3 'Bass            '
    4 'midiHub-London-5004'
client 129: 'midiHub-Sydney-5006' [type=user,pid=2002]
    0 'Network         '
    1 'Guitar          '
";

#[derive(Clone, Default)]
pub struct FakeHost {
    pub processes: Arc<Mutex<Vec<ProcessEntry>>>,
    pub spawned: Arc<Mutex<Vec<DaemonSpec>>>,
}

impl ProcessTable for FakeHost {
    fn list_processes(&mut self) -> Vec<ProcessEntry> {
        self.processes.lock().clone()
    }
}

impl DaemonLauncher for FakeHost {
    fn spawn(&mut self, spec: &DaemonSpec) -> midihub::daemon::Result<DaemonProcess> {
        let pid = 2000 + spec.port as u32;
        let cmdline = format!("rtpmidid {}", spec.args().join(" "));
        self.processes
            .lock()
            .push(ProcessEntry::new(pid, "rtpmidid", cmdline));
        self.spawned.lock().push(spec.clone());
        Ok(DaemonProcess::new(spec.port, pid, spec.log_path.clone()))
    }
}

#[derive(Clone, Default)]
pub struct FakeGraph {
    pub listing: Arc<Mutex<String>>,
    pub edges: Arc<Mutex<Vec<(u32, u32, u32)>>>,
}

impl FakeGraph {
    pub fn with_listing(listing: &str) -> Self {
        let graph = Self::default();
        *graph.listing.lock() = listing.to_string();
        graph
    }
}

impl SequencerGraph for FakeGraph {
    fn participant_graph(&mut self) -> midihub::daemon::Result<String> {
        Ok(self.listing.lock().clone())
    }

    fn connect(&mut self, client: u32, source: u32, destination: u32) -> midihub::daemon::Result<()> {
        self.edges.lock().push((client, source, destination));
        Ok(())
    }
}

#[cfg(feature = "bridge")]
#[derive(Clone, Default)]
pub struct ScriptedTransport {
    pub events: Arc<Mutex<VecDeque<TransportEvent>>>,
    pub sent: Arc<Mutex<Vec<(u16, PeerId, MidiPacket)>>>,
}

#[cfg(feature = "bridge")]
impl ScriptedTransport {
    pub fn push(&self, event: TransportEvent) {
        self.events.lock().push_back(event);
    }

    pub fn is_idle(&self) -> bool {
        self.events.lock().is_empty()
    }
}

#[cfg(feature = "bridge")]
impl RtpTransport for ScriptedTransport {
    fn poll(&mut self, _timeout: Duration) -> midihub::bridge::Result<Option<TransportEvent>> {
        Ok(self.events.lock().pop_front())
    }

    fn send(
        &mut self,
        port: u16,
        peer: &PeerId,
        packet: &MidiPacket,
    ) -> midihub::bridge::Result<()> {
        self.sent.lock().push((port, peer.clone(), packet.clone()));
        Ok(())
    }
}

#[cfg(feature = "bridge")]
#[derive(Clone, Default)]
pub struct RecordingOutput {
    pub emitted: Arc<Mutex<Vec<MidiCommand>>>,
}

#[cfg(feature = "bridge")]
impl SequencerOutput for RecordingOutput {
    fn emit(&mut self, command: &MidiCommand) -> midihub::bridge::Result<()> {
        self.emitted.lock().push(*command);
        Ok(())
    }

    fn drain(&mut self) -> midihub::bridge::Result<()> {
        Ok(())
    }
}

/// Recovery journal with one channel journal carrying only Chapter W.
pub fn wheel_journal(channel: u8, single_loss: bool, msb: u8, lsb: u8) -> Vec<u8> {
    let flags = if single_loss { 0xA0 } else { 0x20 };
    vec![flags, 0x00, 0x00, channel << 3, 0x05, 0x10, msb, lsb]
}
