//! The listener/bridge loop.
//!
//! Inbound RTP-MIDI packets are sequenced per peer and local port, then played
//! into the local sequencer. Sequencer input and reset requests arrive from other threads
//! over the handoff channel and go out as RTP-MIDI packets. Session state is
//! only ever touched from the thread running the loop.

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use crossbeam_channel::{Receiver, Sender, TryRecvError};
use midihub_daemon::{ControlRequest, PortConfig, PortPair};
use midihub_journal::{MidiCommand, MidiPacket, PeerId, SessionRegistry};

use crate::error::{Error, Result};
use crate::reset::ResetRequest;
use crate::sequencer::{handoff, InboundEvent, SequencerOutput};
use crate::transport::{RtpTransport, TransportEvent};

/// Default wait on the transport per loop iteration.
pub const DEFAULT_POLL_TIMEOUT: Duration = Duration::from_millis(10);

/// Cloneable sender for work that must run on the bridge loop.
#[derive(Debug, Clone)]
pub struct BridgeHandle {
    tx: Sender<InboundEvent>,
}

impl BridgeHandle {
    pub fn sender(&self) -> Sender<InboundEvent> {
        self.tx.clone()
    }

    pub fn reset(&self, request: ResetRequest) -> Result<()> {
        self.tx
            .send(InboundEvent::Reset(request))
            .map_err(|_| Error::HandoffClosed)
    }

    pub fn command(&self, command: MidiCommand) -> Result<()> {
        self.tx
            .send(InboundEvent::Command(command))
            .map_err(|_| Error::HandoffClosed)
    }
}

/// Counters for one call to [`Bridge::step`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StepSummary {
    pub transport_events: usize,
    pub inbound_events: usize,
    pub packets_sent: usize,
}

pub struct Bridge<T, O> {
    transport: T,
    output: O,
    /// One registry per local port; each port carries its own RTP streams.
    sessions: HashMap<u16, SessionRegistry>,
    ports: PortConfig,
    ports_file: Option<PathBuf>,
    /// Most recent peer on each local port.
    port_peers: HashMap<u16, PeerId>,
    /// Most recently connected peer on any port.
    latest: Option<(u16, PeerId)>,
    sequence: u16,
    ssrc: u32,
    poll_timeout: Duration,
    handle: BridgeHandle,
    inbound: Receiver<InboundEvent>,
}

impl<T: RtpTransport, O: SequencerOutput> Bridge<T, O> {
    pub fn new(transport: T, output: O, ports: PortConfig) -> Self {
        let (tx, inbound) = handoff();
        Self {
            transport,
            output,
            sessions: HashMap::new(),
            ports,
            ports_file: None,
            port_peers: HashMap::new(),
            latest: None,
            sequence: 0,
            ssrc: 0,
            poll_timeout: DEFAULT_POLL_TIMEOUT,
            handle: BridgeHandle { tx },
            inbound,
        }
    }

    /// Re-read port pairs from `path` on reload.
    pub fn with_ports_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.ports_file = Some(path.into());
        self
    }

    pub fn with_ssrc(mut self, ssrc: u32) -> Self {
        self.ssrc = ssrc;
        self
    }

    pub fn with_poll_timeout(mut self, timeout: Duration) -> Self {
        self.poll_timeout = timeout;
        self
    }

    pub fn handle(&self) -> BridgeHandle {
        self.handle.clone()
    }

    /// Sessions of peers connected on local `port`.
    pub fn sessions(&self, port: u16) -> Option<&SessionRegistry> {
        self.sessions.get(&port)
    }

    /// Number of live sessions across all ports.
    pub fn session_count(&self) -> usize {
        self.sessions.values().map(SessionRegistry::len).sum()
    }

    /// Sequence number the next outbound packet will carry.
    pub fn next_sequence(&self) -> u16 {
        self.sequence
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn output(&self) -> &O {
        &self.output
    }

    fn pair_for_receive(&self, port: u16) -> Option<&PortPair> {
        self.ports.pairs().iter().find(|pair| pair.receive == port)
    }

    /// Poll the transport once, then drain the handoff.
    pub fn step(&mut self) -> StepSummary {
        let mut summary = StepSummary::default();

        match self.transport.poll(self.poll_timeout) {
            Ok(Some(event)) => {
                summary.transport_events += 1;
                summary.packets_sent += self.on_transport_event(event);
            }
            Ok(None) => {}
            Err(e) => tracing::error!("Main loop failed: {}", e),
        }

        loop {
            match self.inbound.try_recv() {
                Ok(event) => {
                    summary.inbound_events += 1;
                    summary.packets_sent += self.on_inbound_event(event);
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }

        summary
    }

    /// Step until shutdown is requested or `control` disconnects.
    pub fn run(&mut self, control: &Receiver<ControlRequest>) {
        tracing::info!("Entering main loop");
        loop {
            match control.try_recv() {
                Ok(ControlRequest::Reload) => self.reload(),
                Ok(ControlRequest::Shutdown) | Err(TryRecvError::Disconnected) => {
                    tracing::info!("Leaving main loop");
                    return;
                }
                Err(TryRecvError::Empty) => {}
            }
            self.step();
        }
    }

    pub fn reload(&mut self) {
        if let Some(path) = &self.ports_file {
            self.ports.reload(path);
        }
    }

    fn on_transport_event(&mut self, event: TransportEvent) -> usize {
        match event {
            TransportEvent::PeerConnected { port, peer } => {
                tracing::info!("Peer connected: {} on {}", peer, port);
                self.sessions
                    .entry(port)
                    .or_default()
                    .on_connect(peer.clone());
                self.port_peers.insert(port, peer.clone());
                self.latest = Some((port, peer));
                0
            }
            TransportEvent::PeerDisconnected { port, peer } => {
                tracing::info!("Peer disconnected: {} on {}", peer, port);
                self.on_disconnect(port, &peer);
                0
            }
            TransportEvent::Midi { port, peer, packet } => self.on_packet(port, &peer, &packet),
        }
    }

    fn on_disconnect(&mut self, port: u16, peer: &PeerId) {
        let Some(registry) = self.sessions.get_mut(&port) else {
            tracing::debug!("No sessions on port {}", port);
            return;
        };

        let releases: Vec<MidiCommand> = registry
            .get(peer)
            .map(|session| session.release_commands().collect())
            .unwrap_or_default();
        registry.on_disconnect(peer);
        let remaining = registry.peers().next().cloned();

        if !releases.is_empty() {
            tracing::info!("Releasing {} notes left on by {}", releases.len(), peer);
            self.play(&releases);
        }

        if self.port_peers.get(&port) == Some(peer) {
            match remaining {
                Some(other) => {
                    self.port_peers.insert(port, other);
                }
                None => {
                    self.port_peers.remove(&port);
                }
            }
        }

        if self
            .latest
            .as_ref()
            .is_some_and(|(p, id)| *p == port && id == peer)
        {
            self.latest = self
                .port_peers
                .iter()
                .min_by_key(|(p, _)| **p)
                .map(|(p, id)| (*p, id.clone()));
        }
    }

    fn play(&mut self, commands: &[MidiCommand]) {
        for command in commands {
            if let Err(e) = self.output.emit(command) {
                tracing::warn!("Could not emit {:?}: {}", command, e);
            }
        }
        if let Err(e) = self.output.drain() {
            tracing::warn!("Could not drain sequencer output: {}", e);
        }
    }

    fn on_packet(&mut self, port: u16, peer: &PeerId, packet: &MidiPacket) -> usize {
        let Some(registry) = self.sessions.get_mut(&port) else {
            tracing::warn!("Dropping packet on {}: no sessions on this port", port);
            return 0;
        };
        let outcome = match registry.receive(peer, packet) {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::warn!("Dropping packet on {}: {}", port, e);
                return 0;
            }
        };
        if !outcome.is_accepted() {
            return 0;
        }

        self.play(&packet.commands);

        let forward_to = self.pair_for_receive(port).map(|pair| pair.send);
        match forward_to {
            Some(send_port) => self.send_to_port(send_port, packet.commands.iter().copied()),
            None => 0,
        }
    }

    fn on_inbound_event(&mut self, event: InboundEvent) -> usize {
        match event {
            InboundEvent::Command(command) => {
                let Some((port, peer)) = self.latest.clone() else {
                    tracing::info!("No-one is connected - not sending");
                    return 0;
                };
                usize::from(self.send(port, &peer, [command]))
            }
            InboundEvent::Reset(request) => self.reset(request),
        }
    }

    fn reset(&mut self, request: ResetRequest) -> usize {
        let target = self
            .ports
            .pairs()
            .iter()
            .find(|pair| pair.receive == request.port || pair.send == request.port)
            .map_or(request.port, |pair| pair.send);
        tracing::info!(
            "Sending NoteOff to {} for {:?}",
            target,
            request.range.notes()
        );
        request
            .note_offs()
            .map(|batch| self.send_to_port(target, batch))
            .sum()
    }

    fn send_to_port(&mut self, port: u16, commands: impl IntoIterator<Item = MidiCommand>) -> usize {
        let Some(peer) = self.port_peers.get(&port).cloned() else {
            tracing::debug!("No peer on port {} - not sending", port);
            return 0;
        };
        usize::from(self.send(port, &peer, commands))
    }

    /// Send one packet; the sequence number only advances on success.
    fn send(
        &mut self,
        port: u16,
        peer: &PeerId,
        commands: impl IntoIterator<Item = MidiCommand>,
    ) -> bool {
        let packet = MidiPacket::new(self.sequence)
            .with_ssrc(self.ssrc)
            .with_commands(commands);
        if packet.commands.is_empty() {
            return false;
        }
        match self.transport.send(port, peer, &packet) {
            Ok(()) => {
                self.sequence = self.sequence.wrapping_add(1);
                true
            }
            Err(e) => {
                tracing::error!("sendto failed: {}", e);
                false
            }
        }
    }
}
