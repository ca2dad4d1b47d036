//! The hub control loop.
//!
//! Every cycle: make sure each port has a daemon, rediscover participants,
//! mesh them, and hand reports to the sink. Nothing inside a cycle can stop
//! the loop; failures are logged and retried on the next cycle.

use crossbeam_channel::{Receiver, RecvTimeoutError};

use crate::config::HubConfig;
use crate::control::ControlRequest;
use crate::error::Result;
use crate::host::{
    AconnectGraph, CommandLauncher, DaemonLauncher, ProcessTable, SequencerGraph,
    SysinfoProcessTable,
};
use crate::mesh::{MeshConnector, MeshSummary};
use crate::ports::PortConfig;
use crate::report::{JsonDirSink, LatencyCollector, ParticipantSnapshot, ReportSink};
use crate::supervisor::{ProcessSupervisor, ReconcileSummary};
use crate::topology::{meshable, TopologyDiscoverer};

/// What one cycle did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleSummary {
    pub reconcile: ReconcileSummary,
    /// Clients with more than one participant.
    pub meshed_clients: usize,
    pub mesh: MeshSummary,
    pub participants: usize,
    pub latency_records: usize,
}

/// Builder for [`Orchestrator`].
///
/// Host adapters default to the production ones; tests swap in fakes.
pub struct OrchestratorBuilder {
    config: HubConfig,
    ports: Option<PortConfig>,
    processes: Option<Box<dyn ProcessTable>>,
    launcher: Option<Box<dyn DaemonLauncher>>,
    graph: Option<Box<dyn SequencerGraph>>,
    sink: Option<Box<dyn ReportSink>>,
}

impl OrchestratorBuilder {
    pub fn new(config: HubConfig) -> Self {
        Self {
            config,
            ports: None,
            processes: None,
            launcher: None,
            graph: None,
            sink: None,
        }
    }

    /// Use these ports instead of reading the ports file.
    pub fn ports(mut self, ports: PortConfig) -> Self {
        self.ports = Some(ports);
        self
    }

    pub fn process_table(mut self, processes: impl ProcessTable + 'static) -> Self {
        self.processes = Some(Box::new(processes));
        self
    }

    pub fn launcher(mut self, launcher: impl DaemonLauncher + 'static) -> Self {
        self.launcher = Some(Box::new(launcher));
        self
    }

    pub fn sequencer_graph(mut self, graph: impl SequencerGraph + 'static) -> Self {
        self.graph = Some(Box::new(graph));
        self
    }

    pub fn report_sink(mut self, sink: impl ReportSink + 'static) -> Self {
        self.sink = Some(Box::new(sink));
        self
    }

    pub fn build(self) -> Result<Orchestrator> {
        let ports = match self.ports {
            Some(ports) => ports,
            None => {
                let mut ports = PortConfig::default();
                ports.reload(&self.config.ports_file);
                ports
            }
        };

        let sink = match (self.sink, &self.config.report_dir) {
            (Some(sink), _) => Some(sink),
            (None, Some(dir)) => Some(Box::new(JsonDirSink::new(dir)?) as Box<dyn ReportSink>),
            (None, None) => None,
        };

        Ok(Orchestrator {
            supervisor: ProcessSupervisor::new(&self.config),
            discoverer: TopologyDiscoverer::new()?,
            mesh: MeshConnector::new(),
            latency: LatencyCollector::new()?,
            processes: self
                .processes
                .unwrap_or_else(|| Box::new(SysinfoProcessTable::new())),
            launcher: self.launcher.unwrap_or_else(|| Box::new(CommandLauncher)),
            graph: self.graph.unwrap_or_else(|| Box::new(AconnectGraph::new())),
            sink,
            ports,
            config: self.config,
        })
    }
}

pub struct Orchestrator {
    config: HubConfig,
    ports: PortConfig,
    supervisor: ProcessSupervisor,
    discoverer: TopologyDiscoverer,
    mesh: MeshConnector,
    latency: LatencyCollector,
    processes: Box<dyn ProcessTable>,
    launcher: Box<dyn DaemonLauncher>,
    graph: Box<dyn SequencerGraph>,
    sink: Option<Box<dyn ReportSink>>,
}

impl Orchestrator {
    pub fn builder(config: HubConfig) -> OrchestratorBuilder {
        OrchestratorBuilder::new(config)
    }

    pub fn ports(&self) -> &PortConfig {
        &self.ports
    }

    pub fn supervisor(&self) -> &ProcessSupervisor {
        &self.supervisor
    }

    /// Re-read the ports file. Daemons and sessions are left alone.
    pub fn reload(&mut self) -> bool {
        self.ports.reload(&self.config.ports_file)
    }

    /// Run one supervision/discovery/mesh cycle.
    pub fn tick(&mut self) -> CycleSummary {
        let mut summary = CycleSummary {
            reconcile: self.supervisor.reconcile(
                &self.ports,
                self.processes.as_mut(),
                self.launcher.as_mut(),
            ),
            ..CycleSummary::default()
        };

        tracing::debug!("Getting participant graph");
        let clients = match self.discoverer.snapshot(self.graph.as_mut()) {
            Ok(clients) => clients,
            Err(e) => {
                tracing::warn!("{}", e);
                Vec::new()
            }
        };
        let snapshot = ParticipantSnapshot::from_clients(&clients);
        summary.participants = snapshot.participant_count();

        let clients = meshable(clients);
        summary.meshed_clients = clients.len();
        summary.mesh = self.mesh.wire(&clients, self.graph.as_mut());

        if self.sink.is_some() {
            summary.latency_records = self.report(&snapshot);
        }

        summary
    }

    fn report(&mut self, snapshot: &ParticipantSnapshot) -> usize {
        let Some(sink) = self.sink.as_mut() else {
            return 0;
        };
        if let Err(e) = sink.put_participants(snapshot) {
            tracing::warn!("Could not write participants: {}", e);
        }

        for port in self.ports.port_numbers() {
            let log = self.config.log_path(port);
            if let Err(e) = self.latency.collect(port, &log) {
                tracing::warn!("Could not read {}: {}", log.display(), e);
            }
        }

        let stats = self.latency.stats();
        for record in &stats {
            if let Err(e) = sink.put_latency(record) {
                tracing::warn!("Could not write latency for {}: {}", record.client_id, e);
            }
        }
        stats.len()
    }

    /// Cycle until a shutdown request arrives or `control` disconnects.
    pub fn run(&mut self, control: &Receiver<ControlRequest>) {
        tracing::info!("Entering main loop");
        loop {
            let summary = self.tick();
            tracing::info!(
                running = summary.reconcile.running.len(),
                spawned = summary.reconcile.spawned.len(),
                failed = summary.reconcile.failed.len(),
                participants = summary.participants,
                edges = summary.mesh.edges,
                "Cycle complete"
            );

            match control.recv_timeout(self.config.interval) {
                Ok(ControlRequest::Reload) => {
                    tracing::info!("Reload requested");
                    self.reload();
                }
                Ok(ControlRequest::Shutdown) | Err(RecvTimeoutError::Disconnected) => {
                    tracing::info!("Leaving main loop");
                    return;
                }
                Err(RecvTimeoutError::Timeout) => {}
            }
        }
    }
}
