//! Process supervision, participant discovery and mesh wiring for a
//! headless RTP-MIDI hub.
//!
//! One `rtpmidid` daemon runs per configured UDP port. Remote musicians
//! connect to those daemons and show up as participants of the daemon's
//! sequencer client; the hub wires every participant of a client to every
//! other one so they hear each other.
//!
//! ```ignore
//! use midihub_daemon::{control_channel, HubConfig, Orchestrator};
//!
//! let (tx, rx) = control_channel();
//! let mut hub = Orchestrator::builder(HubConfig::from_env()?).build()?;
//! hub.run(&rx);
//! ```

pub mod config;
pub mod control;
pub mod error;
pub mod host;
pub mod mesh;
pub mod orchestrator;
pub mod ports;
pub mod prerequisites;
pub mod report;
pub mod supervisor;
pub mod topology;

pub use config::{HubConfig, HUB_NAME_PREFIX};
pub use control::{control_channel, install_signal_handlers, ControlRequest};
pub use error::{Error, Result};
pub use host::{
    AconnectGraph, CommandLauncher, DaemonLauncher, DaemonProcess, DaemonSpec, KernelModules,
    ModinfoModules, ProcessEntry, ProcessTable, SequencerGraph, SysinfoProcessTable,
};
pub use mesh::{Edge, MeshConnector, MeshSummary};
pub use orchestrator::{CycleSummary, Orchestrator, OrchestratorBuilder};
pub use ports::{PortConfig, PortPair, PortSpec};
pub use prerequisites::{already_running, check_prerequisites};
pub use report::{
    JsonDirSink, LatencyCollector, LatencyStats, ParticipantSnapshot, ReportSink,
};
pub use supervisor::{ProcessSupervisor, ReconcileSummary};
pub use topology::{HubClient, ParticipantRef, TopologyDiscoverer};
