//! Full-mesh wiring of participants within each hub client.

use crate::host::SequencerGraph;
use crate::topology::HubClient;

/// One directed connection inside a client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Edge {
    pub client: u32,
    pub source: u32,
    pub destination: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MeshSummary {
    pub edges: usize,
    pub failures: usize,
}

/// Every ordered pair of distinct participants in `client`.
pub fn edges(client: &HubClient) -> Vec<Edge> {
    let ids: Vec<u32> = client.participants.iter().map(|p| p.id).collect();
    ids.iter()
        .flat_map(|&source| {
            ids.iter()
                .filter(move |&&destination| destination != source)
                .map(move |&destination| Edge {
                    client: client.id,
                    source,
                    destination,
                })
        })
        .collect()
}

#[derive(Debug, Default)]
pub struct MeshConnector;

impl MeshConnector {
    pub fn new() -> Self {
        Self
    }

    /// Request every edge of every client. Connect failures are logged and
    /// counted, never returned.
    pub fn wire(&self, clients: &[HubClient], graph: &mut dyn SequencerGraph) -> MeshSummary {
        let mut summary = MeshSummary::default();
        for client in clients {
            let names: Vec<&str> = client.participants.iter().map(|p| p.name.as_str()).collect();
            tracing::info!("client {}: {:?}", client.id, names);

            for edge in edges(client) {
                tracing::debug!(
                    "Adding connection in {} for {} and {}",
                    edge.client,
                    edge.source,
                    edge.destination
                );
                summary.edges += 1;
                if let Err(e) = graph.connect(edge.client, edge.source, edge.destination) {
                    tracing::warn!("{}", e);
                    summary.failures += 1;
                }
            }
        }
        summary
    }
}
