//! Hub cycles: supervision, discovery and mesh wiring.

use midihub::{HubConfig, Orchestrator, PortConfig};

use crate::helpers::{FakeGraph, FakeHost, TWO_PORT_LISTING};

fn hub(ports: &str, host: &FakeHost, graph: &FakeGraph) -> Orchestrator {
    let config = HubConfig {
        location: Some("Sydney".to_string()),
        ..HubConfig::default()
    };
    Orchestrator::builder(config)
        .ports(PortConfig::parse(ports).unwrap())
        .process_table(host.clone())
        .launcher(host.clone())
        .sequencer_graph(graph.clone())
        .build()
        .unwrap()
}

#[test]
fn test_first_cycle_spawns_each_port_once() {
    let host = FakeHost::default();
    let graph = FakeGraph::default();
    let mut hub = hub("5004,5006,5008", &host, &graph);

    hub.tick();
    let spawned: Vec<_> = host.spawned.lock().iter().map(|s| s.port).collect();
    assert_eq!(spawned, vec![5004, 5006, 5008]);
    assert_eq!(host.spawned.lock()[0].display_name, "midiHub-Sydney-5004");

    hub.tick();
    hub.tick();
    assert_eq!(host.spawned.lock().len(), 3);
}

#[test]
fn test_grouped_ports_are_supervised() {
    let host = FakeHost::default();
    let graph = FakeGraph::default();
    let mut hub = hub(r#"{"GroupOne": [5140, 5142]}"#, &host, &graph);

    let summary = hub.tick();
    assert_eq!(summary.reconcile.spawned, vec![5140, 5142]);
}

#[test]
fn test_full_mesh_within_each_client() {
    let host = FakeHost::default();
    let graph = FakeGraph::with_listing(TWO_PORT_LISTING);
    let mut hub = hub("5004,5006", &host, &graph);

    let summary = hub.tick();
    assert_eq!(summary.meshed_clients, 1);
    assert_eq!(summary.mesh.edges, 3 * 2);

    let mut edges = graph.edges.lock().clone();
    edges.sort();
    assert_eq!(
        edges,
        vec![
            (128, 1, 2),
            (128, 1, 3),
            (128, 2, 1),
            (128, 2, 3),
            (128, 3, 1),
            (128, 3, 2),
        ]
    );
}

#[test]
fn test_mesh_follows_topology_changes() {
    let host = FakeHost::default();
    let graph = FakeGraph::with_listing(TWO_PORT_LISTING);
    let mut hub = hub("5004,5006", &host, &graph);
    hub.tick();
    graph.edges.lock().clear();

    // A second musician joins 5006.
    let listing = format!("{TWO_PORT_LISTING}    2 'Vocals'\n");
    *graph.listing.lock() = listing;
    let summary = hub.tick();

    assert_eq!(summary.meshed_clients, 2);
    assert_eq!(summary.mesh.edges, 6 + 2);
    assert!(graph.edges.lock().contains(&(129, 1, 2)));
    assert!(graph.edges.lock().contains(&(129, 2, 1)));
}

#[test]
fn test_empty_topology() {
    let host = FakeHost::default();
    let graph = FakeGraph::with_listing("client 0: 'System' [type=kernel]\n    0 'Timer'\n");
    let mut hub = hub("5004", &host, &graph);

    let summary = hub.tick();
    assert_eq!(summary.meshed_clients, 0);
    assert_eq!(summary.participants, 0);
    assert!(graph.edges.lock().is_empty());
}
