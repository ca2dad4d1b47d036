//! Bridge loop with journal-aware sequencing.

use midihub::bridge::TransportEvent;
use midihub::{Bridge, MidiCommand, MidiPacket, NoteRange, PeerId, PortConfig, ResetRequest};

use crate::helpers::{wheel_journal, RecordingOutput, ScriptedTransport};

fn packet(port: u16, peer: &str, packet: MidiPacket) -> TransportEvent {
    TransportEvent::Midi {
        port,
        peer: PeerId::from(peer),
        packet,
    }
}

#[test]
fn test_lossy_stream_still_plays() {
    let transport = ScriptedTransport::default();
    let output = RecordingOutput::default();
    let mut bridge = Bridge::new(transport.clone(), output.clone(), PortConfig::default());

    let a = MidiCommand::note_on(0, 60, 90);
    let b = MidiCommand::note_on(0, 64, 90);
    let c = MidiCommand::note_on(0, 67, 90);
    transport.push(TransportEvent::PeerConnected {
        port: 5004,
        peer: PeerId::from("Keys"),
    });
    transport.push(packet(5004, "Keys", MidiPacket::new(10).with_commands([a])));
    transport.push(packet(
        5004,
        "Keys",
        MidiPacket::new(13)
            .with_commands([b])
            .with_journal(wheel_journal(0, false, 0x20, 0x00)),
    ));
    transport.push(packet(5004, "Keys", MidiPacket::new(12).with_commands([c])));
    while !transport.is_idle() {
        bridge.step();
    }

    assert_eq!(*output.emitted.lock(), vec![a, b]);
    let session = bridge
        .sessions(5004)
        .and_then(|sessions| sessions.get(&PeerId::from("Keys")))
        .unwrap();
    assert_eq!(session.last_sequence(), Some(13));
    assert!(session.channel(0).is_note_sounding(64));
}

#[test]
fn test_reset_all_on_paired_group() {
    let transport = ScriptedTransport::default();
    let output = RecordingOutput::default();
    let ports = PortConfig::parse(r#"{"GroupTwo": [5150, 5152]}"#).unwrap();
    let mut bridge = Bridge::new(transport.clone(), output, ports);

    transport.push(TransportEvent::PeerConnected {
        port: 5152,
        peer: PeerId::from("Listener"),
    });
    while !transport.is_idle() {
        bridge.step();
    }

    bridge
        .handle()
        .reset(ResetRequest::new(5152, NoteRange::All))
        .unwrap();
    let summary = bridge.step();

    assert_eq!(summary.packets_sent, 127);
    let sent = transport.sent.lock();
    assert_eq!(sent.first().unwrap().2.sequence_number, 0);
    assert_eq!(sent.last().unwrap().2.sequence_number, 126);
}
