//! Session sequencing through the umbrella re-exports.

use midihub::journal::decode_journal;
use midihub::{LossKind, MidiCommand, MidiPacket, PeerId, SessionRegistry, Verdict};

use crate::helpers::wheel_journal;

#[test]
fn test_sessions_are_per_peer() {
    let mut sessions = SessionRegistry::new();
    let keys = PeerId::from("Keys");
    let drums = PeerId::from("Drums");
    sessions.on_connect(keys.clone());
    sessions.on_connect(drums.clone());

    sessions.receive(&keys, &MidiPacket::new(500)).unwrap();
    sessions.receive(&drums, &MidiPacket::new(7)).unwrap();

    let outcome = sessions.receive(&keys, &MidiPacket::new(501)).unwrap();
    assert_eq!(outcome.verdict, Verdict::InOrder);
    assert_eq!(sessions.get(&drums).unwrap().last_sequence(), Some(7));
}

#[test]
fn test_loss_with_journal_reports_wheel() {
    let mut sessions = SessionRegistry::new();
    let peer = PeerId::from("Keys");
    sessions.on_connect(peer.clone());
    sessions.receive(&peer, &MidiPacket::new(100)).unwrap();

    let packet = MidiPacket::new(105)
        .with_commands([MidiCommand::pitch_bend(3, 0x2400)])
        .with_journal(wheel_journal(3, false, 0x24, 0x00));
    let outcome = sessions.receive(&peer, &packet).unwrap();

    assert_eq!(outcome.verdict, Verdict::Loss(LossKind::MultiPacket { missing: 4 }));
    let report = outcome.report.unwrap();
    assert_eq!(report.channels[0].channel, 3);
    assert_eq!(report.channels[0].pitch_wheel, Some(0x2400));
    assert_eq!(sessions.get(&peer).unwrap().channel(3).pitch_wheel, 0x2400);
}

#[test]
fn test_wheel_chapter_decode() {
    let report = decode_journal(&wheel_journal(0, false, 0x10, 0x20)).unwrap();
    let channel = &report.channels[0];
    assert_eq!(channel.pitch_wheel, Some(4128));
    assert_eq!(channel.consumed, 2);
    assert!(channel.error.is_none());
}

#[test]
fn test_sequence_wraparound_is_in_order() {
    let mut sessions = SessionRegistry::new();
    let peer = PeerId::from("Bass");
    sessions.on_connect(peer.clone());

    sessions.receive(&peer, &MidiPacket::new(u16::MAX)).unwrap();
    let outcome = sessions.receive(&peer, &MidiPacket::new(0)).unwrap();
    assert_eq!(outcome.verdict, Verdict::InOrder);
}
