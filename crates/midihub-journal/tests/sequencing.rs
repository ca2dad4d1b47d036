//! End-to-end sequencing through the session registry.

use midihub_journal::{
    journal::Chapter, LossKind, MidiCommand, MidiPacket, PeerId, SessionRegistry, Verdict,
};

fn wheel_journal(single_loss: bool, msb: u8, lsb: u8) -> Vec<u8> {
    let flags = if single_loss { 0xA0 } else { 0x20 };
    vec![flags, 0x00, 0x00, 0x00, 0x05, Chapter::Wheel.flag(), msb, lsb]
}

#[test]
fn test_in_order_stream_for_fresh_peer() {
    let mut sessions = SessionRegistry::new();
    let peer = PeerId::from("Studio A");
    sessions.on_connect(peer.clone());

    let verdicts: Vec<_> = [100u16, 101, 102]
        .into_iter()
        .map(|seq| sessions.receive(&peer, &MidiPacket::new(seq)).unwrap().verdict)
        .collect();

    assert_eq!(
        verdicts,
        vec![Verdict::First, Verdict::InOrder, Verdict::InOrder]
    );
    assert_eq!(sessions.get(&peer).unwrap().last_sequence(), Some(102));
}

#[test]
fn test_gap_then_stale_then_recovery() {
    let mut sessions = SessionRegistry::new();
    let peer = PeerId::from("Studio B");
    sessions.on_connect(peer.clone());

    sessions.receive(&peer, &MidiPacket::new(100)).unwrap();

    let gap = sessions.receive(&peer, &MidiPacket::new(102)).unwrap();
    assert_eq!(gap.verdict, Verdict::Loss(LossKind::Unrecoverable { missing: 1 }));

    let stale = sessions
        .receive(
            &peer,
            &MidiPacket::new(101).with_commands([MidiCommand::note_on(0, 60, 127)]),
        )
        .unwrap();
    assert!(!stale.is_accepted());
    assert_eq!(
        sessions.get(&peer).unwrap().channel(0).note_on_velocity[60],
        None
    );

    let single = sessions
        .receive(
            &peer,
            &MidiPacket::new(104).with_journal(wheel_journal(true, 0x20, 0x00)),
        )
        .unwrap();
    assert_eq!(single.verdict, Verdict::Loss(LossKind::SinglePacket));
    assert_eq!(
        single.report.unwrap().channels[0].pitch_wheel,
        Some(0x2000)
    );
    assert_eq!(sessions.get(&peer).unwrap().last_sequence(), Some(104));
}

#[test]
fn test_single_loss_bit_ignored_for_wider_gap() {
    let mut sessions = SessionRegistry::new();
    let peer = PeerId::from("Studio C");
    sessions.on_connect(peer.clone());

    sessions.receive(&peer, &MidiPacket::new(10)).unwrap();
    let outcome = sessions
        .receive(
            &peer,
            &MidiPacket::new(14).with_journal(wheel_journal(true, 0x01, 0x02)),
        )
        .unwrap();
    assert_eq!(
        outcome.verdict,
        Verdict::Loss(LossKind::MultiPacket { missing: 3 })
    );
}

#[test]
fn test_sessions_are_isolated_per_peer() {
    let mut sessions = SessionRegistry::new();
    let a = PeerId::from("a");
    let b = PeerId::from("b");
    sessions.on_connect(a.clone());
    sessions.on_connect(b.clone());

    sessions.receive(&a, &MidiPacket::new(500)).unwrap();
    let first_b = sessions.receive(&b, &MidiPacket::new(3)).unwrap();
    assert_eq!(first_b.verdict, Verdict::First);

    sessions.on_disconnect(&a);
    assert!(sessions.receive(&a, &MidiPacket::new(501)).is_err());
    assert_eq!(sessions.get(&b).unwrap().last_sequence(), Some(3));
}
