//! Unified error conversions.

use midihub::{Error, MidiPacket, PeerId, PortConfig, SessionRegistry};

fn receive_unknown() -> midihub::Result<()> {
    let mut sessions = SessionRegistry::new();
    sessions.receive(&PeerId::from("ghost"), &MidiPacket::new(1))?;
    Ok(())
}

fn parse_bad_ports() -> midihub::Result<PortConfig> {
    Ok(PortConfig::parse("5004,abc")?)
}

#[test]
fn test_journal_error_converts() {
    let err = receive_unknown().unwrap_err();
    assert!(matches!(err, Error::Journal(_)));
    assert!(err.to_string().contains("ghost"));
}

#[test]
fn test_daemon_error_converts() {
    let err = parse_bad_ports().unwrap_err();
    assert!(matches!(err, Error::Daemon(_)));
}
