//! Tests for the TCLO session.

mod common;

use common::{ScriptedTransport, permit};
use guestrpc::{Error, ProtocolId, Result, SessionState, TcloCallback, TcloSession};

#[test]
fn test_start_opens_tclo_channel() {
    let transport = ScriptedTransport::new();
    let mut session = TcloSession::new(transport.shared());

    session.start(&permit()).unwrap();

    assert_eq!(session.state(), SessionState::Started);
    assert_eq!(transport.script().opened, vec![ProtocolId::TCLO]);
}

#[test]
fn test_passthrough_without_interpretation() {
    let transport = ScriptedTransport::new();
    transport.reply(b"reset").reply(b"1 looks like rpci");
    let mut session = TcloSession::new(transport.shared());
    session.start(&permit()).unwrap();

    assert_eq!(session.receive().unwrap(), b"reset");
    assert_eq!(session.receive().unwrap(), b"1 looks like rpci");
    session.send(b"OK ATR toolbox").unwrap();

    assert_eq!(transport.sent(), vec![b"OK ATR toolbox".to_vec()]);
}

#[test]
fn test_io_before_start_no_io() {
    let transport = ScriptedTransport::new();
    transport.reply(b"reset");
    let mut session = TcloSession::new(transport.shared());

    assert!(matches!(session.send(b"x"), Err(Error::NoChannel)));
    assert!(matches!(session.receive(), Err(Error::NoChannel)));
    assert_eq!(transport.io_count(), 0);
}

#[test]
fn test_lifecycle() {
    let transport = ScriptedTransport::new();
    let mut session = TcloSession::new(transport.shared());

    assert!(matches!(session.stop(), Err(Error::NoChannel)));

    session.start(&permit()).unwrap();
    assert!(matches!(
        session.start(&permit()),
        Err(Error::InvalidState { .. })
    ));

    session.stop().unwrap();
    assert_eq!(session.state(), SessionState::Stopped);
    assert!(matches!(session.send(b"x"), Err(Error::NoChannel)));
    assert!(matches!(
        session.start(&permit()),
        Err(Error::InvalidState { .. })
    ));
    assert_eq!(transport.script().closed, 1);
}

#[test]
fn test_caller_supplied_command_loop() {
    let transport = ScriptedTransport::new();
    transport.reply(b"ping").reply(b"reset");
    let mut session = TcloSession::new(transport.shared());
    session.start(&permit()).unwrap();

    let mut handlers: Vec<(&str, TcloCallback)> = vec![
        ("ping", Box::new(|_: &str| -> Result<String> { Ok("OK ".to_string()) })),
        (
            "reset",
            Box::new(|_: &str| -> Result<String> { Ok("OK ATR toolbox".to_string()) }),
        ),
    ];

    for _ in 0..2 {
        let raw = session.receive().unwrap();
        let command = String::from_utf8(raw).unwrap();
        let (_, handler) = handlers
            .iter_mut()
            .find(|(prefix, _)| command.starts_with(prefix))
            .unwrap();
        let reply = handler(&command).unwrap();
        session.send(reply.as_bytes()).unwrap();
    }

    assert_eq!(
        transport.sent(),
        vec![b"OK ".to_vec(), b"OK ATR toolbox".to_vec()]
    );
}

#[test]
fn test_drop_started_session_closes_channel() {
    let transport = ScriptedTransport::new();
    let mut session = TcloSession::new(transport.shared());
    session.start(&permit()).unwrap();

    drop(session);
    assert_eq!(transport.script().closed, 1);

    let mut session = TcloSession::new(transport.shared());
    session.start(&permit()).unwrap();
    session.stop().unwrap();
    drop(session);
    assert_eq!(transport.script().closed, 2, "stopped session closes once");
}
