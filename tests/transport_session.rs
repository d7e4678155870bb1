use std::time::Duration;

use assert_matches::assert_matches;
use pretty_assertions::assert_eq;

use ntag::{
    EntryKind, FakeDeviceConfig, FakeDevicePort, FileType, SessionConfig, SessionState,
    TransportError, TransportSession,
};

fn session_for(port: &FakeDevicePort) -> TransportSession {
    TransportSession::new(Box::new(port.clone()), SessionConfig::default())
}

async fn connected(port: &FakeDevicePort) -> TransportSession {
    let mut session = session_for(port);
    session
        .connect()
        .await
        .expect("fake device should answer the handshake");
    session
}

#[tokio::test(start_paused = true)]
async fn connect_reaches_ready_state() {
    let port = FakeDevicePort::new(FakeDeviceConfig::default());
    let session = connected(&port).await;

    assert_eq!(SessionState::Ready, session.state());
    assert_eq!(1, port.interrupts());
}

#[tokio::test(start_paused = true)]
async fn stalled_device_fails_handshake_after_three_attempts() {
    let port = FakeDevicePort::new(FakeDeviceConfig::builder().stalled(true).build());
    let mut session = session_for(&port);

    let result = session.connect().await;

    assert_matches!(result, Err(TransportError::HandshakeFailed { attempts: 3 }));
    assert_eq!(3, port.interrupts());
    assert_eq!(SessionState::Disconnected, session.state());
}

#[tokio::test(start_paused = true)]
async fn handshake_attempts_follow_config() {
    let port = FakeDevicePort::new(FakeDeviceConfig::builder().stalled(true).build());
    let config = SessionConfig::builder()
        .handshake_attempts(5)
        .handshake_timeout(Duration::from_millis(100))
        .build();
    let mut session = TransportSession::new(Box::new(port.clone()), config);

    assert_matches!(
        session.connect().await,
        Err(TransportError::HandshakeFailed { attempts: 5 })
    );
    assert_eq!(5, port.interrupts());
}

#[tokio::test(start_paused = true)]
async fn operations_before_connect_report_not_connected() {
    let port = FakeDevicePort::new(FakeDeviceConfig::default());
    let mut session = session_for(&port);

    assert_matches!(
        session.list_directory("/ext").await,
        Err(TransportError::NotConnected)
    );
    assert_matches!(
        session.write_file("/ext/nfc/a.nfc", "x").await,
        Err(TransportError::NotConnected)
    );
    assert!(port.commands().is_empty());
}

#[tokio::test(start_paused = true)]
async fn write_file_stores_content_and_creates_parent() {
    let port = FakeDevicePort::new(FakeDeviceConfig::default());
    let mut session = connected(&port).await;

    session
        .write_file("/ext/nfc/cards/door.nfc", "Filetype: Flipper NFC device\nVersion: 4")
        .await
        .expect("write should be verified");

    assert_eq!(
        Some("Filetype: Flipper NFC device\nVersion: 4".to_string()),
        port.file("/ext/nfc/cards/door.nfc")
    );
    assert_eq!(
        vec![
            "storage mkdir /ext/nfc/cards".to_string(),
            "storage write /ext/nfc/cards/door.nfc".to_string(),
            "storage stat /ext/nfc/cards/door.nfc".to_string(),
        ],
        port.commands()
    );
    assert_eq!(SessionState::Ready, session.state());
}

#[tokio::test(start_paused = true)]
async fn list_directory_returns_typed_entries() {
    let port = FakeDevicePort::new(
        FakeDeviceConfig::builder()
            .files(vec![
                "/ext/nfc/door.nfc=abc".parse().expect("valid fixture"),
                "/ext/nfc/readme.txt=hello".parse().expect("valid fixture"),
                "/ext/nfc/assets/logo.png=x".parse().expect("valid fixture"),
            ])
            .build(),
    );
    let mut session = connected(&port).await;

    let entries = session
        .list_directory("/ext/nfc")
        .await
        .expect("listing should succeed");

    let summary: Vec<_> = entries
        .iter()
        .map(|entry| {
            (
                entry.name().to_string(),
                entry.kind(),
                entry.file_type(),
                entry.size(),
            )
        })
        .collect();
    assert_eq!(
        vec![
            ("assets".to_string(), EntryKind::Directory, None, None),
            (
                "door.nfc".to_string(),
                EntryKind::File,
                Some(FileType::Nfc),
                Some(3)
            ),
            (
                "readme.txt".to_string(),
                EntryKind::File,
                Some(FileType::Text),
                Some(5)
            ),
        ],
        summary
    );
    assert_eq!("/ext/nfc/door.nfc", entries[1].path());
}

#[tokio::test(start_paused = true)]
async fn listing_a_missing_directory_disconnects() {
    let port = FakeDevicePort::new(FakeDeviceConfig::default());
    let mut session = connected(&port).await;

    let result = session.list_directory("/ext/missing").await;

    assert_matches!(
        result,
        Err(TransportError::CommandRejected { command, .. }) if command == "storage list /ext/missing"
    );
    assert_eq!(SessionState::Disconnected, session.state());
}

#[tokio::test(start_paused = true)]
async fn unverifiable_write_fails_and_disconnects() {
    let port = FakeDevicePort::new(FakeDeviceConfig::builder().discard_writes(true).build());
    let mut session = connected(&port).await;

    let result = session.write_file("/ext/nfc/door.nfc", "content").await;

    assert_matches!(
        result,
        Err(TransportError::WriteVerificationFailed { path, response })
            if path == "/ext/nfc/door.nfc" && response.contains("not exist")
    );
    assert_eq!(SessionState::Disconnected, session.state());
    assert_eq!(None, port.file("/ext/nfc/door.nfc"));
}

#[tokio::test(start_paused = true)]
async fn unanswered_command_times_out_and_disconnects() {
    let port = FakeDevicePort::new(
        FakeDeviceConfig::builder()
            .unanswered_command("loader info")
            .build(),
    );
    let mut session = connected(&port).await;

    assert_matches!(
        session.loader_info().await,
        Err(TransportError::ReadTimeout { marker, timeout_ms: 5000 }) if marker == ">:"
    );
    assert_eq!(SessionState::Disconnected, session.state());
    assert_matches!(
        session.loader_list().await,
        Err(TransportError::NotConnected)
    );

    session.connect().await.expect("reconnect should succeed");
    assert_eq!(4, session.loader_list().await.expect("list should succeed").len());
}

#[tokio::test(start_paused = true)]
async fn read_until_times_out_on_missing_marker() {
    let port = FakeDevicePort::new(FakeDeviceConfig::default());
    let mut session = connected(&port).await;

    let result = session
        .read_until("never printed", Duration::from_secs(1))
        .await;

    assert_matches!(
        result,
        Err(TransportError::ReadTimeout { marker, timeout_ms: 1000 }) if marker == "never printed"
    );
    assert_eq!(SessionState::Disconnected, session.state());
}

#[tokio::test(start_paused = true)]
async fn loader_list_returns_app_names() {
    let port = FakeDevicePort::new(
        FakeDeviceConfig::builder()
            .apps(vec!["NFC".to_string(), "Bad USB".to_string()])
            .build(),
    );
    let mut session = connected(&port).await;

    let apps = session.loader_list().await.expect("list should succeed");

    assert_eq!(vec!["NFC".to_string(), "Bad USB".to_string()], apps);
}

#[tokio::test(start_paused = true)]
async fn loader_open_rejects_unknown_apps() {
    let port = FakeDevicePort::new(FakeDeviceConfig::default());
    let mut session = connected(&port).await;

    assert_matches!(
        session.loader_open("Snake", None).await,
        Err(TransportError::CommandRejected { .. })
    );
    assert_eq!(None, port.running_app());
}

#[tokio::test(start_paused = true)]
async fn launch_app_closes_the_running_app_first() {
    let port = FakeDevicePort::new(FakeDeviceConfig::builder().running_app("Sub-GHz").build());
    let mut session = connected(&port).await;

    session
        .launch_app("NFC", None)
        .await
        .expect("launch should close Sub-GHz and open NFC");

    assert_eq!(Some("NFC".to_string()), port.running_app());
    assert_eq!(
        vec![
            "loader info".to_string(),
            "loader close".to_string(),
            "loader open \"NFC\"".to_string(),
        ],
        port.commands()
    );
}

#[tokio::test(start_paused = true)]
async fn loader_signal_reaches_running_app() {
    let port = FakeDevicePort::new(FakeDeviceConfig::builder().running_app("NFC").build());
    let mut session = connected(&port).await;

    let info = session.loader_info().await.expect("info should succeed");
    let response = session
        .loader_signal("exit", None)
        .await
        .expect("signal should succeed");

    assert!(info.contains("NFC"));
    assert_eq!("Signal exit sent", response);
}

#[tokio::test(start_paused = true)]
async fn disconnect_is_idempotent_and_reconnect_works() {
    let port = FakeDevicePort::new(FakeDeviceConfig::default());
    let mut session = connected(&port).await;

    session.disconnect().await;
    session.disconnect().await;
    assert_eq!(SessionState::Disconnected, session.state());

    session.connect().await.expect("reconnect should succeed");
    assert_eq!(SessionState::Ready, session.state());
}
