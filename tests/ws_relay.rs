//! End-to-end relay tests against a live server instance.
//!
//! Each test boots the full Axum app on an ephemeral port with in-memory
//! stores, connects real WebSocket clients, and observes the relay from
//! the outside: REST command pre-flight, device command delivery, status
//! fan-out to browser sessions, and reconnect supersede.

#![allow(clippy::panic)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use fleet_gateway::app_state::AppState;
use fleet_gateway::build_app;
use fleet_gateway::domain::{DeviceId, DeviceRegistry, UserId, UserSessionRegistry};
use fleet_gateway::persistence::memory::{InMemoryBackedUpAccountStore, InMemoryDeviceStore};
use fleet_gateway::persistence::{BackedUpAccountStore, DeviceStore};
use fleet_gateway::service::{DeviceService, RelayService};

const USER_ID_HEADER: &str = "x-user-name";
const WAIT: Duration = Duration::from_secs(5);

type WsClient = WebSocketStream<MaybeTlsStream<TcpStream>>;

struct TestServer {
    addr: SocketAddr,
    relay: Arc<RelayService>,
    accounts: Arc<InMemoryBackedUpAccountStore>,
}

async fn start_server() -> TestServer {
    let devices = Arc::new(InMemoryDeviceStore::new());
    let accounts = Arc::new(InMemoryBackedUpAccountStore::new());
    let relay = Arc::new(RelayService::new(
        Arc::new(DeviceRegistry::new()),
        Arc::new(UserSessionRegistry::new()),
    ));
    let device_service = Arc::new(DeviceService::new(
        Arc::clone(&devices) as Arc<dyn DeviceStore>,
        Arc::clone(&accounts) as Arc<dyn BackedUpAccountStore>,
        Arc::clone(&relay),
        Duration::from_secs(5),
    ));
    let state = AppState {
        device_service,
        relay: Arc::clone(&relay),
        outbound_capacity: 64,
    };
    let app = build_app(state);

    let Ok(listener) = tokio::net::TcpListener::bind("127.0.0.1:0").await else {
        panic!("failed to bind test listener");
    };
    let Ok(addr) = listener.local_addr() else {
        panic!("failed to read listener address");
    };
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    TestServer {
        addr,
        relay,
        accounts,
    }
}

async fn connect_device(addr: SocketAddr, device_id: &str, user: &str) -> WsClient {
    let url = format!("ws://{addr}/ws/device?deviceId={device_id}&deviceName=Test&os=android");
    let Ok(mut request) = url.into_client_request() else {
        panic!("failed to build device request");
    };
    let Ok(header) = user.parse() else {
        panic!("invalid user header value");
    };
    request.headers_mut().insert(USER_ID_HEADER, header);
    let Ok((stream, _)) = tokio_tungstenite::connect_async(request).await else {
        panic!("device websocket connect failed");
    };
    stream
}

async fn connect_browser(addr: SocketAddr, user: &str) -> WsClient {
    let url = format!("ws://{addr}/ws/web/updates");
    let Ok(mut request) = url.into_client_request() else {
        panic!("failed to build browser request");
    };
    let Ok(header) = user.parse() else {
        panic!("invalid user header value");
    };
    request.headers_mut().insert(USER_ID_HEADER, header);
    let Ok((stream, _)) = tokio_tungstenite::connect_async(request).await else {
        panic!("browser websocket connect failed");
    };
    stream
}

/// Polls `cond` until it holds or the wait budget runs out.
async fn wait_for<F, Fut>(what: &str, mut cond: F)
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + WAIT;
    while tokio::time::Instant::now() < deadline {
        if cond().await {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("timed out waiting for {what}");
}

async fn next_text(stream: &mut WsClient) -> String {
    let deadline = tokio::time::Instant::now() + WAIT;
    loop {
        let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
        let Ok(frame) = tokio::time::timeout(remaining, stream.next()).await else {
            panic!("timed out waiting for a text frame");
        };
        match frame {
            Some(Ok(Message::Text(text))) => return text.as_str().to_string(),
            Some(Ok(_)) => {}
            other => panic!("websocket ended while waiting for text: {other:?}"),
        }
    }
}

#[tokio::test]
async fn command_round_trip_and_offline_preflight() {
    let server = start_server().await;
    let client = reqwest::Client::new();
    let backup_url = format!("http://{}/api/v1/devices/D1/backup", server.addr);

    // No device connected: the command fails fast with 503.
    let Ok(response) = client
        .post(&backup_url)
        .header(USER_ID_HEADER, "alice")
        .send()
        .await
    else {
        panic!("backup request failed to send");
    };
    assert_eq!(response.status(), reqwest::StatusCode::SERVICE_UNAVAILABLE);

    // Connect the device and retry.
    let mut device = connect_device(server.addr, "D1", "alice").await;
    let relay = Arc::clone(&server.relay);
    wait_for("device registration", || {
        let relay = Arc::clone(&relay);
        async move { relay.is_online(&DeviceId::new("D1")).await }
    })
    .await;

    let Ok(response) = client
        .post(&backup_url)
        .header(USER_ID_HEADER, "alice")
        .send()
        .await
    else {
        panic!("backup request failed to send");
    };
    assert_eq!(response.status(), reqwest::StatusCode::ACCEPTED);

    // The exact command bytes arrive on the device socket.
    let frame = next_text(&mut device).await;
    assert_eq!(frame, r#"{"command": "start_backup"}"#);
}

#[tokio::test]
async fn completed_backup_fans_out_to_owner_sessions_only() {
    let server = start_server().await;

    let mut device = connect_device(server.addr, "D1", "alice").await;
    let mut alice_tab1 = connect_browser(server.addr, "alice").await;
    let mut alice_tab2 = connect_browser(server.addr, "alice").await;
    let mut bob_tab = connect_browser(server.addr, "bob").await;

    let relay = Arc::clone(&server.relay);
    wait_for("browser registration", || {
        let relay = Arc::clone(&relay);
        async move {
            relay
                .session_registry()
                .sessions_of(&UserId::new("alice"))
                .await
                .len()
                == 2
                && relay
                    .session_registry()
                    .sessions_of(&UserId::new("bob"))
                    .await
                    .len()
                    == 1
        }
    })
    .await;

    let payload = r#"{"type":"BACKUP_STATUS_UPDATE","payload":{"status":"COMPLETED","accountId":"A1","accountName":"Alice","phoneNumber":"555","message":"ok","backupPath":"/x"}}"#;
    assert!(device.send(Message::Text(payload.into())).await.is_ok());

    // Both of alice's tabs hear about it.
    for tab in [&mut alice_tab1, &mut alice_tab2] {
        let frame = next_text(tab).await;
        let value: serde_json::Value = serde_json::from_str(&frame).unwrap_or_default();
        assert_eq!(
            value.get("type").and_then(|v| v.as_str()),
            Some("BACKUP_STATUS_UPDATE")
        );
        assert_eq!(
            value.pointer("/payload/deviceId").and_then(|v| v.as_str()),
            Some("D1")
        );
        assert_eq!(
            value.pointer("/payload/status").and_then(|v| v.as_str()),
            Some("COMPLETED")
        );
    }

    // Exactly one upsert for (alice, A1).
    let accounts = Arc::clone(&server.accounts);
    wait_for("account upsert", || {
        let accounts = Arc::clone(&accounts);
        async move {
            accounts
                .find_by_user(&UserId::new("alice"))
                .await
                .unwrap_or_default()
                .len()
                == 1
        }
    })
    .await;

    // Bob's tab stays silent.
    let quiet = tokio::time::timeout(Duration::from_millis(300), bob_tab.next()).await;
    assert!(quiet.is_err(), "bob received an event for alice's device");
}

#[tokio::test]
async fn closing_one_session_does_not_affect_the_other() {
    let server = start_server().await;

    let mut device = connect_device(server.addr, "D1", "alice").await;
    let mut tab1 = connect_browser(server.addr, "alice").await;
    let mut tab2 = connect_browser(server.addr, "alice").await;

    let relay = Arc::clone(&server.relay);
    wait_for("browser registration", || {
        let relay = Arc::clone(&relay);
        async move {
            relay
                .session_registry()
                .sessions_of(&UserId::new("alice"))
                .await
                .len()
                == 2
        }
    })
    .await;

    assert!(tab1.close(None).await.is_ok());
    let relay = Arc::clone(&server.relay);
    wait_for("session cleanup", || {
        let relay = Arc::clone(&relay);
        async move {
            relay
                .session_registry()
                .sessions_of(&UserId::new("alice"))
                .await
                .len()
                == 1
        }
    })
    .await;

    let payload = r#"{"type":"BACKUP_STATUS_UPDATE","payload":{"status":"BACKING_UP","accountId":"A1","message":"40%"}}"#;
    assert!(device.send(Message::Text(payload.into())).await.is_ok());

    let frame = next_text(&mut tab2).await;
    assert!(frame.contains("BACKING_UP"));

    // No completed status, so no account record was written.
    let accounts = server
        .accounts
        .find_by_user(&UserId::new("alice"))
        .await
        .unwrap_or_default();
    assert!(accounts.is_empty());
}

#[tokio::test]
async fn reconnect_supersedes_previous_device_connection() {
    let server = start_server().await;
    let client = reqwest::Client::new();

    let mut first = connect_device(server.addr, "D1", "alice").await;
    let relay = Arc::clone(&server.relay);
    wait_for("first registration", || {
        let relay = Arc::clone(&relay);
        async move { relay.is_online(&DeviceId::new("D1")).await }
    })
    .await;

    let mut second = connect_device(server.addr, "D1", "alice").await;

    // The first socket is closed by the server.
    let deadline = tokio::time::Instant::now() + WAIT;
    loop {
        let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
        let Ok(frame) = tokio::time::timeout(remaining, first.next()).await else {
            panic!("timed out waiting for the superseded socket to close");
        };
        match frame {
            Some(Ok(Message::Close(_))) | None => break,
            Some(Ok(_)) => {}
            Some(Err(_)) => break,
        }
    }

    // The device is still online, and commands reach the fresh socket.
    assert!(server.relay.is_online(&DeviceId::new("D1")).await);
    let Ok(response) = client
        .post(format!("http://{}/api/v1/devices/D1/backup", server.addr))
        .header(USER_ID_HEADER, "alice")
        .send()
        .await
    else {
        panic!("backup request failed to send");
    };
    assert_eq!(response.status(), reqwest::StatusCode::ACCEPTED);
    let frame = next_text(&mut second).await;
    assert_eq!(frame, r#"{"command": "start_backup"}"#);
}

#[tokio::test]
async fn handshake_without_identity_is_refused() {
    let server = start_server().await;

    // Device without deviceId.
    let url = format!("ws://{}/ws/device", server.addr);
    let Ok(mut request) = url.clone().into_client_request() else {
        panic!("failed to build request");
    };
    let Ok(header) = "alice".parse() else {
        panic!("invalid header value");
    };
    request.headers_mut().insert(USER_ID_HEADER, header);
    assert!(tokio_tungstenite::connect_async(request).await.is_err());

    // Browser without the trusted user header.
    let url = format!("ws://{}/ws/web/updates", server.addr);
    let Ok(request) = url.into_client_request() else {
        panic!("failed to build request");
    };
    assert!(tokio_tungstenite::connect_async(request).await.is_err());

    // Nothing was registered.
    assert!(server.relay.device_registry().is_empty().await);
    assert_eq!(server.relay.session_registry().user_count().await, 0);
}

#[tokio::test]
async fn health_endpoint_reports_healthy() {
    let server = start_server().await;
    let Ok(response) = reqwest::get(format!("http://{}/health", server.addr)).await else {
        panic!("health request failed");
    };
    assert_eq!(response.status(), reqwest::StatusCode::OK);
    let Ok(body) = response.json::<serde_json::Value>().await else {
        panic!("health body was not json");
    };
    assert_eq!(body.get("status").and_then(|v| v.as_str()), Some("healthy"));
}
