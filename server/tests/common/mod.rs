//! Shared helpers for the WebSocket integration tests.
#![allow(dead_code)]

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use webterm_server::auth::{CredentialStore, NameRegistry};
use webterm_server::command::CommandRegistry;
use webterm_server::rooms::RoomDirectory;
use webterm_server::session::InputPolicy;
use webterm_server::state::AppState;

pub type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
pub type WsWrite = SplitSink<WsStream, Message>;
pub type WsRead = SplitStream<WsStream>;

const READ_TIMEOUT: Duration = Duration::from_secs(5);

pub struct TestServer {
    pub addr: SocketAddr,
    pub state: AppState,
    _data_dir: tempfile::TempDir,
}

impl TestServer {
    pub fn ws_url(&self) -> String {
        format!("ws://{}/ws", self.addr)
    }

    pub fn http_url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

/// Start the server on a random port with no input rate limit.
pub async fn start_test_server() -> TestServer {
    start_test_server_with(InputPolicy::unlimited(), None).await
}

pub async fn start_test_server_with(
    input_policy: InputPolicy,
    allowed_origin: Option<&str>,
) -> TestServer {
    let tmp_dir = tempfile::tempdir().expect("Failed to create temp dir");
    let store = CredentialStore::open(tmp_dir.path().to_str().unwrap())
        .expect("Failed to open credential store");

    let state = AppState {
        store,
        directory: RoomDirectory::spawn(),
        names: Arc::new(NameRegistry::new()),
        commands: Arc::new(CommandRegistry::new()),
        input_policy,
        allowed_origin: allowed_origin.map(str::to_string),
        ws_per_second: 1,
        ws_burst: 100,
    };

    let app = webterm_server::routes::build_router(state.clone());
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        .unwrap();
    });

    TestServer {
        addr,
        state,
        _data_dir: tmp_dir,
    }
}

/// Connect a client and consume the initial status box update.
/// Returns the guest name the server assigned.
pub async fn connect_client(server: &TestServer) -> (WsWrite, WsRead, String) {
    let (ws, _) = tokio_tungstenite::connect_async(server.ws_url())
        .await
        .expect("WebSocket connect failed");
    let (write, mut read) = ws.split();

    let status = next_packet(&mut read).await.expect("status packet");
    assert_eq!(status["Type"], "innerHTML");
    assert_eq!(status["Map"]["Selector"], "#status-box");
    let html = status["Map"]["Value"].as_str().unwrap();
    let name = html
        .trim_start_matches("<b>")
        .trim_end_matches("</b>")
        .to_string();

    (write, read, name)
}

/// Send one typed line as an input packet.
pub async fn send_line(write: &mut WsWrite, line: &str) {
    let packet = json!({"Type": "input", "Args": [line], "Map": {}});
    write
        .send(Message::Text(packet.to_string().into()))
        .await
        .expect("send input");
}

/// Answer an outstanding `get*` or `exists` request.
pub async fn send_response(write: &mut WsWrite, value: &str) {
    let packet = json!({"Type": "response", "Args": [], "Map": {"Response": value}});
    write
        .send(Message::Text(packet.to_string().into()))
        .await
        .expect("send response");
}

/// Next packet from the server, or None when the connection closes or times out.
pub async fn next_packet(read: &mut WsRead) -> Option<Value> {
    loop {
        match tokio::time::timeout(READ_TIMEOUT, read.next()).await {
            Ok(Some(Ok(Message::Text(text)))) => {
                return Some(serde_json::from_str(text.as_str()).expect("server sent JSON"));
            }
            Ok(Some(Ok(Message::Ping(_)))) | Ok(Some(Ok(Message::Pong(_)))) => continue,
            _ => return None,
        }
    }
}

/// Read packets until one has the given Type; returns it.
pub async fn expect_kind(read: &mut WsRead, kind: &str) -> Value {
    loop {
        let packet = next_packet(read)
            .await
            .unwrap_or_else(|| panic!("connection ended waiting for {}", kind));
        if packet["Type"] == kind {
            return packet;
        }
    }
}

/// Read packets until a terminal message with exactly `text` arrives.
/// Returns every message text seen on the way, including `text`.
pub async fn expect_msg(read: &mut WsRead, text: &str) -> Vec<String> {
    let mut seen = Vec::new();
    loop {
        let packet = next_packet(read)
            .await
            .unwrap_or_else(|| panic!("connection ended waiting for {:?}; saw {:?}", text, seen));
        if let Some(t) = packet["Map"]["Text"].as_str() {
            if packet["Map"]["Element"] == "div" {
                seen.push(t.to_string());
                if t == text {
                    return seen;
                }
            }
        }
    }
}

/// Drain anything the server sends within a short window.
pub async fn drain(read: &mut WsRead) {
    while let Ok(Some(Ok(_))) = tokio::time::timeout(Duration::from_millis(200), read.next()).await {}
}
