//! Integration tests for the WebSocket endpoint: handshake, packet codec, dispatch
//! and connection-level policies.

mod common;

use common::*;
use futures_util::{SinkExt, StreamExt};
use std::time::Duration;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::Message;
use webterm_server::session::InputPolicy;

#[tokio::test]
async fn test_health_endpoint() {
    let server = start_test_server().await;

    let resp = reqwest::get(server.http_url("/health")).await.unwrap();
    assert_eq!(resp.status(), 200);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["rooms"], 0);
}

#[tokio::test]
async fn test_connect_assigns_guest_name() {
    let server = start_test_server().await;
    let (_write, _read, name) = connect_client(&server).await;

    assert!(name.starts_with("Guest"), "unexpected guest name {}", name);
    assert_eq!(name.len(), "Guest".len() + 5);
    assert!(server.state.names.is_online(&name));
}

#[tokio::test]
async fn test_help_and_unknown_command() {
    let server = start_test_server().await;
    let (mut write, mut read, name) = connect_client(&server).await;

    send_line(&mut write, "help").await;
    let packet = expect_kind(&mut read, "appendElement").await;
    assert_eq!(packet["Map"]["Selector"], "#msg-list");
    assert_eq!(packet["Map"]["Class"], "msg");
    assert_eq!(
        packet["Map"]["Text"],
        "Available commands: clear connect disconnect editor help ipscraper login logout register rooms whoami"
    );

    send_line(&mut write, "Help Clear").await;
    expect_msg(&mut read, "clear the current terminal's content").await;

    send_line(&mut write, "launch missiles").await;
    expect_msg(&mut read, "Command not found.").await;

    // The session survives command errors.
    send_line(&mut write, "whoami").await;
    let packet = expect_kind(&mut read, "appendElement").await;
    assert_eq!(
        packet["Map"]["Text"].as_str().unwrap(),
        format!("You are {} (guest, not in a room)", name)
    );
}

#[tokio::test]
async fn test_args_without_line_are_joined() {
    let server = start_test_server().await;
    let (mut write, mut read, _name) = connect_client(&server).await;

    // Clients may send the line pre-split.
    let packet = serde_json::json!({"Type": "input", "Args": ["help", "rooms"], "Map": null});
    write
        .send(Message::Text(packet.to_string().into()))
        .await
        .unwrap();
    expect_msg(&mut read, "rooms lists the rooms that currently have members").await;
}

#[tokio::test]
async fn test_clear_and_editor_packets() {
    let server = start_test_server().await;
    let (mut write, mut read, _name) = connect_client(&server).await;

    send_line(&mut write, "clear").await;
    let packet = expect_kind(&mut read, "innerHTML").await;
    assert_eq!(packet["Map"]["Selector"], "#msg-list");
    assert_eq!(packet["Map"]["Value"], "");

    send_line(&mut write, "editor").await;
    expect_msg(&mut read, "Editor box:").await;
    let editor = expect_kind(&mut read, "appendElement").await;
    assert_eq!(editor["Map"]["Id"], "editor");
    let editable = expect_kind(&mut read, "editable").await;
    assert_eq!(editable["Map"]["Selector"], "#msg-list #editor");
    assert_eq!(editable["Map"]["Value"], "true");
    expect_kind(&mut read, "setProperty").await;
    expect_kind(&mut read, "focus").await;
}

#[tokio::test]
async fn test_ipscraper_round_trip() {
    let server = start_test_server().await;
    let (mut write, mut read, _name) = connect_client(&server).await;

    send_line(&mut write, "ipscraper").await;
    let exists = expect_kind(&mut read, "exists").await;
    assert_eq!(exists["Map"]["Selector"], "#msg-list #editor");
    send_response(&mut write, "true").await;

    expect_kind(&mut read, "getHTML").await;
    send_response(&mut write, "10.1.2.3<div>8.8.8.8 and 10.1.2.3</div>").await;

    let first = expect_kind(&mut read, "appendElement").await;
    assert_eq!(first["Map"]["Element"], "a");
    assert_eq!(first["Map"]["Href"], "http://10.1.2.3");
    assert_eq!(first["Map"]["Target"], "_blank");
    let br = expect_kind(&mut read, "appendElement").await;
    assert_eq!(br["Map"]["Element"], "br");
    let second = expect_kind(&mut read, "appendElement").await;
    assert_eq!(second["Map"]["Text"], "8.8.8.8");
}

#[tokio::test]
async fn test_malformed_packet_closes_connection() {
    let server = start_test_server().await;
    let (mut write, mut read, name) = connect_client(&server).await;

    write
        .send(Message::Text("this is not a packet".into()))
        .await
        .unwrap();

    assert!(next_packet(&mut read).await.is_none());

    // The display name is released once the session is gone.
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while server.state.names.is_online(&name) {
        assert!(tokio::time::Instant::now() < deadline, "name never released");
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}

#[tokio::test]
async fn test_binary_frames_are_accepted() {
    let server = start_test_server().await;
    let (mut write, mut read, _name) = connect_client(&server).await;

    let packet = serde_json::json!({"Type": "input", "Args": ["rooms"], "Map": {}});
    write
        .send(Message::Binary(packet.to_string().into_bytes().into()))
        .await
        .unwrap();
    expect_msg(&mut read, "No active rooms").await;
}

#[tokio::test]
async fn test_input_rate_limit_rejects_early_lines() {
    let server = start_test_server_with(InputPolicy::new(60_000, 1), None).await;
    let (mut write, mut read, _name) = connect_client(&server).await;

    send_line(&mut write, "rooms").await;
    send_line(&mut write, "rooms").await;

    let seen = expect_msg(&mut read, "Slow down: input ignored.").await;
    assert_eq!(seen, vec!["No active rooms", "Slow down: input ignored."]);
}

#[tokio::test]
async fn test_origin_check() {
    let server = start_test_server_with(InputPolicy::unlimited(), Some("http://good.example")).await;

    let mut request = server.ws_url().into_client_request().unwrap();
    request
        .headers_mut()
        .insert("Origin", "http://evil.example".parse().unwrap());
    match tokio_tungstenite::connect_async(request).await {
        Err(tokio_tungstenite::tungstenite::Error::Http(resp)) => {
            assert_eq!(resp.status(), 403);
        }
        other => panic!("expected 403, got {:?}", other.map(|_| ())),
    }

    let mut request = server.ws_url().into_client_request().unwrap();
    request
        .headers_mut()
        .insert("Origin", "http://good.example".parse().unwrap());
    let (ws, _) = tokio_tungstenite::connect_async(request).await.unwrap();
    let (_write, mut read) = ws.split();
    let status = next_packet(&mut read).await.unwrap();
    assert_eq!(status["Map"]["Selector"], "#status-box");
}
