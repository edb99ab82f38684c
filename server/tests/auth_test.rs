//! Integration tests for registration and login over the prompt protocol.

mod common;

use common::*;

/// Answer a secure prompt: report the input box type, then type `password`.
async fn answer_secure_prompt(write: &mut WsWrite, read: &mut WsRead, prompt: &str, password: &str) {
    let request = expect_kind(read, "getAttribute").await;
    assert_eq!(request["Map"]["Selector"], "#msg-txt");
    assert_eq!(request["Map"]["Attribute"], "type");
    send_response(write, "text").await;

    let masked = expect_kind(read, "setAttribute").await;
    assert_eq!(masked["Map"]["Value"], "password");
    expect_msg(read, prompt).await;
    send_line(write, password).await;

    let restored = expect_kind(read, "setAttribute").await;
    assert_eq!(restored["Map"]["Value"], "text");
}

async fn register(write: &mut WsWrite, read: &mut WsRead, name: &str, email: &str, password: &str) {
    send_line(write, &format!("register {}", name)).await;
    expect_msg(read, "Enter your email address").await;
    send_line(write, email).await;
    answer_secure_prompt(write, read, "Enter a good password", password).await;
    answer_secure_prompt(write, read, "Re-enter your password", password).await;
    expect_msg(read, "User account created (don't forget your password!)").await;
}

async fn login(write: &mut WsWrite, read: &mut WsRead, name: &str, password: &str) {
    send_line(write, &format!("login {}", name)).await;
    answer_secure_prompt(write, read, "Please enter your password", password).await;
}

#[tokio::test]
async fn test_register_then_login() {
    let server = start_test_server().await;
    let (mut write, mut read, guest) = connect_client(&server).await;

    register(&mut write, &mut read, "Alice", "alice@example.com", "hunter2").await;
    assert!(server.state.store.exists("alice").await.unwrap());

    login(&mut write, &mut read, "alice", "hunter2").await;
    let status = expect_kind(&mut read, "innerHTML").await;
    assert_eq!(status["Map"]["Selector"], "#status-box");
    assert_eq!(status["Map"]["Value"], "<b>Alice</b>");
    expect_msg(&mut read, "Welcome back, Alice").await;

    assert!(server.state.names.is_online("alice"));
    assert!(!server.state.names.is_online(&guest));

    send_line(&mut write, "whoami").await;
    expect_msg(&mut read, "You are Alice (logged in as Alice, not in a room)").await;

    // Chat messages carry the account name.
    send_line(&mut write, "connect lobby").await;
    expect_msg(&mut read, "Alice has connected.").await;
    send_line(&mut write, "hello").await;
    expect_msg(&mut read, "[Alice] hello").await;
}

#[tokio::test]
async fn test_wrong_password_and_unknown_user() {
    let server = start_test_server().await;
    let (mut write, mut read, guest) = connect_client(&server).await;
    register(&mut write, &mut read, "bob", "bob@example.com", "right").await;

    login(&mut write, &mut read, "bob", "wrong").await;
    expect_msg(&mut read, "Bad username or password.").await;

    send_line(&mut write, "whoami").await;
    expect_msg(&mut read, &format!("You are {} (guest, not in a room)", guest)).await;

    send_line(&mut write, "login nobody").await;
    expect_msg(&mut read, "User does not exist").await;

    send_line(&mut write, "login no!pe").await;
    expect_msg(&mut read, "Invalid characters in name").await;

    send_line(&mut write, "login").await;
    expect_msg(&mut read, "Usage: login <name>").await;
}

#[tokio::test]
async fn test_register_failures() {
    let server = start_test_server().await;
    let (mut write, mut read, _guest) = connect_client(&server).await;

    send_line(&mut write, "register").await;
    expect_msg(&mut read, "Usage: register <name>").await;

    send_line(&mut write, "register carol").await;
    expect_msg(&mut read, "Enter your email address").await;
    send_line(&mut write, "carol-at-nowhere").await;
    expect_msg(&mut read, "Bad email address").await;

    send_line(&mut write, "register carol").await;
    expect_msg(&mut read, "Enter your email address").await;
    send_line(&mut write, "carol@example.com").await;
    answer_secure_prompt(&mut write, &mut read, "Enter a good password", "one").await;
    answer_secure_prompt(&mut write, &mut read, "Re-enter your password", "two").await;
    expect_msg(&mut read, "Failed! Passwords did not match").await;
    assert!(!server.state.store.exists("carol").await.unwrap());

    register(&mut write, &mut read, "carol", "carol@example.com", "pw").await;
    send_line(&mut write, "register CAROL").await;
    expect_msg(&mut read, "User already exists.").await;
    assert!(server.state.store.login("carol", "pw").await.is_ok());
}

#[tokio::test]
async fn test_name_held_by_another_session() {
    let server = start_test_server().await;
    let (mut a_write, mut a_read, _a) = connect_client(&server).await;
    let (mut b_write, mut b_read, _b) = connect_client(&server).await;

    register(&mut a_write, &mut a_read, "dave", "dave@example.com", "pw").await;
    login(&mut a_write, &mut a_read, "dave", "pw").await;
    expect_msg(&mut a_read, "Welcome back, dave").await;

    send_line(&mut b_write, "login Dave").await;
    expect_msg(&mut b_read, "Dave is already in use by another session").await;

    // Once the first session logs out the name is free again.
    send_line(&mut a_write, "logout").await;
    let seen = expect_kind(&mut a_read, "appendElement").await;
    assert!(seen["Map"]["Text"]
        .as_str()
        .unwrap()
        .starts_with("Logged out. You are now Guest"));

    login(&mut b_write, &mut b_read, "dave", "pw").await;
    expect_msg(&mut b_read, "Welcome back, dave").await;

    send_line(&mut b_write, "logout").await;
    send_line(&mut b_write, "logout").await;
    expect_msg(&mut b_read, "Not logged in.").await;
}
