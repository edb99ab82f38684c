//! System-mode commands and the handlers shared with chat mode.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

use super::{Command, CommandKind, CommandTable};
use crate::auth::validate::{is_email, is_name};
use crate::error::{AuthError, CommandError};
use crate::proto::packet::{Packet, INPUT_BOX, MSG_LIST};
use crate::session::{AuthState, Session};

const EDITOR: &str = "#msg-list #editor";

static IPV4: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b\d{1,3}\.\d{1,3}\.\d{1,3}\.\d{1,3}\b").expect("valid ipv4 regex")
});

pub fn table() -> CommandTable {
    CommandTable::new(
        "",
        [
            Command {
                name: "help",
                description: "help returns help information about available commands.",
                kind: CommandKind::Help,
            },
            Command {
                name: "clear",
                description: "clear the current terminal's content",
                kind: CommandKind::Clear,
            },
            Command {
                name: "editor",
                description: "editor opens a simple editable box in the terminal",
                kind: CommandKind::Editor,
            },
            Command {
                name: "ipscraper",
                description: "scrapes unique ip addresses from editor box text",
                kind: CommandKind::IpScraper,
            },
            Command {
                name: "whoami",
                description: "whoami shows your name, login state and room",
                kind: CommandKind::WhoAmI,
            },
            Command {
                name: "rooms",
                description: "rooms lists the rooms that currently have members",
                kind: CommandKind::Rooms,
            },
            Command {
                name: "login",
                description: "login lets you log into a registered user account.",
                kind: CommandKind::Login,
            },
            Command {
                name: "logout",
                description: "logout returns you to a guest name",
                kind: CommandKind::Logout,
            },
            Command {
                name: "register",
                description: "register a user account",
                kind: CommandKind::Register,
            },
            Command {
                name: "connect",
                description: "connect <room> joins a chat room, creating it if needed",
                kind: CommandKind::Connect,
            },
            Command {
                name: "disconnect",
                description: "disconnect leaves the current chat room",
                kind: CommandKind::Disconnect,
            },
        ],
    )
}

pub(super) async fn help(session: &mut Session, args: &[String]) -> Result<(), CommandError> {
    let table = session.table();
    let prefix = table.prefix();

    let text = match args.get(1) {
        None => {
            let names: Vec<String> = table.names().map(|n| format!("{}{}", prefix, n)).collect();
            format!("Available commands: {}", names.join(" "))
        }
        Some(wanted) => {
            let bare = wanted.strip_prefix(prefix).unwrap_or(wanted);
            match table.lookup(bare) {
                Some(cmd) => cmd.description.to_string(),
                None => format!("Command not available: {}", wanted),
            }
        }
    };
    session.append_msg(MSG_LIST, &text)?;
    Ok(())
}

pub(super) async fn clear(session: &mut Session, _args: &[String]) -> Result<(), CommandError> {
    session.inner_html(MSG_LIST, "")?;
    Ok(())
}

pub(super) async fn editor(session: &mut Session, _args: &[String]) -> Result<(), CommandError> {
    session.append_msg(MSG_LIST, "Editor box:")?;
    session.send(
        Packet::new("appendElement")
            .with("Element", "div")
            .with("Selector", MSG_LIST)
            .with("Id", "editor")
            .with("Scroll", "true"),
    )?;
    session.editable(EDITOR, true)?;
    session.set_property(EDITOR, "border", "1px solid #fff")?;
    session.focus(EDITOR, true)?;
    Ok(())
}

pub(super) async fn ipscraper(session: &mut Session, _args: &[String]) -> Result<(), CommandError> {
    if !session.exists(EDITOR).await? {
        session.append_msg(MSG_LIST, "You do not have an editor box open")?;
        return Ok(());
    }

    let html = session.get_html(EDITOR).await?;
    let mut seen = HashSet::new();
    for found in IPV4.find_iter(&html) {
        let ip = found.as_str();
        if seen.insert(ip) {
            session.append_link(MSG_LIST, &format!("http://{}", ip), ip)?;
            session.append_break(MSG_LIST)?;
        }
    }
    if seen.is_empty() {
        session.append_msg(MSG_LIST, "No IP addresses found")?;
    }
    Ok(())
}

pub(super) async fn whoami(session: &mut Session, _args: &[String]) -> Result<(), CommandError> {
    let auth = match session.auth() {
        AuthState::Guest => "guest".to_string(),
        AuthState::Authenticated(profile) => format!("logged in as {}", profile.name),
    };
    let room = match session.room() {
        Some(room) => format!("in room {}", room.name()),
        None => "not in a room".to_string(),
    };
    let text = format!("You are {} ({}, {})", session.display_name(), auth, room);
    session.append_msg(MSG_LIST, &text)?;
    Ok(())
}

pub(super) async fn rooms(session: &mut Session, _args: &[String]) -> Result<(), CommandError> {
    let directory = session.state().directory.clone();
    let rooms = directory.rooms().await;
    let text = if rooms.is_empty() {
        "No active rooms".to_string()
    } else {
        format!("Active rooms: {}", rooms.join(", "))
    };
    session.append_msg(MSG_LIST, &text)?;
    Ok(())
}

pub(super) async fn login(session: &mut Session, args: &[String]) -> Result<(), CommandError> {
    let Some(name) = args.get(1) else {
        session.append_msg(MSG_LIST, "Usage: login <name>")?;
        return Ok(());
    };
    if !is_name(name) {
        return Err(AuthError::InvalidName.into());
    }
    let store = session.state().store.clone();
    if !store.exists(name).await? {
        return Err(AuthError::UnknownUser.into());
    }
    // Refuse before asking for a password that could not be used anyway.
    if session.state().names.is_held_by_other(name, session.id()) {
        return Err(AuthError::NameInUse(name.clone()).into());
    }

    let password = session
        .prompt_secure(INPUT_BOX, "Please enter your password")
        .await?;
    if password.is_empty() {
        session.append_msg(MSG_LIST, "Login failed")?;
        return Ok(());
    }

    match store.login(name, &password).await {
        Ok(profile) => {
            session.authenticate(profile)?;
            tracing::info!(session_id = %session.id(), name = %session.display_name(), "Login succeeded");
            let greeting = format!("Welcome back, {}", session.display_name());
            session.append_msg(MSG_LIST, &greeting)?;
            Ok(())
        }
        Err(e) => {
            tracing::warn!(session_id = %session.id(), name = %name, error = %e, "Login failed");
            Err(e.into())
        }
    }
}

pub(super) async fn logout(session: &mut Session, _args: &[String]) -> Result<(), CommandError> {
    session.logout()?;
    let text = format!("Logged out. You are now {}", session.display_name());
    session.append_msg(MSG_LIST, &text)?;
    Ok(())
}

pub(super) async fn register(session: &mut Session, args: &[String]) -> Result<(), CommandError> {
    let Some(name) = args.get(1) else {
        session.append_msg(MSG_LIST, "Usage: register <name>")?;
        return Ok(());
    };
    if !is_name(name) {
        return Err(AuthError::InvalidName.into());
    }
    let store = session.state().store.clone();
    if store.exists(name).await? {
        return Err(AuthError::Duplicate.into());
    }

    let email = session.prompt("Enter your email address").await?;
    if !is_email(&email) {
        return Err(AuthError::MalformedEmail.into());
    }
    let first = session.prompt_secure(INPUT_BOX, "Enter a good password").await?;
    let second = session.prompt_secure(INPUT_BOX, "Re-enter your password").await?;
    if first != second {
        return Err(CommandError::Failed("Failed! Passwords did not match".into()));
    }
    if first.is_empty() {
        return Err(CommandError::Failed("Password cannot be empty".into()));
    }

    store.register(name, &first, &email).await?;
    session.append_msg(MSG_LIST, "User account created (don't forget your password!)")?;
    Ok(())
}

pub(super) async fn connect(session: &mut Session, args: &[String]) -> Result<(), CommandError> {
    let Some(room) = args.get(1) else {
        session.append_msg(MSG_LIST, "Usage: connect <room>")?;
        return Ok(());
    };
    if !is_name(room) {
        return Err(CommandError::Failed("Invalid characters in room name".into()));
    }
    session.connect(room).await?;
    session.append_msg(MSG_LIST, "Prefix commands with / while connected. Try /help")?;
    Ok(())
}

pub(super) async fn disconnect(session: &mut Session, _args: &[String]) -> Result<(), CommandError> {
    let room = session.disconnect().await?;
    session.append_msg(MSG_LIST, &format!("Disconnected from {}.", room))?;
    Ok(())
}
