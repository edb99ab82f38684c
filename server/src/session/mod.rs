//! Per-connection session state machine.
//!
//! A session is owned by its connection's read loop. It holds the current mode
//! (system prompt or a chat room), the command table for that mode, and the
//! identity of the user. Only the read loop mutates it.

pub mod dom;
pub mod limit;

use std::sync::Arc;

use futures_util::stream::BoxStream;
use futures_util::StreamExt;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::auth::validate::fold;
use crate::auth::Profile;
use crate::command::{tokenize, CommandTable};
use crate::error::{AuthError, CommandError, ProtocolError, RoomError};
use crate::proto::packet::{Packet, MSG_LIST, STATUS_BOX};
use crate::rooms::{Member, RoomHandle};
use crate::state::AppState;

pub use limit::{InputLimiter, InputPolicy};

pub type SessionId = Uuid;

/// Queue drained by a connection's writer task. Rooms hold clones of it.
pub type Outbox = mpsc::UnboundedSender<Packet>;

/// Decoded packets from the client, in arrival order.
pub type PacketStream = BoxStream<'static, Result<Packet, ProtocolError>>;

const SLOW_DOWN: &str = "Slow down: input ignored.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthState {
    Guest,
    Authenticated(Profile),
}

#[derive(Debug, Clone)]
pub enum Mode {
    System,
    Chat(RoomHandle),
}

pub struct Session {
    id: SessionId,
    address: String,
    display_name: String,
    auth: AuthState,
    mode: Mode,
    table: Arc<CommandTable>,
    outbox: Outbox,
    inbound: PacketStream,
    limiter: Option<InputLimiter>,
    state: AppState,
}

impl Session {
    /// A guest session in system mode with a freshly claimed guest name.
    pub fn new(state: AppState, address: String, outbox: Outbox, inbound: PacketStream) -> Self {
        let id = Uuid::now_v7();
        let display_name = state.names.guest(id);
        let limiter = InputLimiter::new(&state.input_policy);
        let table = state.commands.system.clone();
        Self {
            id,
            address,
            display_name,
            auth: AuthState::Guest,
            mode: Mode::System,
            table,
            outbox,
            inbound,
            limiter,
            state,
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn auth(&self) -> &AuthState {
        &self.auth
    }

    pub fn mode(&self) -> &Mode {
        &self.mode
    }

    pub fn room(&self) -> Option<&RoomHandle> {
        match &self.mode {
            Mode::Chat(room) => Some(room),
            Mode::System => None,
        }
    }

    pub fn table(&self) -> &CommandTable {
        &self.table
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// This session as a room member.
    pub fn member(&self) -> Member {
        Member {
            session: self.id,
            name: self.display_name.clone(),
            outbox: self.outbox.clone(),
        }
    }

    /// Read and dispatch packets until the client goes away, then leave any room
    /// and release the display name.
    pub async fn run(mut self) {
        tracing::info!(
            session_id = %self.id,
            address = %self.address,
            name = %self.display_name,
            "Session started"
        );

        if self.show_status().is_ok() {
            self.read_loop().await;
        }

        self.cleanup().await;
        tracing::info!(session_id = %self.id, name = %self.display_name, "Session stopped");
    }

    async fn read_loop(&mut self) {
        loop {
            let packet = match self.next_packet().await {
                Ok(packet) => packet,
                Err(ProtocolError::Closed) => break,
                Err(e) => {
                    tracing::warn!(session_id = %self.id, error = %e, "Dropping connection");
                    break;
                }
            };

            if let Some(limiter) = &self.limiter {
                if !limiter.admit() {
                    tracing::info!(session_id = %self.id, "Input rejected by rate limit");
                    if self.append_msg(MSG_LIST, SLOW_DOWN).is_err() {
                        break;
                    }
                    continue;
                }
            }

            if let Err(e) = self.handle(&packet).await {
                if e.is_fatal() {
                    tracing::warn!(session_id = %self.id, error = %e, "Dropping connection");
                    break;
                }
                tracing::debug!(session_id = %self.id, error = %e, "Command error");
                if self.append_msg(MSG_LIST, &e.to_string()).is_err() {
                    break;
                }
            }
        }
    }

    /// Next decoded packet from the client. `Closed` once the stream ends.
    pub async fn next_packet(&mut self) -> Result<Packet, ProtocolError> {
        match self.inbound.next().await {
            Some(result) => result,
            None => Err(ProtocolError::Closed),
        }
    }

    /// Tokenize one input packet and dispatch it.
    pub async fn handle(&mut self, packet: &Packet) -> Result<(), CommandError> {
        let line = packet.line();
        let args = tokenize(&line);
        self.dispatch(args, &line).await
    }

    /// Route a tokenized line to a command or to the current room.
    pub async fn dispatch(&mut self, mut args: Vec<String>, line: &str) -> Result<(), CommandError> {
        let Some(first) = args.first() else {
            return Ok(());
        };
        if first.is_empty() {
            return Ok(());
        }

        let prefix = self.table.prefix();
        if !prefix.is_empty() && first.starts_with(prefix) && first.len() > prefix.len() {
            let name = first[prefix.len()..].to_string();
            args[0] = name;
            return self.run_command(&args).await;
        }
        if prefix.is_empty() {
            return self.run_command(&args).await;
        }
        if let Mode::Chat(room) = &self.mode {
            let room = room.clone();
            room.broadcast(format!("[{}] {}", self.display_name, line))
                .await?;
            return Ok(());
        }
        Err(CommandError::Failed("no route for input".into()))
    }

    async fn run_command(&mut self, args: &[String]) -> Result<(), CommandError> {
        let Some(cmd) = self.table.lookup(&args[0]).copied() else {
            return Err(CommandError::NotFound(args[0].clone()));
        };
        tracing::debug!(session_id = %self.id, command = cmd.name, "Running command");
        cmd.kind.run(self, args).await
    }

    /// System -> Chat. Joins (or opens) `room` and switches to the chat table.
    pub async fn connect(&mut self, room: &str) -> Result<(), CommandError> {
        if let Mode::Chat(current) = &self.mode {
            return Err(RoomError::AlreadyConnected(current.name().to_string()).into());
        }

        let directory = self.state.directory.clone();
        let handle = directory.connect(room, self.member()).await?;
        tracing::info!(session_id = %self.id, room = %room, name = %self.display_name, "Joined room");

        self.mode = Mode::Chat(handle);
        self.table = self.state.commands.chat.clone();
        Ok(())
    }

    /// Chat -> System. Returns the name of the room that was left.
    pub async fn disconnect(&mut self) -> Result<String, CommandError> {
        let Mode::Chat(room) = std::mem::replace(&mut self.mode, Mode::System) else {
            return Err(RoomError::NotConnected.into());
        };
        self.table = self.state.commands.system.clone();

        let directory = self.state.directory.clone();
        directory.disconnect(&room, self.member()).await?;
        tracing::info!(session_id = %self.id, room = %room.name(), name = %self.display_name, "Left room");
        Ok(room.name().to_string())
    }

    /// Take on the identity of a logged-in account.
    pub fn authenticate(&mut self, profile: Profile) -> Result<(), CommandError> {
        let names = self.state.names.clone();
        names.claim(&profile.name, self.id)?;
        if fold(&self.display_name) != fold(&profile.name) {
            names.release(&self.display_name, self.id);
        }
        self.display_name = profile.name.clone();
        self.auth = AuthState::Authenticated(profile);
        self.show_status()?;
        Ok(())
    }

    /// Back to a fresh guest name.
    pub fn logout(&mut self) -> Result<(), CommandError> {
        let AuthState::Authenticated(profile) = &self.auth else {
            return Err(AuthError::NotLoggedIn.into());
        };
        tracing::info!(session_id = %self.id, name = %profile.name, "Logged out");

        let names = self.state.names.clone();
        let guest = names.guest(self.id);
        names.release(&self.display_name, self.id);
        self.display_name = guest;
        self.auth = AuthState::Guest;
        self.show_status()?;
        Ok(())
    }

    fn show_status(&self) -> Result<(), ProtocolError> {
        self.inner_html(STATUS_BOX, &format!("<b>{}</b>", self.display_name))
    }

    async fn cleanup(&mut self) {
        if let Mode::Chat(room) = std::mem::replace(&mut self.mode, Mode::System) {
            let directory = self.state.directory.clone();
            if let Err(e) = directory.disconnect(&room, self.member()).await {
                tracing::warn!(session_id = %self.id, room = %room.name(), error = %e, "Leave on close failed");
            }
        }
        self.state.names.release(&self.display_name, self.id);
    }
}
