//! Error taxonomy for sessions, commands, authentication and rooms.
//!
//! Only `ProtocolError` ends a session; everything else is reported back to the
//! originating client as a terminal message and the connection stays open.

use thiserror::Error;

/// Failure to read or write a packet on a connection.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("malformed packet: {0}")]
    Malformed(String),
    #[error("connection closed")]
    Closed,
    #[error("transport error: {0}")]
    Transport(String),
    #[error("failed to encode packet: {0}")]
    Encode(String),
}

impl From<serde_json::Error> for ProtocolError {
    fn from(e: serde_json::Error) -> Self {
        ProtocolError::Malformed(e.to_string())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("Bad username or password.")]
    BadCredentials,
    #[error("User does not exist")]
    UnknownUser,
    #[error("User already exists.")]
    Duplicate,
    #[error("Bad email address")]
    MalformedEmail,
    #[error("Invalid characters in name")]
    InvalidName,
    #[error("Not logged in.")]
    NotLoggedIn,
    #[error("{0} is already in use by another session")]
    NameInUse(String),
    #[error("credential store error: {0}")]
    Store(String),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RoomError {
    #[error("Not connected to a server.")]
    NotConnected,
    #[error("Already connected to {0}. Disconnect first.")]
    AlreadyConnected(String),
    #[error("Room service unavailable.")]
    Unavailable,
}

#[derive(Debug, Error)]
pub enum CommandError {
    #[error("Command not found.")]
    NotFound(String),
    #[error("{0}")]
    Failed(String),
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error(transparent)]
    Room(#[from] RoomError),
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}

impl CommandError {
    /// Whether the error must end the session's read loop.
    pub fn is_fatal(&self) -> bool {
        matches!(self, CommandError::Protocol(_))
    }
}
