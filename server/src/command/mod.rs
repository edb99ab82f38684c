//! Command tables and their handlers.
//!
//! Two immutable tables are built at startup: system commands (typed bare) and
//! chat commands (typed with a `/` prefix while in a room). A session points at
//! exactly one of them; dispatch is a case-insensitive lookup.

pub mod chat;
pub mod system;
pub mod tokenize;

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::error::CommandError;
use crate::session::Session;

pub use tokenize::tokenize;

/// Every command the server knows. Tables map names onto these.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    Help,
    Clear,
    Editor,
    IpScraper,
    WhoAmI,
    Rooms,
    Login,
    Logout,
    Register,
    Connect,
    Disconnect,
}

impl CommandKind {
    /// Run the command for `session`. `args[0]` is the command name without prefix.
    pub async fn run(self, session: &mut Session, args: &[String]) -> Result<(), CommandError> {
        match self {
            CommandKind::Help => system::help(session, args).await,
            CommandKind::Clear => system::clear(session, args).await,
            CommandKind::Editor => system::editor(session, args).await,
            CommandKind::IpScraper => system::ipscraper(session, args).await,
            CommandKind::WhoAmI => system::whoami(session, args).await,
            CommandKind::Rooms => system::rooms(session, args).await,
            CommandKind::Login => system::login(session, args).await,
            CommandKind::Logout => system::logout(session, args).await,
            CommandKind::Register => system::register(session, args).await,
            CommandKind::Connect => system::connect(session, args).await,
            CommandKind::Disconnect => system::disconnect(session, args).await,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Command {
    pub name: &'static str,
    pub description: &'static str,
    pub kind: CommandKind,
}

/// A named set of commands plus the prefix that selects them.
#[derive(Debug)]
pub struct CommandTable {
    prefix: &'static str,
    commands: BTreeMap<&'static str, Command>,
}

impl CommandTable {
    pub fn new(prefix: &'static str, commands: impl IntoIterator<Item = Command>) -> Self {
        Self {
            prefix,
            commands: commands.into_iter().map(|c| (c.name, c)).collect(),
        }
    }

    /// "" for the system table, "/" for the chat table.
    pub fn prefix(&self) -> &'static str {
        self.prefix
    }

    /// Case-insensitive exact match on a prefix-less name.
    pub fn lookup(&self, name: &str) -> Option<&Command> {
        self.commands.get(name.to_lowercase().as_str())
    }

    /// Command names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.commands.keys().copied()
    }
}

/// Both tables, shared by every session.
#[derive(Debug)]
pub struct CommandRegistry {
    pub system: Arc<CommandTable>,
    pub chat: Arc<CommandTable>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self {
            system: Arc::new(system::table()),
            chat: Arc::new(chat::table()),
        }
    }
}

impl Default for CommandRegistry {
    fn default() -> Self {
        Self::new()
    }
}
