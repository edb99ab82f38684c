//! Commands available while connected to a room. Typed with a `/` prefix; anything
//! else is chat text for the room.

use super::{Command, CommandKind, CommandTable};

pub const PREFIX: &str = "/";

pub fn table() -> CommandTable {
    CommandTable::new(
        PREFIX,
        [
            Command {
                name: "help",
                description: "/help lists the commands available in a room.",
                kind: CommandKind::Help,
            },
            Command {
                name: "clear",
                description: "/clear the current terminal's content",
                kind: CommandKind::Clear,
            },
            Command {
                name: "whoami",
                description: "/whoami shows your name, login state and room",
                kind: CommandKind::WhoAmI,
            },
            Command {
                name: "disconnect",
                description: "/disconnect leaves the room and returns to the system prompt",
                kind: CommandKind::Disconnect,
            },
        ],
    )
}
