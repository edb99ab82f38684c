//! Chat rooms: one hub actor per active room, and a directory actor that owns
//! the room name → hub map.
//!
//! A hub is created with its first member and removes itself from the directory
//! when its last member leaves, so a room is listed exactly while it is occupied.

pub mod directory;
pub mod hub;

pub use directory::RoomDirectory;
pub use hub::{Member, RoomHandle};
