//! Wire protocol between the browser terminal and the server.
//!
//! Every message in either direction is a single JSON [`Packet`]. Server-bound
//! packets carry a command line; client-bound packets drive the document.

pub mod packet;

pub use packet::{decode, encode, Packet};
