//! User accounts and display names.

pub mod names;
pub mod store;
pub mod validate;

pub use names::NameRegistry;
pub use store::{CredentialStore, Profile};
