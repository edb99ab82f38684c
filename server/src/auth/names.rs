//! Process-wide registry of display names held by live sessions.
//!
//! Names are compared case-folded, so "Alice" and "alice" cannot be online at the
//! same time. Room membership relies on this to keep member names unique.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use rand::Rng;

use crate::auth::validate::fold;
use crate::error::AuthError;
use crate::session::SessionId;

#[derive(Debug, Default)]
pub struct NameRegistry {
    names: DashMap<String, SessionId>,
}

impl NameRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim `name` for `session`. Re-claiming a name the session already holds is a no-op.
    pub fn claim(&self, name: &str, session: SessionId) -> Result<(), AuthError> {
        match self.names.entry(fold(name)) {
            Entry::Occupied(e) if *e.get() == session => Ok(()),
            Entry::Occupied(_) => Err(AuthError::NameInUse(name.to_string())),
            Entry::Vacant(e) => {
                e.insert(session);
                Ok(())
            }
        }
    }

    /// Release `name` if it is held by `session`.
    pub fn release(&self, name: &str, session: SessionId) {
        self.names.remove_if(&fold(name), |_, holder| *holder == session);
    }

    /// Allocate and claim a fresh `GuestNNNNN` name.
    pub fn guest(&self, session: SessionId) -> String {
        loop {
            let n: u32 = rand::rng().random_range(0..100_000);
            let name = format!("Guest{:05}", n);
            if self.claim(&name, session).is_ok() {
                return name;
            }
        }
    }

    pub fn is_online(&self, name: &str) -> bool {
        self.names.contains_key(&fold(name))
    }

    /// Whether `name` is currently held by a session other than `session`.
    pub fn is_held_by_other(&self, name: &str, session: SessionId) -> bool {
        self.names
            .get(&fold(name))
            .is_some_and(|holder| *holder != session)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}
