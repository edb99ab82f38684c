use std::collections::HashMap;

use tokio::sync::{mpsc, oneshot};

use crate::error::RoomError;
use crate::rooms::hub::{self, HubId, Member, RoomHandle};

/// Commands processed by the directory actor, one at a time.
enum DirectoryCommand {
    /// Find the room's hub, or start one with `member` as its first member.
    /// Replies with the handle and whether `member` was already added.
    Open {
        room: String,
        member: Member,
        reply: oneshot::Sender<(RoomHandle, bool)>,
    },
    /// Sent by a hub whose last member left.
    Vacate {
        room: String,
        hub: HubId,
        reply: oneshot::Sender<()>,
    },
    List {
        reply: oneshot::Sender<Vec<String>>,
    },
}

/// Process-wide registry of active rooms.
///
/// All reads and writes of the room map go through a single actor task. The
/// actor never waits on a hub, so hubs can safely wait on the directory.
#[derive(Clone)]
pub struct RoomDirectory {
    tx: mpsc::UnboundedSender<DirectoryCommand>,
}

impl RoomDirectory {
    /// Start the directory actor.
    pub fn spawn() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        // The actor keeps only a weak sender so it stops once every handle,
        // including the ones held by hubs, is gone.
        tokio::spawn(run_directory(rx, tx.downgrade()));
        Self { tx }
    }

    /// Join `member` to `room`, creating the room if needed, and announce them.
    pub async fn connect(&self, room: &str, member: Member) -> Result<RoomHandle, RoomError> {
        let handle = loop {
            let (reply, opened) = oneshot::channel();
            self.tx
                .send(DirectoryCommand::Open {
                    room: room.to_string(),
                    member: member.clone(),
                    reply,
                })
                .map_err(|_| RoomError::Unavailable)?;
            let (handle, joined) = opened.await.map_err(|_| RoomError::Unavailable)?;

            if joined {
                break handle;
            }
            match handle.join(member.clone()).await {
                Ok(()) => break handle,
                Err(_) => {
                    // The hub emptied and closed between lookup and join.
                    tracing::debug!(room = %room, "Room closed during join, retrying");
                }
            }
        };

        handle
            .broadcast(format!("{} has connected.", member.name))
            .await?;
        Ok(handle)
    }

    /// Announce `member`'s departure and remove them from `room`.
    pub async fn disconnect(&self, room: &RoomHandle, member: Member) -> Result<(), RoomError> {
        room.broadcast(format!("{} has disconnected.", member.name))
            .await?;
        room.leave(member).await
    }

    /// Names of the currently active rooms, sorted.
    pub async fn rooms(&self) -> Vec<String> {
        let (reply, listed) = oneshot::channel();
        if self.tx.send(DirectoryCommand::List { reply }).is_err() {
            return Vec::new();
        }
        listed.await.unwrap_or_default()
    }

    pub async fn contains(&self, room: &str) -> bool {
        self.rooms().await.iter().any(|r| r == room)
    }

    /// Remove `room` if it is still served by hub `id`. Only hubs call this.
    pub(crate) async fn vacate(&self, room: &str, id: HubId) {
        let (reply, vacated) = oneshot::channel();
        let cmd = DirectoryCommand::Vacate {
            room: room.to_string(),
            hub: id,
            reply,
        };
        if self.tx.send(cmd).is_ok() {
            let _ = vacated.await;
        }
    }
}

async fn run_directory(
    mut rx: mpsc::UnboundedReceiver<DirectoryCommand>,
    weak: mpsc::WeakUnboundedSender<DirectoryCommand>,
) {
    let mut rooms: HashMap<String, RoomHandle> = HashMap::new();
    let mut next_id: HubId = 1;

    while let Some(cmd) = rx.recv().await {
        match cmd {
            DirectoryCommand::Open {
                room,
                member,
                reply,
            } => {
                if let Some(handle) = rooms.get(&room) {
                    let _ = reply.send((handle.clone(), false));
                    continue;
                }
                // Every public handle is gone; nobody can join any more.
                let Some(tx) = weak.upgrade() else {
                    break;
                };
                let id = next_id;
                next_id += 1;
                let handle = hub::spawn(id, room.clone(), member, RoomDirectory { tx });
                rooms.insert(room, handle.clone());
                let _ = reply.send((handle, true));
            }
            DirectoryCommand::Vacate { room, hub, reply } => {
                if rooms.get(&room).is_some_and(|h| h.id() == hub) {
                    rooms.remove(&room);
                } else {
                    tracing::error!(room = %room, hub, "Vacate from a hub the directory does not list");
                }
                let _ = reply.send(());
            }
            DirectoryCommand::List { reply } => {
                let mut names: Vec<String> = rooms.keys().cloned().collect();
                names.sort();
                let _ = reply.send(names);
            }
        }
    }
}
