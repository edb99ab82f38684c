use std::collections::HashMap;

use tokio::sync::{mpsc, oneshot};

use crate::auth::validate::fold;
use crate::error::RoomError;
use crate::proto::packet::{Packet, MSG_LIST};
use crate::rooms::directory::RoomDirectory;
use crate::session::{Outbox, SessionId};

/// Identifies one hub incarnation; a room that closes and reopens gets a new id.
pub type HubId = u64;

/// A session as seen by a room: its name and the queue its writer task drains.
#[derive(Debug, Clone)]
pub struct Member {
    pub session: SessionId,
    pub name: String,
    pub outbox: Outbox,
}

#[derive(Debug)]
enum HubEvent {
    Join(Member),
    Leave(Member),
    Broadcast(String),
}

/// An event plus the completion the sender waits on.
struct Delivery {
    event: HubEvent,
    done: oneshot::Sender<()>,
}

/// Cloneable address of a running hub.
#[derive(Clone)]
pub struct RoomHandle {
    id: HubId,
    name: String,
    tx: mpsc::Sender<Delivery>,
}

impl std::fmt::Debug for RoomHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoomHandle")
            .field("id", &self.id)
            .field("name", &self.name)
            .finish()
    }
}

impl RoomHandle {
    pub fn id(&self) -> HubId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub async fn join(&self, member: Member) -> Result<(), RoomError> {
        self.send(HubEvent::Join(member)).await
    }

    pub async fn leave(&self, member: Member) -> Result<(), RoomError> {
        self.send(HubEvent::Leave(member)).await
    }

    pub async fn broadcast(&self, text: impl Into<String>) -> Result<(), RoomError> {
        self.send(HubEvent::Broadcast(text.into())).await
    }

    /// Hand an event to the hub and wait until it has been processed.
    /// The inbox holds a single event, so a busy hub stalls its senders.
    async fn send(&self, event: HubEvent) -> Result<(), RoomError> {
        let (done, processed) = oneshot::channel();
        self.tx
            .send(Delivery { event, done })
            .await
            .map_err(|_| RoomError::Unavailable)?;
        processed.await.map_err(|_| RoomError::Unavailable)
    }
}

/// Start a hub for `name` whose first member is `founder`.
pub(crate) fn spawn(
    id: HubId,
    name: String,
    founder: Member,
    directory: RoomDirectory,
) -> RoomHandle {
    let (tx, inbox) = mpsc::channel(1);
    let mut members = HashMap::new();
    members.insert(fold(&founder.name), founder);

    let hub = Hub {
        id,
        name: name.clone(),
        members,
        inbox,
        directory,
    };
    tokio::spawn(hub.run());

    RoomHandle { id, name, tx }
}

struct Hub {
    id: HubId,
    name: String,
    members: HashMap<String, Member>,
    inbox: mpsc::Receiver<Delivery>,
    directory: RoomDirectory,
}

impl Hub {
    async fn run(mut self) {
        tracing::info!(room = %self.name, hub = self.id, "Room opened");

        while let Some(Delivery { event, done }) = self.inbox.recv().await {
            match event {
                HubEvent::Join(member) => {
                    tracing::debug!(room = %self.name, member = %member.name, "Member joined");
                    self.members.insert(fold(&member.name), member);
                }
                HubEvent::Leave(member) => {
                    let key = fold(&member.name);
                    if self
                        .members
                        .get(&key)
                        .is_some_and(|m| m.session == member.session)
                    {
                        self.members.remove(&key);
                        tracing::debug!(room = %self.name, member = %member.name, "Member left");
                    } else {
                        tracing::error!(
                            room = %self.name,
                            member = %member.name,
                            "Leave from a session that is not a member"
                        );
                    }

                    if self.members.is_empty() {
                        self.directory.vacate(&self.name, self.id).await;
                        self.inbox.close();
                        let _ = done.send(());
                        break;
                    }
                }
                HubEvent::Broadcast(text) => {
                    let packet = Packet::append_msg(MSG_LIST, &text);
                    for member in self.members.values() {
                        // A closed outbox belongs to a session that is already
                        // on its way out and will send Leave.
                        let _ = member.outbox.send(packet.clone());
                    }
                }
            }
            let _ = done.send(());
        }

        // Events that raced with closing are dropped; their senders see
        // Unavailable and go back through the directory.
        while let Some(late) = self.inbox.recv().await {
            drop(late);
        }

        tracing::info!(room = %self.name, hub = self.id, "Room closed");
    }
}
