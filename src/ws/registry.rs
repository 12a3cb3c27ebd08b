//! Connection registry and room manager.
//!
//! Rooms are not stored as objects: a room is the set of live connections
//! that currently name it. Empty sets are removed as soon as they empty.
//!
//! All membership changes and the broadcasts that go with them happen under
//! one lock, so a broadcast never misses a member that joined concurrently
//! nor reaches one that already left. Delivery is a non-blocking send on each
//! member's outbound channel, and nothing awaits while the lock is held.

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info};

use super::dispatch::{Outbound, Target};
use super::presence::left_event;
use super::session::{ConnectionId, RoomKey};
use crate::models::ServerEvent;

struct Member {
    tx: UnboundedSender<ServerEvent>,
    user_id: Option<String>,
    room: Option<RoomKey>,
}

#[derive(Default)]
struct Inner {
    connections: HashMap<ConnectionId, Member>,
    file_rooms: HashMap<RoomKey, HashSet<ConnectionId>>,
    project_rooms: HashMap<String, HashSet<ConnectionId>>,
}

/// Counters exposed for diagnostics.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RegistryStats {
    pub connections: usize,
    pub file_rooms: usize,
    pub project_rooms: usize,
    pub largest_room: usize,
}

#[derive(Default)]
pub struct RoomRegistry {
    inner: Mutex<Inner>,
}

impl Inner {
    fn move_member(&mut self, id: ConnectionId, room: Option<RoomKey>) {
        let Some(member) = self.connections.get_mut(&id) else {
            return;
        };
        if member.room == room {
            return;
        }
        let previous = std::mem::replace(&mut member.room, room.clone());

        if let Some(prev) = previous {
            remove_from(&mut self.file_rooms, &prev, id);
            remove_from(&mut self.project_rooms, &prev.project_id, id);
        }
        if let Some(next) = room {
            self.project_rooms.entry(next.project_id.clone()).or_default().insert(id);
            self.file_rooms.entry(next).or_default().insert(id);
        }
    }

    fn targets(&self, caller: ConnectionId, target: &Target) -> Vec<ConnectionId> {
        match target {
            Target::Caller => vec![caller],
            Target::FileRoom(room) => self.file_rooms.get(room).map(|s| s.iter().copied().collect()).unwrap_or_default(),
            Target::ProjectRoom(project) => {
                self.project_rooms.get(project).map(|s| s.iter().copied().collect()).unwrap_or_default()
            }
        }
    }

    fn deliver(&self, caller: ConnectionId, outbound: &Outbound) -> usize {
        let mut delivered = 0;
        for id in self.targets(caller, &outbound.target) {
            if Some(id) == outbound.except {
                continue;
            }
            if let Some(member) = self.connections.get(&id) {
                // A closed channel means the connection is going away; its
                // disconnect will clean up membership.
                if member.tx.send(outbound.event.clone()).is_ok() {
                    delivered += 1;
                }
            }
        }
        delivered
    }
}

fn remove_from<K>(rooms: &mut HashMap<K, HashSet<ConnectionId>>, key: &K, id: ConnectionId)
where
    K: std::hash::Hash + Eq,
{
    if let Some(set) = rooms.get_mut(key) {
        set.remove(&id);
        if set.is_empty() {
            rooms.remove(key);
        }
    }
}

impl RoomRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Track a new connection and the channel its events are written to.
    pub fn register(&self, id: ConnectionId, tx: UnboundedSender<ServerEvent>) {
        self.lock().connections.insert(id, Member { tx, user_id: None, room: None });
        debug!("Registered connection {}", id);
    }

    pub fn is_registered(&self, id: ConnectionId) -> bool {
        self.lock().connections.contains_key(&id)
    }

    /// Move `id` into `room` (or out of every room for `None`) and deliver
    /// `outbound` against the resulting membership, atomically.
    ///
    /// Returns the number of sends that reached a live channel.
    pub fn commit(&self, id: ConnectionId, user_id: Option<&str>, room: Option<RoomKey>, outbound: &[Outbound]) -> usize {
        let mut inner = self.lock();
        if !inner.connections.contains_key(&id) {
            return 0;
        }
        if let Some(member) = inner.connections.get_mut(&id) {
            if let Some(user) = user_id {
                member.user_id = Some(user.to_string());
            }
        }
        inner.move_member(id, room);
        outbound.iter().map(|o| inner.deliver(id, o)).sum()
    }

    /// Send one event to one connection.
    pub fn send_to(&self, id: ConnectionId, event: ServerEvent) -> bool {
        self.lock()
            .connections
            .get(&id)
            .is_some_and(|member| member.tx.send(event).is_ok())
    }

    /// Send an event to every member of a project-wide room.
    pub fn broadcast_project(&self, project_id: &str, event: ServerEvent) -> usize {
        let inner = self.lock();
        let outbound = Outbound { target: Target::ProjectRoom(project_id.to_string()), event, except: None };
        // The caller id is irrelevant for a project target.
        inner.deliver(ConnectionId::nil(), &outbound)
    }

    /// Forget a connection. If it was in a room, the room hears `user:left`.
    ///
    /// Safe to call more than once: later calls find nothing and do nothing.
    pub fn disconnect(&self, id: ConnectionId) -> Option<RoomKey> {
        let mut inner = self.lock();
        let (user, room) = {
            let member = inner.connections.get(&id)?;
            (member.user_id.clone().unwrap_or_default(), member.room.clone())
        };
        inner.move_member(id, None);
        inner.connections.remove(&id);

        if let Some(room) = &room {
            let delivered = inner.deliver(id, &Outbound::room(room.clone(), left_event(&user, room)));
            info!("Connection {} (user {}) dropped from {}, {} notified", id, user, room, delivered);
        } else {
            debug!("Connection {} closed outside any room", id);
        }
        room
    }

    /// Connections currently in a file room.
    pub fn members(&self, room: &RoomKey) -> HashSet<ConnectionId> {
        self.lock().file_rooms.get(room).cloned().unwrap_or_default()
    }

    pub fn room_size(&self, room: &RoomKey) -> usize {
        self.lock().file_rooms.get(room).map_or(0, HashSet::len)
    }

    pub fn project_members(&self, project_id: &str) -> HashSet<ConnectionId> {
        self.lock().project_rooms.get(project_id).cloned().unwrap_or_default()
    }

    /// The file room a connection is in.
    pub fn room_of(&self, id: ConnectionId) -> Option<RoomKey> {
        self.lock().connections.get(&id).and_then(|m| m.room.clone())
    }

    pub fn stats(&self) -> RegistryStats {
        let inner = self.lock();
        RegistryStats {
            connections: inner.connections.len(),
            file_rooms: inner.file_rooms.len(),
            project_rooms: inner.project_rooms.len(),
            largest_room: inner.file_rooms.values().map(HashSet::len).max().unwrap_or(0),
        }
    }
}
