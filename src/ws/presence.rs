//! Presence Table - Registro degli utenti connessi
//!
//! Ogni utente ha al massimo una connessione attiva: una nuova connessione
//! sostituisce la precedente, che riceve `InternalSignal::Shutdown`.

use crate::dtos::ServerEvent;
use crate::entities::IdType;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info, instrument, warn};

pub type ConnectionId = u64;

/// Segnali interni verso il task di scrittura di una connessione
#[derive(Debug, Clone, PartialEq)]
pub enum InternalSignal {
    Shutdown,
    Event(ServerEvent),
}

/// Handle opaco per inviare eventi ad una connessione
#[derive(Debug, Clone)]
pub struct ConnectionHandle {
    id: ConnectionId,
    tx: UnboundedSender<InternalSignal>,
}

impl ConnectionHandle {
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Best-effort: a closed connection just drops the event.
    pub fn send(&self, event: ServerEvent) -> bool {
        self.tx.send(InternalSignal::Event(event)).is_ok()
    }

    pub fn shutdown(&self) {
        let _ = self.tx.send(InternalSignal::Shutdown);
    }
}

pub struct PresenceTable {
    users_online: DashMap<IdType, ConnectionHandle>,
    next_connection_id: AtomicU64,
}

impl Default for PresenceTable {
    fn default() -> Self {
        Self::new()
    }
}

impl PresenceTable {
    pub fn new() -> Self {
        PresenceTable {
            users_online: DashMap::new(),
            next_connection_id: AtomicU64::new(1),
        }
    }

    /// Wraps a writer channel into a handle with a fresh connection id
    pub fn new_handle(&self, tx: UnboundedSender<InternalSignal>) -> ConnectionHandle {
        let id = self.next_connection_id.fetch_add(1, Ordering::Relaxed);
        ConnectionHandle { id, tx }
    }

    /// Registers `handle` as the live connection of `user_id` and tells every
    /// other online user. A replaced connection is shut down; re-registering
    /// the same connection announces nothing.
    #[instrument(skip(self, handle), fields(user_id, connection_id = handle.id))]
    pub fn set_online(&self, user_id: IdType, handle: ConnectionHandle) {
        let connection_id = handle.id;
        let previous = self.users_online.insert(user_id, handle);

        match previous {
            Some(previous) if previous.id == connection_id => {
                debug!("Connection already registered, nothing to announce");
                return;
            }
            Some(previous) => {
                info!(replaced = previous.id, "User reconnected, closing previous connection");
                previous.shutdown();
            }
            None => {}
        }

        info!("User online, total online users: {}", self.users_online.len());
        self.broadcast_presence(user_id, true);
    }

    /// Removes the user whatever connection it holds. Returns whether an
    /// entry was removed; only then is the offline transition broadcast.
    #[instrument(skip(self), fields(user_id))]
    pub fn set_offline(&self, user_id: IdType) -> bool {
        if self.users_online.remove(&user_id).is_none() {
            debug!("User already offline");
            return false;
        }
        info!("User offline");
        self.broadcast_presence(user_id, false);
        true
    }

    /// Removes the entry owned by `connection_id`, if it is still the live
    /// one. A stale connection never evicts a newer one.
    #[instrument(skip(self), fields(connection_id))]
    pub fn remove_by_connection(&self, connection_id: ConnectionId) -> Option<IdType> {
        let user_id = self
            .users_online
            .iter()
            .find(|entry| entry.value().id == connection_id)
            .map(|entry| *entry.key())?;

        // the iterator guard above must be gone before touching the shard again
        let removed = self
            .users_online
            .remove_if(&user_id, |_, handle| handle.id == connection_id)
            .is_some();

        if !removed {
            debug!("Connection was replaced concurrently, nothing to remove");
            return None;
        }

        info!(user_id, "Connection closed, user offline");
        self.broadcast_presence(user_id, false);
        Some(user_id)
    }

    pub fn lookup(&self, user_id: &IdType) -> Option<ConnectionHandle> {
        self.users_online.get(user_id).map(|entry| entry.value().clone())
    }

    /// Sends `event` to the user if online. Returns whether it was handed
    /// to a live connection.
    #[instrument(skip(self, event), fields(user_id))]
    pub fn notify(&self, user_id: &IdType, event: ServerEvent) -> bool {
        match self.lookup(user_id) {
            Some(handle) => {
                let sent = handle.send(event);
                if !sent {
                    warn!("Connection closed before the event could be queued");
                }
                sent
            }
            None => {
                debug!("User not online, event not delivered");
                false
            }
        }
    }

    /// Get the count of online users
    pub fn online_count(&self) -> usize {
        self.users_online.len()
    }

    /// Check if a specific user is online
    pub fn is_user_online(&self, user_id: &IdType) -> bool {
        self.users_online.contains_key(user_id)
    }

    fn broadcast_presence(&self, user_id: IdType, is_online: bool) {
        // snapshot first, sending while iterating would hold the shard locks
        let recipients: Vec<ConnectionHandle> = self
            .users_online
            .iter()
            .filter(|entry| *entry.key() != user_id)
            .map(|entry| entry.value().clone())
            .collect();

        for handle in &recipients {
            handle.send(ServerEvent::PresenceChanged { user_id, is_online });
        }
        debug!(recipients = recipients.len(), is_online, "Presence broadcast");
    }
}
