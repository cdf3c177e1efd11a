/// Client registry and per-client notification sinks.
///
/// A record is created by the connection at handshake time and handed to the
/// engine inside `Event::Enqueue`. From then on the engine owns the sending
/// half; the connection only drains the receiving half.
use std::collections::HashMap;

use log::{debug, warn};
use tokio::sync::mpsc::{self, error::TrySendError};

use super::messages::Notification;
use super::types::{ClientId, ClientState, SessionId};

/// Registration handed from a connection to the engine.
#[derive(Debug)]
pub struct ClientRecord {
    id: ClientId,
    session: SessionId,
    sink: mpsc::Sender<Notification>,
}

impl ClientRecord {
    /// Create a record and the stream its connection drains.
    pub fn open(id: ClientId, session: SessionId, capacity: usize) -> (Self, NotificationStream) {
        let (sink, rx) = mpsc::channel(capacity.max(1));
        (Self { id, session, sink }, NotificationStream { rx })
    }

    pub fn id(&self) -> &ClientId {
        &self.id
    }

    /// Best-effort push; never waits on the receiver. Returns whether it was queued.
    ///
    /// The last free slot is kept for lifecycle notifications, so a client that
    /// stops reading loses queue positions before it loses a match or game end.
    pub fn notify(&self, notification: Notification) -> bool {
        let reserved = self.sink.max_capacity() > 1 && self.sink.capacity() <= 1;
        if notification.is_progress() && reserved {
            debug!(
                "[Registry] Sink nearly full for client {}, skipping {:?}",
                self.id, notification
            );
            return false;
        }
        match self.sink.try_send(notification) {
            Ok(()) => true,
            Err(TrySendError::Full(dropped)) => {
                warn!("[Registry] Sink full for client {}, dropping {:?}", self.id, dropped);
                false
            }
            Err(TrySendError::Closed(_)) => {
                debug!("[Registry] Sink closed for client {}", self.id);
                false
            }
        }
    }
}

/// Receiving half of a client's sink.
///
/// Yields notifications while the client is registered and ends once the
/// engine has released the record and the buffer is drained.
#[derive(Debug)]
pub struct NotificationStream {
    rx: mpsc::Receiver<Notification>,
}

impl NotificationStream {
    pub async fn recv(&mut self) -> Option<Notification> {
        self.rx.recv().await
    }

    /// Next buffered notification, without waiting.
    #[cfg(test)]
    pub(crate) fn try_next(&mut self) -> Option<Notification> {
        self.rx.try_recv().ok()
    }
}

struct Entry {
    record: ClientRecord,
    state: ClientState,
}

/// Registered clients keyed by id. Owned by the matchmaking engine.
#[derive(Default)]
pub struct ClientRegistry {
    clients: HashMap<ClientId, Entry>,
}

impl ClientRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    #[cfg(test)]
    pub(crate) fn contains(&self, id: &ClientId) -> bool {
        self.clients.contains_key(id)
    }

    pub fn state(&self, id: &ClientId) -> Option<ClientState> {
        self.clients.get(id).map(|e| e.state)
    }

    /// State of `id` if it is registered under `session`.
    pub fn state_for_session(&self, id: &ClientId, session: SessionId) -> Option<ClientState> {
        self.clients
            .get(id)
            .filter(|e| e.record.session == session)
            .map(|e| e.state)
    }

    /// Register a record. Returns it back when the id is already taken.
    pub fn insert(&mut self, record: ClientRecord, state: ClientState) -> Result<(), ClientRecord> {
        if self.clients.contains_key(&record.id) {
            return Err(record);
        }
        self.clients.insert(record.id.clone(), Entry { record, state });
        Ok(())
    }

    pub fn set_state(&mut self, id: &ClientId, state: ClientState) {
        if let Some(entry) = self.clients.get_mut(id) {
            entry.state = state;
        }
    }

    /// Drop the record, closing its sink once buffered notifications are read.
    pub fn remove(&mut self, id: &ClientId) -> Option<ClientRecord> {
        self.clients.remove(id).map(|e| e.record)
    }

    /// Deliver to a registered client; unknown ids are ignored.
    /// Returns whether the notification was queued.
    pub fn deliver_to(&self, id: &ClientId, notification: Notification) -> bool {
        match self.clients.get(id) {
            Some(entry) => entry.record.notify(notification),
            None => {
                debug!("[Registry] Dropping {:?} for unknown client {}", notification, id);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::matchmaking::types::GameId;

    fn id(s: &str) -> ClientId {
        ClientId::new(s).unwrap()
    }

    #[actix::test]
    async fn test_stream_ends_after_removal() {
        let mut registry = ClientRegistry::new();
        let (record, mut stream) = ClientRecord::open(id("alice"), SessionId::new(), 4);
        registry.insert(record, ClientState::Queued).unwrap();

        registry.deliver_to(&id("alice"), Notification::QueuePosition(1));
        drop(registry.remove(&id("alice")));
        assert_eq!(stream.recv().await, Some(Notification::QueuePosition(1)));
        assert_eq!(stream.recv().await, None);
    }

    #[test]
    fn test_deliver_to_unknown_is_silent() {
        let registry = ClientRegistry::new();
        assert!(!registry.deliver_to(&id("ghost"), Notification::LeftQueue));
        assert_eq!(registry.len(), 0);
    }

    #[test]
    fn test_full_sink_drops_notification() {
        let (record, mut stream) = ClientRecord::open(id("bob"), SessionId::new(), 1);
        record.notify(Notification::QueuePosition(1));
        record.notify(Notification::QueuePosition(2));
        assert_eq!(stream.try_next(), Some(Notification::QueuePosition(1)));
        assert_eq!(stream.try_next(), None);
    }

    #[test]
    fn test_last_slot_is_kept_for_lifecycle() {
        let game_id = GameId::new();
        let (record, mut stream) = ClientRecord::open(id("erin"), SessionId::new(), 3);
        assert!(record.notify(Notification::QueuePosition(3)));
        assert!(record.notify(Notification::QueuePosition(2)));
        assert!(!record.notify(Notification::QueuePosition(1)));
        assert!(record.notify(Notification::MatchFound(game_id)));
        assert!(!record.notify(Notification::GameOver(game_id)));

        assert_eq!(stream.try_next(), Some(Notification::QueuePosition(3)));
        assert_eq!(stream.try_next(), Some(Notification::QueuePosition(2)));
        assert_eq!(stream.try_next(), Some(Notification::MatchFound(game_id)));
        assert_eq!(stream.try_next(), None);
    }

    #[test]
    fn test_duplicate_insert_returns_record() {
        let mut registry = ClientRegistry::new();
        let (first, _s1) = ClientRecord::open(id("carol"), SessionId::new(), 4);
        let (second, _s2) = ClientRecord::open(id("carol"), SessionId::new(), 4);
        let second_session = second.session;
        registry.insert(first, ClientState::Queued).unwrap();
        let rejected = registry.insert(second, ClientState::Queued).unwrap_err();
        assert_eq!(rejected.session, second_session);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_state_for_session_requires_matching_token() {
        let mut registry = ClientRegistry::new();
        let session = SessionId::new();
        let (record, _stream) = ClientRecord::open(id("dave"), session, 4);
        registry.insert(record, ClientState::Queued).unwrap();
        assert_eq!(registry.state_for_session(&id("dave"), session), Some(ClientState::Queued));
        assert_eq!(registry.state_for_session(&id("dave"), SessionId::new()), None);
    }
}
