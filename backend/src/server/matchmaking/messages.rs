use actix::prelude::*;
use serde::{Deserialize, Serialize};

use super::registry::ClientRecord;
use super::types::{ClientId, GameId, SessionId};

/// Engine input. Every connection submits these through the engine's mailbox.
#[derive(Message, Debug)]
#[rtype(result = "()")]
pub enum Event {
    /// Handshake completed: admit the client into the wait queue.
    Enqueue(ClientRecord),
    /// Voluntary queue leave (`SHUT`).
    LeaveQueue { id: ClientId, session: SessionId },
    /// Voluntary game leave (`QUIT`), ends the sender's game.
    LeaveGame { id: ClientId, session: SessionId },
    /// Connection closed, for whatever reason.
    Disconnect { id: ClientId, session: SessionId },
}

/// Engine output destined for a single client.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Notification {
    /// 1-based position in the wait queue.
    QueuePosition(usize),
    MatchFound(GameId),
    LeftQueue,
    GameOver(GameId),
    /// The handshake id is already held by another connection.
    Rejected,
}

impl Notification {
    /// Progress updates may be skipped; everything else changes what the client is.
    pub fn is_progress(&self) -> bool {
        matches!(self, Notification::QueuePosition(_))
    }
}

/// Snapshot of one active game.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct GameSummary {
    pub game_id: GameId,
    pub members: Vec<ClientId>,
}

/// Read-only view of the engine state.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct MatchmakingState {
    pub queued: Vec<ClientId>, // oldest first
    pub games: Vec<GameSummary>,
    pub registered: usize,
}

#[cfg(test)]
impl MatchmakingState {
    pub fn is_queued(&self, id: &ClientId) -> bool {
        self.queued.contains(id)
    }

    pub fn is_in_game(&self, id: &ClientId) -> bool {
        self.games.iter().any(|g| g.members.contains(id))
    }
}

/// Request a snapshot of the engine state.
#[derive(Message)]
#[rtype(result = "MatchmakingState")]
pub struct Snapshot;
