/// Matchmaking server actor.
///
/// Single owner of the wait queue, the active games and the client registry.
/// Connections never touch this state; they submit [`Event`]s through the
/// actor's mailbox and each one is handled to completion before the next.
use actix::prelude::*;
use log::{debug, info, log_enabled, warn, Level};
use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use super::messages::{Event, GameSummary, MatchmakingState, Notification, Snapshot};
use super::registry::{ClientRecord, ClientRegistry};
use super::types::{ClientId, ClientState, GameId, SessionId};
use crate::config::Settings;

/// Main matchmaking server actor.
pub struct MatchmakingServer {
    /// Queued clients, oldest first.
    queue: VecDeque<ClientId>,
    /// Active games and their members.
    games: HashMap<GameId, Vec<ClientId>>,
    registry: ClientRegistry,
    players_per_game: usize,
    state_report_interval: Duration,
}

impl MatchmakingServer {
    /// Create a new matchmaking server.
    pub fn new(settings: &Settings) -> Self {
        Self {
            queue: VecDeque::new(),
            games: HashMap::new(),
            registry: ClientRegistry::new(),
            players_per_game: settings.players_per_game.max(1),
            state_report_interval: settings.state_report_interval,
        }
    }

    /// Build the current matchmaking state.
    pub fn get_state(&self) -> MatchmakingState {
        let mut games: Vec<GameSummary> = self
            .games
            .iter()
            .map(|(game_id, members)| GameSummary {
                game_id: *game_id,
                members: members.clone(),
            })
            .collect();
        games.sort_by_key(|g| g.game_id.as_uuid());
        MatchmakingState {
            queued: self.queue.iter().cloned().collect(),
            games,
            registered: self.registry.len(),
        }
    }

    /// Apply one event. This is the whole state machine.
    pub fn process(&mut self, event: Event) {
        match event {
            Event::Enqueue(record) => self.enqueue(record),
            Event::LeaveQueue { id, session } => self.leave_queue(&id, session),
            Event::LeaveGame { id, session } => self.leave_game(&id, session),
            Event::Disconnect { id, session } => self.disconnect(&id, session),
        }
    }

    fn enqueue(&mut self, record: ClientRecord) {
        let id = record.id().clone();
        if let Err(record) = self.registry.insert(record, ClientState::Queued) {
            // Id already held by another connection: keep the holder, refuse the newcomer.
            debug!("[Matchmaking] Rejecting duplicate handshake for {}", id);
            record.notify(Notification::Rejected);
            return;
        }
        self.queue.push_back(id.clone());
        self.registry
            .deliver_to(&id, Notification::QueuePosition(self.queue.len()));
        debug!("[Matchmaking] Client {} queued at position {}", id, self.queue.len());
        self.form_games();
    }

    /// Pop full groups off the front of the queue into new games.
    ///
    /// A member whose sink cannot take `MatchFound` is released instead of
    /// being left in a game it never heard about.
    fn form_games(&mut self) {
        let mut formed = false;
        while self.queue.len() >= self.players_per_game {
            let drafted: Vec<ClientId> = self.queue.drain(..self.players_per_game).collect();
            let game_id = GameId::new();
            let mut members = Vec::with_capacity(drafted.len());
            for member in drafted {
                self.registry.set_state(&member, ClientState::InGame(game_id));
                if self.registry.deliver_to(&member, Notification::MatchFound(game_id)) {
                    members.push(member);
                } else {
                    warn!("[Matchmaking] Client {} missed its match, releasing it", member);
                    self.registry.remove(&member);
                }
            }
            formed = true;
            if members.is_empty() {
                continue;
            }
            info!("[Matchmaking] Game created with {} players, game_id={}", members.len(), game_id);
            self.games.insert(game_id, members);
        }
        if formed {
            self.send_positions_from(0);
        }
    }

    fn leave_queue(&mut self, id: &ClientId, session: SessionId) {
        if self.registry.state_for_session(id, session) != Some(ClientState::Queued) {
            debug!("[Matchmaking] Ignoring queue leave for {} (not queued)", id);
            return;
        }
        if let Some(index) = self.remove_from_queue(id) {
            self.registry.deliver_to(id, Notification::LeftQueue);
            self.registry.remove(id);
            debug!("[Matchmaking] Client {} left the queue", id);
            self.send_positions_from(index);
        }
    }

    fn leave_game(&mut self, id: &ClientId, session: SessionId) {
        match self.registry.state_for_session(id, session) {
            Some(ClientState::InGame(game_id)) => {
                info!("[Matchmaking] Client {} ended game {}", id, game_id);
                self.end_game(game_id);
            }
            _ => debug!("[Matchmaking] Ignoring game leave for {} (not in a game)", id),
        }
    }

    fn end_game(&mut self, game_id: GameId) {
        let Some(members) = self.games.remove(&game_id) else {
            return;
        };
        for member in &members {
            self.registry.deliver_to(member, Notification::GameOver(game_id));
            self.registry.remove(member);
        }
    }

    fn disconnect(&mut self, id: &ClientId, session: SessionId) {
        match self.registry.state_for_session(id, session) {
            Some(ClientState::Queued) => {
                let index = self.remove_from_queue(id);
                self.registry.remove(id);
                debug!("[Matchmaking] Client {} disconnected while queued", id);
                if let Some(index) = index {
                    self.send_positions_from(index);
                }
            }
            Some(ClientState::InGame(game_id)) => {
                self.registry.remove(id);
                if let Some(members) = self.games.get_mut(&game_id) {
                    members.retain(|m| m != id);
                    if members.is_empty() {
                        self.games.remove(&game_id);
                        debug!("[Matchmaking] Game {} dropped, no members left", game_id);
                    }
                }
                debug!("[Matchmaking] Client {} disconnected from game {}", id, game_id);
            }
            None => debug!("[Matchmaking] Ignoring disconnect for {} (not registered)", id),
        }
    }

    /// Remove `id` from the queue, keeping the order of the others.
    fn remove_from_queue(&mut self, id: &ClientId) -> Option<usize> {
        let index = self.queue.iter().position(|q| q == id)?;
        self.queue.remove(index);
        Some(index)
    }

    /// Send the current position to every queued client from `start` on.
    fn send_positions_from(&self, start: usize) {
        for (index, id) in self.queue.iter().enumerate().skip(start) {
            self.registry
                .deliver_to(id, Notification::QueuePosition(index + 1));
        }
    }

    fn report_state(&self) {
        if !log_enabled!(Level::Debug) {
            return;
        }
        match serde_json::to_string(&self.get_state()) {
            Ok(state) => debug!("[Matchmaking] State: {}", state),
            Err(e) => debug!("[Matchmaking] Failed to serialize state: {}", e),
        }
    }
}

impl Actor for MatchmakingServer {
    type Context = Context<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        info!("[Matchmaking] Engine started, {} players per game", self.players_per_game);
        ctx.run_interval(self.state_report_interval, |act, _ctx| act.report_state());
    }
}

impl Handler<Event> for MatchmakingServer {
    type Result = ();

    fn handle(&mut self, msg: Event, _ctx: &mut Self::Context) -> Self::Result {
        self.process(msg);
    }
}

impl Handler<Snapshot> for MatchmakingServer {
    type Result = MessageResult<Snapshot>;

    fn handle(&mut self, _msg: Snapshot, _ctx: &mut Self::Context) -> Self::Result {
        MessageResult(self.get_state())
    }
}
