// src/server/state.rs

//! Application state for the queue server.
//!
//! Holds the matchmaking engine address and the runtime settings shared by
//! the listener and every connection.

use actix::{Addr, Recipient};
use crate::config::Settings;
use crate::server::matchmaking::messages::Event;
use crate::server::matchmaking::server::MatchmakingServer;

/// Shared application state, cloned into each connection task.
#[derive(Clone)]
pub struct AppState {
    /// Address of the matchmaking engine actor (queue, games, notifications).
    pub matchmaking_addr: Addr<MatchmakingServer>,
    pub settings: Settings,
}

impl AppState {
    /// Create a new AppState with the given engine address.
    pub fn new(matchmaking_addr: Addr<MatchmakingServer>, settings: Settings) -> Self {
        AppState {
            matchmaking_addr,
            settings,
        }
    }

    /// Where connections submit their events.
    pub fn intake(&self) -> Recipient<Event> {
        self.matchmaking_addr.clone().recipient()
    }
}
