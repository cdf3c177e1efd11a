// src/server/mod.rs

//! Server layer root module.
//!
//! This module organizes the main server components, including:
//! - Application state management
//! - TCP accept loop and per-connection sessions
//! - Fixed-size wire frames and connection errors
//! - Matchmaking engine (queue, games, notifications)

pub mod state;
pub mod listener;
pub mod connection;
pub mod protocol;
pub mod error;
pub mod matchmaking;
