//! Matchmaking queue server.
//!
//! Clients connect over TCP, identify themselves with a 36-byte `OPEN` frame
//! and are admitted into a FIFO wait queue owned by a single matchmaking actor.
//! Queue positions, match formation and game end are pushed back to each
//! client through its own bounded notification sink.

pub mod config;
pub mod server;
