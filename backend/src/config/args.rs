//! Command-line argument parsing.
//!
//! Every argument falls back to the constants in [`super::matchmaking`] and
//! [`super::network`].

use clap::Parser;
use std::time::Duration;

use super::matchmaking::{PLAYERS_PER_GAME, SINK_CAPACITY, STATE_REPORT_INTERVAL_SECS};
use super::network::{DEFAULT_LISTEN_ADDR, WRITE_TIMEOUT_SECS};

/// Command-line arguments for the queue server.
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Listen address, "IP:PORT".
    #[arg(short, long, default_value = DEFAULT_LISTEN_ADDR)]
    pub listen: String,

    /// Deadline in seconds for writing one notification to a client.
    #[arg(long, default_value_t = WRITE_TIMEOUT_SECS)]
    pub write_timeout_secs: u64,

    /// Number of queued clients that form one game.
    #[arg(long, default_value_t = PLAYERS_PER_GAME)]
    pub players_per_game: usize,

    /// Per-client notification buffer size.
    #[arg(long, default_value_t = SINK_CAPACITY)]
    pub sink_capacity: usize,

    /// Enable debug logging.
    #[arg(short, long)]
    pub debug: bool,
}

impl Default for Args {
    fn default() -> Self {
        Self {
            listen: DEFAULT_LISTEN_ADDR.to_string(),
            write_timeout_secs: WRITE_TIMEOUT_SECS,
            players_per_game: PLAYERS_PER_GAME,
            sink_capacity: SINK_CAPACITY,
            debug: false,
        }
    }
}

/// Runtime settings shared by the listener, connections and the engine.
#[derive(Debug, Clone)]
pub struct Settings {
    pub listen: String,
    pub write_timeout: Duration,
    pub players_per_game: usize,
    pub sink_capacity: usize,
    pub state_report_interval: Duration,
}

impl Settings {
    pub fn from_args(args: &Args) -> Self {
        Self {
            listen: args.listen.clone(),
            write_timeout: Duration::from_secs(args.write_timeout_secs),
            // A game needs at least one member.
            players_per_game: args.players_per_game.max(1),
            sink_capacity: args.sink_capacity.max(1),
            state_report_interval: Duration::from_secs(STATE_REPORT_INTERVAL_SECS),
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self::from_args(&Args::default())
    }
}
