/// Matchmaking configuration constants.
///
/// This module defines defaults for the matchmaking engine, such as the
/// number of clients per game and the per-client notification buffer.

/// Number of queued clients popped into one game (FIFO).
pub const PLAYERS_PER_GAME: usize = 2;

/// Capacity of each client's notification sink. Notifications beyond it are dropped.
pub const SINK_CAPACITY: usize = 64;

/// Interval (in seconds) between two state reports in the debug log.
pub const STATE_REPORT_INTERVAL_SECS: u64 = 30;
