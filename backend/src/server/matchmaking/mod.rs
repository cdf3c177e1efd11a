/// Matchmaking module: client registry, FIFO wait queue, game membership and notifications.

pub mod server;
pub mod registry;
pub mod messages;
pub mod types;

pub use server::MatchmakingServer;
