/// Main configuration module.
///
/// Re-exports submodules for matchmaking and network configuration, and the
/// command-line arguments resolved into runtime [`Settings`].
pub mod args;
pub mod matchmaking;
pub mod network;

pub use args::{Args, Settings};
