//! Main entry point for the queue server.
//!
//! Parses the command line, starts the matchmaking engine actor and runs the
//! TCP accept loop.

use actix::Actor;
use clap::Parser;
use log::info;
use tokio::net::TcpListener;

use queue_server::config::{Args, Settings};
use queue_server::server::listener;
use queue_server::server::matchmaking::MatchmakingServer;
use queue_server::server::state::AppState;

#[actix::main]
async fn main() -> std::io::Result<()> {
    let args = Args::parse();

    // Initialize logger from environment variable (default to info level, debug with --debug).
    let default_level = if args.debug { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    let settings = Settings::from_args(&args);

    // Start the MatchmakingServer actor (owns the queue, games and client sinks).
    let matchmaking_addr = MatchmakingServer::new(&settings).start();

    let state = AppState::new(matchmaking_addr, settings);

    let listener = TcpListener::bind(&state.settings.listen).await?;
    info!("[Main] Queue server listening on {}", state.settings.listen);

    listener::serve(listener, state).await;
    Ok(())
}
