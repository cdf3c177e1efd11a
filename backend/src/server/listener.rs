//! TCP accept loop.
//!
//! One task per accepted socket; a failing connection never affects the
//! others or the loop itself.

use log::{debug, info, warn};
use tokio::net::TcpListener;

use crate::server::connection::Connection;
use crate::server::state::AppState;

/// Accept connections forever.
pub async fn serve(listener: TcpListener, state: AppState) {
    if let Ok(addr) = listener.local_addr() {
        info!("[Listener] Accepting connections on {}", addr);
    }
    loop {
        let (stream, peer) = match listener.accept().await {
            Ok(accepted) => accepted,
            Err(e) => {
                warn!("[Listener] Accept failed: {}", e);
                continue;
            }
        };
        if let Err(e) = stream.set_nodelay(true) {
            warn!("[Listener] Could not set TCP_NODELAY for {}: {}", peer, e);
        }
        let connection = Connection::new(
            stream,
            peer.to_string(),
            state.intake(),
            state.settings.write_timeout,
            state.settings.sink_capacity,
        );
        tokio::spawn(async move {
            if let Err(e) = connection.run().await {
                debug!("[Listener] Connection from {} ended: {}", peer, e);
            }
        });
    }
}
