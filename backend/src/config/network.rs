/// Network configuration constants.
///
/// Defaults for the TCP listener and the per-connection write path.
pub const DEFAULT_LISTEN_ADDR: &str = "127.0.0.1:8080";

/// Deadline (in seconds) for writing one notification frame to a client.
pub const WRITE_TIMEOUT_SECS: u64 = 2;
