//! Connection handling abstraction for the control socket.

use std::os::unix::net::UnixStream;

/// Handles accepted socket connections.
pub trait ConnectionHandler: Send + Sync + 'static {
    /// Serves one connection until the peer goes away. Implementations should
    /// avoid panicking.
    fn handle(&self, stream: UnixStream);
}
