//! Control socket connection.

use std::io;
use std::os::unix::net::UnixStream;
use std::time::Duration;

use modem_config::SocketEndpoint;
use socket2::{Domain, SockAddr, Socket, Type};

use crate::AppError;

pub(crate) const CONNECTION_TIMEOUT: Duration = Duration::from_secs(5);

/// Deadline for a single reply; operator scans take the longest.
pub(crate) const REPLY_TIMEOUT: Duration = Duration::from_secs(300);

pub(crate) fn connect(endpoint: &SocketEndpoint) -> Result<UnixStream, AppError> {
    connect_unix(endpoint).map_err(|source| AppError::Connect {
        endpoint: endpoint.to_string(),
        source,
    })
}

fn connect_unix(endpoint: &SocketEndpoint) -> io::Result<UnixStream> {
    let socket = Socket::new(Domain::UNIX, Type::STREAM, None)?;
    let address = SockAddr::unix(endpoint.path().as_std_path())?;
    socket.connect_timeout(&address, CONNECTION_TIMEOUT)?;
    let stream: UnixStream = socket.into();
    stream.set_read_timeout(Some(REPLY_TIMEOUT))?;
    Ok(stream)
}
