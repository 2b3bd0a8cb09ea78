//! Shared fixtures for CLI tests.

mod fake_daemon;

pub(super) use fake_daemon::{FakeDaemon, Request, Script};

use std::path::Path;

use modem_config::{Config, SocketEndpoint};

use crate::{AppError, ConfigLoader};

/// Loader that points the CLI at a fixed socket path.
pub(super) struct SocketLoader {
    socket: String,
}

impl SocketLoader {
    pub(super) fn new(socket: &Path) -> Self {
        Self {
            socket: socket.to_string_lossy().into_owned(),
        }
    }

    pub(super) fn socket(&self) -> &str {
        &self.socket
    }
}

impl ConfigLoader for SocketLoader {
    fn load(&self, _args: &[std::ffi::OsString]) -> Result<Config, AppError> {
        Ok(Config {
            daemon_socket: SocketEndpoint::unix(self.socket.clone()),
            ..Config::default()
        })
    }
}

/// Splits a shell-like command line into CLI arguments.
pub(super) fn arguments(command: &str) -> Vec<std::ffi::OsString> {
    std::iter::once("modem_cli")
        .chain(command.split_whitespace())
        .map(std::ffi::OsString::from)
        .collect()
}
