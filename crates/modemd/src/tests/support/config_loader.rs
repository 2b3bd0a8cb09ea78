//! Configuration loaders for scenarios covering success and failure paths.

use std::ffi::OsString;
use std::sync::Arc;

use camino::Utf8PathBuf;
use modem_config::{Config, SocketEndpoint};
use ortho_config::OrthoError;
use tempfile::TempDir;

use crate::bootstrap::ConfigLoader;

/// Loader that provisions the control socket under a temporary directory.
pub struct TestConfigLoader {
    socket_dir: TempDir,
}

impl TestConfigLoader {
    #[must_use]
    pub fn new() -> Self {
        let socket_dir = TempDir::new().expect("failed to create temporary directory for socket");
        Self { socket_dir }
    }

    /// Path the daemon will bind.
    pub fn socket_path(&self) -> Utf8PathBuf {
        let path = self.socket_dir.path().join("run").join("modemd.ctl");
        Utf8PathBuf::from_path_buf(path).expect("temporary socket path was not valid UTF-8")
    }
}

impl ConfigLoader for TestConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        Ok(Config {
            daemon_socket: SocketEndpoint::unix(self.socket_path()),
            wakeup_attempts: 0,
            wakeup_delay_ms: 0,
            at_timeout_ms: 300,
            at_command_timeout_ms: 300,
            ..Config::default()
        })
    }
}

/// Loader that intentionally fails by passing an unsupported socket scheme.
pub struct FailingConfigLoader;

impl ConfigLoader for FailingConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        let args = vec![
            OsString::from("modemd"),
            OsString::from("--daemon-socket"),
            OsString::from("tcp://127.0.0.1:9000"),
        ];
        Config::load_from_iter(args)
    }
}
