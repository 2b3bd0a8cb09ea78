//! QMI control surface.
//!
//! The daemon does not link a vendor SDK. A [`QmiTransport`] implementation
//! is injected at startup; [`QmiSession`] binds one device through it and
//! tracks the packet data session state reported by the SDK callback.

use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};

use modem_rpc::{WwanProfile, WwanState};
use thiserror::Error;
use tracing::{debug, warn};

const QMI_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::qmi");

/// Callback receiving raw SDK session state codes.
pub type SessionStateCallback = Box<dyn Fn(u32) + Send + Sync>;

/// Device reported by the SDK enumeration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QmiDevice {
    /// Device node, for example `/dev/qcqmi0`.
    pub node: String,
    /// SDK key identifying the device.
    pub key: String,
}

/// Errors reported by a QMI transport.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QmiError {
    /// The SDK returned a non-zero status.
    #[error("QMI {operation} failed with status {code}")]
    Sdk {
        /// SDK call that failed.
        operation: &'static str,
        /// SDK status code.
        code: u32,
    },
    /// No enumerated device matched the node.
    #[error("no QMI device at {node}")]
    DeviceNotFound {
        /// Requested device node.
        node: String,
    },
}

/// Operations a vendor SDK binding must provide.
#[cfg_attr(test, mockall::automock)]
pub trait QmiTransport: Send + Sync {
    /// Lists the devices the SDK can drive.
    fn enumerate(&self) -> Result<Vec<QmiDevice>, QmiError>;
    /// Connects to the device identified by `node` and `key`.
    fn connect(&self, node: &str, key: &str) -> Result<(), QmiError>;
    /// Drops the current connection.
    fn disconnect(&self) -> Result<(), QmiError>;
    /// Installs or clears the session state callback.
    fn set_session_state_callback(&self, callback: Option<SessionStateCallback>);
    /// Reads the IMEI.
    fn imei(&self) -> Result<String, QmiError>;
    /// Reads the IMSI.
    fn imsi(&self) -> Result<String, QmiError>;
    /// Reads the network time as Unix seconds.
    fn network_time(&self) -> Result<i64, QmiError>;
    /// Stores the packet data profile.
    fn set_data_profile(&self, profile: &WwanProfile) -> Result<(), QmiError>;
    /// Starts the packet data session.
    fn start_data_session(&self) -> Result<(), QmiError>;
    /// Stops the packet data session.
    fn stop_data_session(&self) -> Result<(), QmiError>;
}

/// Packet data session state as reported by the SDK.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No session.
    Disconnected,
    /// Session up.
    Connected,
    /// Session suspended by the network.
    Suspended,
    /// Session negotiating credentials.
    Authenticating,
    /// Code the SDK documents nowhere.
    Unknown(u32),
}

impl SessionState {
    /// Maps a raw SDK code.
    #[must_use]
    pub const fn from_raw(code: u32) -> Self {
        match code {
            1 => Self::Disconnected,
            2 => Self::Connected,
            3 => Self::Suspended,
            4 => Self::Authenticating,
            other => Self::Unknown(other),
        }
    }
}

impl From<SessionState> for WwanState {
    fn from(state: SessionState) -> Self {
        match state {
            SessionState::Connected => Self::Connected,
            SessionState::Authenticating => Self::Connecting,
            SessionState::Disconnected | SessionState::Suspended | SessionState::Unknown(_) => {
                Self::Disconnected
            }
        }
    }
}

fn load_state(raw: u8) -> WwanState {
    match raw {
        1 => WwanState::Connecting,
        2 => WwanState::Connected,
        _ => WwanState::Disconnected,
    }
}

/// Connected QMI device; disconnects when dropped.
pub struct QmiSession {
    transport: Arc<dyn QmiTransport>,
    node: String,
    state: Arc<AtomicU8>,
}

impl std::fmt::Debug for QmiSession {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("QmiSession")
            .field("node", &self.node)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

impl QmiSession {
    /// Finds `node` among the SDK's devices and connects to it.
    pub fn open(transport: Arc<dyn QmiTransport>, node: &str) -> Result<Self, QmiError> {
        let device = transport
            .enumerate()?
            .into_iter()
            .find(|device| device.node == node)
            .ok_or_else(|| QmiError::DeviceNotFound {
                node: node.to_owned(),
            })?;
        transport.connect(&device.node, &device.key)?;

        let state = Arc::new(AtomicU8::new(WwanState::Disconnected as u8));
        let observed = Arc::clone(&state);
        transport.set_session_state_callback(Some(Box::new(move |code| {
            let wwan = WwanState::from(SessionState::from_raw(code));
            observed.store(wwan as u8, Ordering::SeqCst);
        })));
        debug!(target: QMI_TARGET, node, key = %device.key, "QMI session connected");

        Ok(Self {
            transport,
            node: node.to_owned(),
            state,
        })
    }

    /// Latest packet data session state.
    #[must_use]
    pub fn state(&self) -> WwanState {
        load_state(self.state.load(Ordering::SeqCst))
    }

    /// Reads the IMEI.
    pub fn imei(&self) -> Result<String, QmiError> {
        self.transport.imei()
    }

    /// Reads the IMSI.
    pub fn imsi(&self) -> Result<String, QmiError> {
        self.transport.imsi()
    }

    /// Reads the network time.
    pub fn network_time(&self) -> Result<i64, QmiError> {
        self.transport.network_time()
    }

    /// Stores the packet data profile.
    pub fn set_data_profile(&self, profile: &WwanProfile) -> Result<(), QmiError> {
        self.transport.set_data_profile(profile)
    }

    /// Starts the packet data session.
    pub fn start_data_session(&self) -> Result<(), QmiError> {
        self.transport.start_data_session()
    }

    /// Stops the packet data session.
    pub fn stop_data_session(&self) -> Result<(), QmiError> {
        self.transport.stop_data_session()
    }
}

impl Drop for QmiSession {
    fn drop(&mut self) {
        self.transport.set_session_state_callback(None);
        if let Err(error) = self.transport.disconnect() {
            warn!(target: QMI_TARGET, node = %self.node, error = %error, "QMI disconnect failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::sync::Mutex;

    fn devices() -> Vec<QmiDevice> {
        vec![
            QmiDevice {
                node: String::from("/dev/qcqmi0"),
                key: String::from("KEY0"),
            },
            QmiDevice {
                node: String::from("/dev/qcqmi1"),
                key: String::from("KEY1"),
            },
        ]
    }

    #[rstest]
    #[case(1, SessionState::Disconnected, WwanState::Disconnected)]
    #[case(2, SessionState::Connected, WwanState::Connected)]
    #[case(3, SessionState::Suspended, WwanState::Disconnected)]
    #[case(4, SessionState::Authenticating, WwanState::Connecting)]
    #[case(9, SessionState::Unknown(9), WwanState::Disconnected)]
    fn raw_codes_map_to_wwan_state(
        #[case] code: u32,
        #[case] state: SessionState,
        #[case] wwan: WwanState,
    ) {
        assert_eq!(SessionState::from_raw(code), state);
        assert_eq!(WwanState::from(state), wwan);
    }

    #[test]
    fn open_connects_with_matching_key_and_tracks_state() {
        let callback: Arc<Mutex<Option<SessionStateCallback>>> = Arc::new(Mutex::new(None));
        let stored = Arc::clone(&callback);

        let mut transport = MockQmiTransport::new();
        transport.expect_enumerate().returning(|| Ok(devices()));
        transport
            .expect_connect()
            .withf(|node: &str, key: &str| node == "/dev/qcqmi1" && key == "KEY1")
            .times(1)
            .returning(|_, _| Ok(()));
        transport
            .expect_set_session_state_callback()
            .returning(move |installed| {
                if let Some(installed) = installed {
                    *stored.lock().expect("callback lock") = Some(installed);
                }
            });
        transport.expect_disconnect().times(1).returning(|| Ok(()));
        transport
            .expect_imei()
            .returning(|| Ok(String::from("359072066322327")));

        let session = QmiSession::open(Arc::new(transport), "/dev/qcqmi1").expect("open session");
        assert_eq!(session.state(), WwanState::Disconnected);
        assert_eq!(session.imei().expect("imei"), "359072066322327");

        if let Some(notify) = callback.lock().expect("callback lock").as_ref() {
            notify(4);
        }
        assert_eq!(session.state(), WwanState::Connecting);
        if let Some(notify) = callback.lock().expect("callback lock").as_ref() {
            notify(2);
        }
        assert_eq!(session.state(), WwanState::Connected);
    }

    #[test]
    fn unknown_node_is_not_connected() {
        let mut transport = MockQmiTransport::new();
        transport.expect_enumerate().returning(|| Ok(devices()));
        transport.expect_connect().never();

        let error = QmiSession::open(Arc::new(transport), "/dev/qcqmi7").expect_err("no device");
        assert_eq!(
            error,
            QmiError::DeviceNotFound {
                node: String::from("/dev/qcqmi7")
            }
        );
    }

    #[test]
    fn connect_failure_is_reported() {
        let mut transport = MockQmiTransport::new();
        transport.expect_enumerate().returning(|| Ok(devices()));
        transport.expect_connect().returning(|_, _| {
            Err(QmiError::Sdk {
                operation: "connect",
                code: 1010,
            })
        });

        let error = QmiSession::open(Arc::new(transport), "/dev/qcqmi0").expect_err("refused");
        assert!(matches!(error, QmiError::Sdk { code: 1010, .. }));
    }
}
