//! Per-connection request dispatch.
//!
//! A [`ClientSession`] reads QUERY frames, looks the function up in the
//! dispatch table, gates privileged calls while the modem is locked, and
//! writes one RESPONSE per request. Any failure is answered with an empty
//! payload under the request's own name; only a broken stream ends the
//! session.

mod handlers;
mod table;

use std::io::{Read, Write};
use std::os::unix::net::UnixStream;
use std::sync::Arc;

use modem_rpc::{Frame, FrameType, Function, read_frame, write_frame};
use tracing::{debug, warn};

use crate::discovery::FindCursor;
use crate::modem::{ModemError, ModemHandle};
use crate::registry::ModemRegistry;
use crate::transport::ConnectionHandler;

pub(crate) const SESSION_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::session");

/// State owned by one client connection.
#[derive(Debug)]
pub struct ClientSession {
    registry: Arc<ModemRegistry>,
    modem: Option<ModemHandle>,
    cursor: Option<FindCursor>,
}

impl ClientSession {
    /// Starts a session with nothing attached.
    #[must_use]
    pub fn new(registry: Arc<ModemRegistry>) -> Self {
        Self {
            registry,
            modem: None,
            cursor: None,
        }
    }

    /// Opened modem, if any.
    #[must_use]
    pub fn modem(&self) -> Option<&ModemHandle> {
        self.modem.as_ref()
    }

    /// Serves requests until the peer disconnects or the stream breaks.
    pub fn serve<S: Read + Write>(&mut self, stream: &mut S) {
        loop {
            let frame = match read_frame(stream) {
                Ok(Some(frame)) => frame,
                Ok(None) => {
                    debug!(target: SESSION_TARGET, "client disconnected");
                    break;
                }
                Err(error) => {
                    warn!(target: SESSION_TARGET, error = %error, "failed to read request");
                    break;
                }
            };
            if frame.kind() != FrameType::Query {
                debug!(
                    target: SESSION_TARGET,
                    function = %String::from_utf8_lossy(frame.name()),
                    "ignoring non-query frame"
                );
                continue;
            }

            debug!(
                target: SESSION_TARGET,
                function = %String::from_utf8_lossy(frame.name()),
                payload_len = frame.payload().len(),
                "request"
            );
            let reply = self.dispatch(&frame);
            debug!(
                target: SESSION_TARGET,
                function = %String::from_utf8_lossy(reply.name()),
                payload_len = reply.payload().len(),
                "response"
            );
            if let Err(error) = write_frame(stream, &reply) {
                warn!(target: SESSION_TARGET, error = %error, "failed to write response");
                break;
            }
        }
        self.close();
    }

    /// Answers one QUERY frame.
    pub fn dispatch(&mut self, frame: &Frame) -> Frame {
        let Some(function) = Function::from_name(frame.name()) else {
            debug!(
                target: SESSION_TARGET,
                function = %String::from_utf8_lossy(frame.name()),
                "unknown function"
            );
            return frame.failure();
        };
        let Some(entry) = table::lookup(function) else {
            return frame.failure();
        };
        if function.requires_modem() {
            let Some(modem) = &self.modem else {
                debug!(target: SESSION_TARGET, %function, "no modem opened");
                return frame.failure();
            };
            if entry.privileged && modem.is_locked() {
                modem.record_failure(ModemError::Busy);
                return frame.failure();
            }
        }
        match (entry.handler)(self, frame.payload()) {
            Some(payload) => frame.reply(payload),
            None => frame.failure(),
        }
    }

    fn close(&mut self) {
        self.cursor = None;
        if let Some(modem) = self.modem.take() {
            debug!(target: SESSION_TARGET, port = modem.port(), "releasing modem");
        }
    }
}

/// Connection handler running one [`ClientSession`] per connection.
#[derive(Debug)]
pub struct SessionHandler {
    registry: Arc<ModemRegistry>,
}

impl SessionHandler {
    /// Serves sessions against `registry`.
    #[must_use]
    pub fn new(registry: Arc<ModemRegistry>) -> Self {
        Self { registry }
    }
}

impl ConnectionHandler for SessionHandler {
    fn handle(&self, mut stream: UnixStream) {
        ClientSession::new(Arc::clone(&self.registry)).serve(&mut stream);
    }
}
