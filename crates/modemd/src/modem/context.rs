use std::sync::Arc;
use std::time::Duration;

use modem_config::AtTimeouts;

use crate::at::{AtQuery, AtQueue, AtResponse};
use crate::qmi::QmiSession;

use super::ModemError;

/// Channels an operation implementation may drive.
///
/// Cheap to clone so background work can own a copy.
#[derive(Debug, Clone)]
pub struct ModemContext {
    at: Option<Arc<AtQueue>>,
    qmi: Option<Arc<QmiSession>>,
    timeouts: AtTimeouts,
}

impl ModemContext {
    /// Bundles the bound channels.
    #[must_use]
    pub fn new(
        at: Option<Arc<AtQueue>>,
        qmi: Option<Arc<QmiSession>>,
        timeouts: AtTimeouts,
    ) -> Self {
        Self { at, qmi, timeouts }
    }

    /// AT queue of the modem.
    pub fn at(&self) -> Result<&AtQueue, ModemError> {
        self.at
            .as_deref()
            .ok_or(ModemError::NotSupported { operation: "at" })
    }

    /// Shared handle to the AT queue, if one is bound.
    #[must_use]
    pub fn at_queue(&self) -> Option<&Arc<AtQueue>> {
        self.at.as_ref()
    }

    /// QMI session of the modem.
    pub fn qmi(&self) -> Result<&QmiSession, ModemError> {
        self.qmi
            .as_deref()
            .ok_or(ModemError::NotSupported { operation: "qmi" })
    }

    /// QMI session, if the device exposed one.
    #[must_use]
    pub fn qmi_session(&self) -> Option<&QmiSession> {
        self.qmi.as_deref()
    }

    /// Configured deadlines.
    #[must_use]
    pub fn timeouts(&self) -> &AtTimeouts {
        &self.timeouts
    }

    /// Runs `command` with the default query deadline.
    pub fn query(&self, command: &str, pattern: &str) -> Result<AtResponse, ModemError> {
        self.query_within(command, pattern, self.timeouts.query)
    }

    /// Runs `command` with an explicit deadline.
    pub fn query_within(
        &self,
        command: &str,
        pattern: &str,
        timeout: Duration,
    ) -> Result<AtResponse, ModemError> {
        let query = AtQuery::new(command, pattern, timeout)?;
        Ok(self.at()?.submit(&query)?)
    }
}
