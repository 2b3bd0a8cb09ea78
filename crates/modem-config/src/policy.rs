use std::time::Duration;

/// How often, and how patiently, an absent port is woken before giving up.
///
/// A port whose AT interface node cannot be found is asked to power up and
/// re-checked after `delay`, at most `attempts` times.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WakeupPolicy {
    /// Maximum number of wake-up attempts.
    pub attempts: u32,
    /// Pause after each wake-up request.
    pub delay: Duration,
}

impl WakeupPolicy {
    /// Builds a policy from its parts.
    #[must_use]
    pub const fn new(attempts: u32, delay: Duration) -> Self {
        Self { attempts, delay }
    }

    /// Policy that never waits; used when the caller wants a single probe.
    #[must_use]
    pub const fn immediate() -> Self {
        Self::new(0, Duration::ZERO)
    }
}

/// Deadlines applied to AT transactions and background modem work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AtTimeouts {
    /// Deadline for ordinary queries.
    pub query: Duration,
    /// Deadline for raw pass-through commands and USSD.
    pub command: Duration,
    /// Deadline for a full operator scan.
    pub operator_scan: Duration,
    /// Interval between registration polls.
    pub registration_poll: Duration,
}

impl Default for AtTimeouts {
    fn default() -> Self {
        Self {
            query: Duration::from_millis(crate::DEFAULT_AT_TIMEOUT_MS),
            command: Duration::from_millis(crate::DEFAULT_AT_COMMAND_TIMEOUT_MS),
            operator_scan: Duration::from_millis(crate::DEFAULT_OPERATOR_SCAN_TIMEOUT_MS),
            registration_poll: Duration::from_millis(crate::DEFAULT_REGISTRATION_POLL_MS),
        }
    }
}
