//! Test suites for the daemon lifecycle and client sessions.

mod behaviour;
mod support;
mod unit;
