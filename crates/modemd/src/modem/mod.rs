//! Opened modems.
//!
//! A [`ModemHandle`] dispatches abstract operations through its resolved
//! profile, keeps the sticky last-error code, and owns the background scan
//! and registration watch threads.

mod context;
mod errors;
mod handle;

pub use context::ModemContext;
pub use errors::{ModemError, codes};
pub use handle::ModemHandle;

pub(crate) const MODEM_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::modem");
