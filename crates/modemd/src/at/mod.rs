//! AT command transaction engine.
//!
//! An [`AtQueue`] owns one writer and one reader thread bound to an
//! [`AtChannel`]. Submissions are served in arrival order with at most one
//! query in flight; the reader matches each query's pattern against the
//! accumulated input and hands back owned capture groups.

mod channel;
mod errors;
mod query;
mod queue;
#[cfg(test)]
pub(crate) mod test_support;

pub use channel::{AtChannel, ChannelOpener, SerialChannel, SerialOpener};
pub use errors::AtError;
pub use query::{AtQuery, AtResponse};
pub use queue::{AtQueue, QueueOptions};

pub(crate) const AT_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::at");
