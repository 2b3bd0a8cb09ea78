//! Diagnostic client for `modemd`.
//!
//! Delegates to [`modem_cli::run`], which resolves configuration, parses the
//! remaining flags, and talks to the daemon over its control socket.

use std::io::{self, StderrLock, StdoutLock};
use std::process::ExitCode;

fn main() -> ExitCode {
    let mut stdout: StdoutLock<'_> = io::stdout().lock();
    let mut stderr: StderrLock<'_> = io::stderr().lock();
    modem_cli::run(std::env::args_os(), &mut stdout, &mut stderr)
}
