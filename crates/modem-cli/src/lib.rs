//! Command-line client for `modemd`.
//!
//! The crate owns argument parsing, configuration loading, the typed RPC
//! client, and rendering of modem reports. [`run`] is driven both by the
//! binary and by tests that substitute the IO streams.

use std::ffi::OsString;
use std::io::{Read, Write};
use std::process::ExitCode;

use clap::Parser;
use clap::error::ErrorKind;
use modem_config::Config;

mod cli;
mod client;
mod config;
mod errors;
mod report;
mod transport;

use cli::Cli;
pub use client::ModemClient;
use config::split_config_arguments;
pub(crate) use config::{ConfigLoader, OrthoConfigLoader};
pub(crate) use errors::AppError;
pub use errors::ClientError;
use report::Banner;
use transport::connect;

#[cfg(test)]
mod tests;

struct CliRunner<'a, W: Write, E: Write, L: ConfigLoader> {
    stdout: &'a mut W,
    stderr: &'a mut E,
    loader: &'a L,
}

impl<'a, W, E, L> CliRunner<'a, W, E, L>
where
    W: Write,
    E: Write,
    L: ConfigLoader,
{
    fn new(stdout: &'a mut W, stderr: &'a mut E, loader: &'a L) -> Self {
        Self {
            stdout,
            stderr,
            loader,
        }
    }

    fn run<I>(&mut self, args: I) -> ExitCode
    where
        I: IntoIterator<Item = OsString>,
    {
        let args: Vec<OsString> = args.into_iter().collect();
        let split = split_config_arguments(&args);
        let basename = args
            .first()
            .map(|program| program.to_string_lossy().into_owned())
            .unwrap_or_default();

        let result = Cli::try_parse_from(&split.cli_arguments)
            .map_err(AppError::CliUsage)
            .and_then(|cli| {
                self.loader
                    .load(&split.config_arguments)
                    .map(|config| (cli, config))
            })
            .and_then(|(cli, config)| self.execute(&basename, &cli, &config));

        match result {
            Ok(()) => ExitCode::SUCCESS,
            Err(AppError::CliUsage(error))
                if matches!(error.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) =>
            {
                drop(write!(self.stdout, "{}", error.render()));
                ExitCode::SUCCESS
            }
            Err(error) => {
                drop(writeln!(self.stderr, "{error}"));
                ExitCode::FAILURE
            }
        }
    }

    fn execute(&mut self, basename: &str, cli: &Cli, config: &Config) -> Result<(), AppError> {
        let endpoint = config.daemon_socket();
        report::write_banner(
            self.stdout,
            &Banner {
                basename,
                socket: endpoint.path().as_str(),
                port: cli.port.as_deref().unwrap_or_default(),
                command: cli.command.as_deref().unwrap_or_default(),
                detect: cli.detect,
                test: cli.test,
            },
        )?;

        let mut client = ModemClient::new(connect(endpoint)?);
        if cli.detect {
            detect(&mut client, self.stdout, cli)?;
        } else if let Some(port) = &cli.port {
            inspect(&mut client, self.stdout, cli, port, true)?;
        }
        self.stdout.flush()?;
        Ok(())
    }
}

/// Runs the requested actions against one modem.
fn inspect<S, W>(
    client: &mut ModemClient<S>,
    out: &mut W,
    cli: &Cli,
    port: &str,
    announce: bool,
) -> Result<(), AppError>
where
    S: Read + Write,
    W: Write,
{
    if cli.test {
        report::write_test(client, out, port, announce)?;
    }
    if let Some(command) = &cli.command {
        report::write_answer(client, out, port, command)?;
    }
    Ok(())
}

/// Walks every recognised modem, listing each one before acting on it.
fn detect<S, W>(client: &mut ModemClient<S>, out: &mut W, cli: &Cli) -> Result<(), AppError>
where
    S: Read + Write,
    W: Write,
{
    let mut next = client.find_first()?;
    while let Some(device) = next {
        report::write_device(out, &device)?;
        inspect(client, out, cli, &device.port, false)?;
        next = client.find_next()?;
    }
    client.find_close()?;
    Ok(())
}

/// Runs the CLI using the provided arguments and IO handles.
#[must_use]
pub fn run<I, W, E>(args: I, stdout: &mut W, stderr: &mut E) -> ExitCode
where
    I: IntoIterator<Item = OsString>,
    W: Write,
    E: Write,
{
    run_with_loader(args, stdout, stderr, &OrthoConfigLoader)
}

/// Runs the CLI with a custom configuration loader.
#[must_use]
pub(crate) fn run_with_loader<I, W, E, L>(
    args: I,
    stdout: &mut W,
    stderr: &mut E,
    loader: &L,
) -> ExitCode
where
    I: IntoIterator<Item = OsString>,
    W: Write,
    E: Write,
    L: ConfigLoader,
{
    CliRunner::new(stdout, stderr, loader).run(args)
}
