//! Command-line flags of `modem_cli`.

use clap::{ArgGroup, Parser};

/// Queries modems through the `modemd` control socket.
#[derive(Parser, Debug, Clone, PartialEq, Eq)]
#[command(
    name = "modem_cli",
    version,
    after_help = "Examples:\n  \
        modem_cli -d -c ATI                              show AT information\n  \
        modem_cli -d -c 'AT+CGDCONT=1,\"IP\",\"apn.com\"'   set the APN\n  \
        modem_cli -p 1-1 -c 'AT+CPIN=\"1111\"'             enter the PIN",
    group(ArgGroup::new("target").required(true).args(["detect", "port"]))
)]
pub(crate) struct Cli {
    /// Walks every recognised modem attached to the host.
    #[arg(short = 'd', long)]
    pub(crate) detect: bool,
    /// USB port of the modem, for example `1-1`.
    #[arg(short = 'p', long, value_name = "PORT")]
    pub(crate) port: Option<String>,
    /// Sends a raw AT command and prints the answer.
    #[arg(short = 'c', long, value_name = "COMMAND", conflicts_with = "test")]
    pub(crate) command: Option<String>,
    /// Runs the standard sequence of queries on each modem.
    #[arg(short = 't', long)]
    pub(crate) test: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn parse(args: &[&str]) -> Result<Cli, clap::Error> {
        Cli::try_parse_from(std::iter::once("modem_cli").chain(args.iter().copied()))
    }

    #[rstest]
    #[case(&["-d"])]
    #[case(&["-p", "1-1", "-t"])]
    #[case(&["--detect", "--command", "ATI"])]
    fn accepted_combinations(#[case] args: &[&str]) {
        assert!(parse(args).is_ok(), "rejected {args:?}");
    }

    #[rstest]
    #[case::no_target(&["-t"])]
    #[case::both_targets(&["-d", "-p", "1-1"])]
    #[case::test_with_command(&["-p", "1-1", "-t", "-c", "ATI"])]
    fn rejected_combinations(#[case] args: &[&str]) {
        assert!(parse(args).is_err(), "accepted {args:?}");
    }

    #[test]
    fn port_is_captured() {
        let cli = parse(&["--port", "2-1", "-c", "AT+CSQ"]).expect("valid flags");
        assert_eq!(cli.port.as_deref(), Some("2-1"));
        assert_eq!(cli.command.as_deref(), Some("AT+CSQ"));
        assert!(!cli.detect);
    }
}
