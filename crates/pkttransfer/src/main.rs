mod cmd;
mod exit;
mod logging;
mod output;

use clap::Parser;

use crate::cmd::Command;
use crate::logging::{init_logging, LogFormat, LogLevel};
use crate::output::OutputFormat;

#[derive(Parser, Debug)]
#[command(name = "pkttransfer", version, about = "Framed packet transfer CLI")]
struct Cli {
    /// Output format.
    #[arg(long, value_name = "FORMAT", global = true)]
    format: Option<OutputFormat>,

    /// Log output format (stderr).
    #[arg(
        long,
        value_name = "FORMAT",
        env = "PKTTRANSFER_LOG_FORMAT",
        default_value = "text",
        global = true
    )]
    log_format: LogFormat,

    /// Minimum log level (stderr). `debug` logs every frame.
    #[arg(
        long,
        value_name = "LEVEL",
        env = "PKTTRANSFER_LOG_LEVEL",
        default_value = "warn",
        global = true
    )]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Command,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.log_format, cli.log_level);

    let format = cli.format.unwrap_or_else(OutputFormat::default_for_stdout);
    let result = cmd::run(cli.command, format);

    match result {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(err.code);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_encode_subcommand() {
        let cli = Cli::try_parse_from(["pkttransfer", "encode", "--hex", "00"])
            .expect("encode args should parse");
        assert!(matches!(cli.command, Command::Encode(_)));
    }

    #[test]
    fn rejects_conflicting_payload_args() {
        let err = Cli::try_parse_from([
            "pkttransfer",
            "crc",
            "--data",
            "hello",
            "--hex",
            "00",
        ])
        .expect_err("conflicting args should fail");

        assert_eq!(err.kind(), clap::error::ErrorKind::ArgumentConflict);
    }

    #[test]
    fn log_level_defaults_to_warn() {
        let cli = Cli::try_parse_from(["pkttransfer", "crc", "--data", "x"])
            .expect("crc args should parse");
        assert_eq!(cli.log_level, LogLevel::Warn);
        assert_eq!(cli.log_format, LogFormat::Text);

        let cli = Cli::try_parse_from(["pkttransfer", "crc", "--data", "x", "--log-level", "debug"])
            .expect("explicit level should parse");
        assert_eq!(cli.log_level, LogLevel::Debug);
    }

    #[test]
    fn requires_a_payload_source() {
        let err = Cli::try_parse_from(["pkttransfer", "crc"]).expect_err("payload is required");
        assert_eq!(err.kind(), clap::error::ErrorKind::MissingRequiredArgument);
    }

    #[test]
    fn global_flags_follow_the_subcommand() {
        let cli = Cli::try_parse_from([
            "pkttransfer",
            "loopback",
            "--link",
            "bus",
            "--format",
            "json",
            "--tx-id",
            "0x7E1",
        ])
        .expect("loopback args should parse");
        assert!(matches!(cli.format, Some(OutputFormat::Json)));
        match cli.command {
            Command::Loopback(args) => assert_eq!(args.tx_id, 0x7E1),
            other => panic!("unexpected command {other:?}"),
        }
    }
}
