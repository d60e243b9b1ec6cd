use std::fs;
use std::path::PathBuf;

use clap::{Args, Subcommand, ValueEnum};
use pkttransfer_frame::DEFAULT_MAX_PAYLOAD;

use crate::exit::{io_error, CliError, CliResult, USAGE};
use crate::output::OutputFormat;

pub mod crc;
pub mod decode;
pub mod doctor;
pub mod encode;
pub mod loopback;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Compute the CRC-16/X-25 of a payload.
    Crc(CrcArgs),
    /// Print the stuffed wire frame for a payload.
    Encode(EncodeArgs),
    /// Decode a wire byte stream and print every valid payload.
    Decode(DecodeArgs),
    /// Send payloads between two transfer instances over an in-memory link.
    Loopback(LoopbackArgs),
    /// Run the built-in self-test checks.
    Doctor(DoctorArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Crc(args) => crc::run(args, format),
        Command::Encode(args) => encode::run(args, format),
        Command::Decode(args) => decode::run(args, format),
        Command::Loopback(args) => loopback::run(args, format),
        Command::Doctor(args) => doctor::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

/// Exactly one payload source.
#[derive(Args, Debug)]
#[group(required = true, multiple = false)]
pub struct PayloadArgs {
    /// Payload as a UTF-8 string.
    #[arg(long)]
    pub data: Option<String>,
    /// Payload as hex digits (spaces, commas and 0x prefixes allowed).
    #[arg(long)]
    pub hex: Option<String>,
    /// Read the payload from a file.
    #[arg(long, value_name = "PATH")]
    pub file: Option<PathBuf>,
}

impl PayloadArgs {
    pub fn resolve(&self) -> CliResult<Vec<u8>> {
        if let Some(data) = &self.data {
            return Ok(data.as_bytes().to_vec());
        }
        if let Some(hex) = &self.hex {
            return parse_hex(hex);
        }
        if let Some(path) = &self.file {
            return fs::read(path)
                .map_err(|err| io_error(&format!("failed reading {}", path.display()), err));
        }
        Err(CliError::new(USAGE, "one of --data, --hex or --file is required"))
    }
}

#[derive(Args, Debug)]
pub struct CrcArgs {
    #[command(flatten)]
    pub payload: PayloadArgs,
}

#[derive(Args, Debug)]
pub struct EncodeArgs {
    #[command(flatten)]
    pub payload: PayloadArgs,
    /// Reject payloads longer than this.
    #[arg(long, default_value_t = DEFAULT_MAX_PAYLOAD)]
    pub max_payload: usize,
}

#[derive(Args, Debug)]
pub struct DecodeArgs {
    /// Wire bytes as hex digits. Reads stdin when neither --hex nor --file is given.
    #[arg(long, conflicts_with = "file")]
    pub hex: Option<String>,
    /// Read wire bytes from a file.
    #[arg(long, value_name = "PATH")]
    pub file: Option<PathBuf>,
    /// Frames whose payload exceeds this are dropped as overflow.
    #[arg(long, default_value_t = DEFAULT_MAX_PAYLOAD)]
    pub max_payload: usize,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
pub enum LinkArg {
    /// Byte-stream link, one byte per task call.
    Serial,
    /// Chunked bus link, up to eight bytes per task call.
    Bus,
}

#[derive(Args, Debug)]
pub struct LoopbackArgs {
    /// Payloads to send (UTF-8). Defaults to a single "hello".
    pub payloads: Vec<String>,
    /// Additional payload given as hex digits; may be repeated.
    #[arg(long)]
    pub hex: Vec<String>,
    /// Link kind to simulate.
    #[arg(long, value_enum, default_value = "serial")]
    pub link: LinkArg,
    /// Send the payload list this many times.
    #[arg(long, default_value_t = 1)]
    pub repeat: usize,
    /// Maximum payload size of both instances.
    #[arg(long, default_value_t = 64)]
    pub max_payload: usize,
    /// Identifier used from sender to receiver on the bus link.
    #[arg(long, default_value = "0x101", value_parser = parse_u32)]
    pub tx_id: u32,
    /// Identifier used from receiver to sender on the bus link.
    #[arg(long, default_value = "0x102", value_parser = parse_u32)]
    pub rx_id: u32,
    /// Give up on a frame after this many task calls.
    #[arg(long, default_value_t = 10_000)]
    pub max_steps: usize,
}

#[derive(Args, Debug, Default)]
pub struct DoctorArgs {}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

/// Parse hex digits, ignoring whitespace, commas and `0x` prefixes.
pub fn parse_hex(input: &str) -> CliResult<Vec<u8>> {
    let digits: String = input
        .split(|c: char| c.is_whitespace() || c == ',')
        .map(|token| {
            token
                .strip_prefix("0x")
                .or_else(|| token.strip_prefix("0X"))
                .unwrap_or(token)
        })
        .collect();

    hex::decode(&digits)
        .map_err(|err| CliError::new(USAGE, format!("invalid hex input {input:?}: {err}")))
}

/// Parse a decimal or `0x`-prefixed hexadecimal identifier.
pub fn parse_u32(input: &str) -> Result<u32, String> {
    let parsed = match input
        .strip_prefix("0x")
        .or_else(|| input.strip_prefix("0X"))
    {
        Some(hex) => u32::from_str_radix(hex, 16),
        None => input.parse(),
    };
    parsed.map_err(|err| format!("invalid identifier {input:?}: {err}"))
}
