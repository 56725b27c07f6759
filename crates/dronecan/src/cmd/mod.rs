use std::path::PathBuf;

use clap::{ArgGroup, Args, Subcommand};

use crate::exit::{CliError, CliResult};
use crate::output::OutputFormat;

pub mod crc;
pub mod id;
pub mod reassemble;
pub mod segment;
pub mod signature;
pub mod tail;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Decode a 29-bit frame identifier.
    Id(IdArgs),
    /// Decode a tail byte.
    Tail(TailArgs),
    /// Compute a schema signature.
    Signature(SignatureArgs),
    /// Compute a transfer CRC.
    Crc(CrcArgs),
    /// Split one transfer into link frames.
    Segment(SegmentArgs),
    /// Reassemble transfers from a SocketCAN record capture.
    Reassemble(ReassembleArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Id(args) => id::run(args, format),
        Command::Tail(args) => tail::run(args, format),
        Command::Signature(args) => signature::run(args, format),
        Command::Crc(args) => crc::run(args, format),
        Command::Segment(args) => segment::run(args, format),
        Command::Reassemble(args) => reassemble::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug)]
pub struct IdArgs {
    /// Frame identifier (`0x…` hex or decimal).
    pub id: String,
}

#[derive(Args, Debug)]
pub struct TailArgs {
    /// Tail byte (`0x…` hex or decimal).
    pub byte: String,
}

#[derive(Args, Debug)]
#[command(group(ArgGroup::new("source").required(true).args(["text", "file"])))]
pub struct SignatureArgs {
    /// Canonical schema text.
    #[arg(long)]
    pub text: Option<String>,
    /// Read canonical schema text from a file (one trailing newline ignored).
    #[arg(long)]
    pub file: Option<PathBuf>,
    /// Signature of a nested type, in field order. Repeatable.
    #[arg(long = "nested", value_name = "HEX")]
    pub nested: Vec<String>,
}

#[derive(Args, Debug)]
pub struct CrcArgs {
    /// Schema signature (hex).
    #[arg(long, value_name = "HEX")]
    pub signature: String,
    /// Transfer payload (hex).
    #[arg(long, value_name = "HEX")]
    pub payload: String,
}

#[derive(Args, Debug)]
pub struct SegmentArgs {
    /// Frame identifier (`0x…` hex or decimal).
    #[arg(long)]
    pub id: String,
    /// Schema signature (hex). Required for payloads over seven bytes.
    #[arg(long, value_name = "HEX")]
    pub signature: Option<String>,
    /// Transfer payload (hex).
    #[arg(long, value_name = "HEX")]
    pub payload: String,
    /// Transfer id to use instead of 0.
    #[arg(long)]
    pub transfer_id: Option<String>,
    /// Write SocketCAN records to this file instead of printing frames.
    #[arg(long, short = 'o')]
    pub output: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct ReassembleArgs {
    /// SocketCAN record capture.
    #[arg(long, short = 'i')]
    pub input: PathBuf,
    /// Message type signature. Repeatable.
    #[arg(long = "message", value_name = "ID=HEX")]
    pub messages: Vec<String>,
    /// Service type signature. Repeatable.
    #[arg(long = "service", value_name = "ID=HEX")]
    pub services: Vec<String>,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

/// Parse a 64-bit signature; always hex, `0x` optional.
pub fn parse_signature(input: &str) -> CliResult<u64> {
    let trimmed = input.trim();
    let digits = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);
    u64::from_str_radix(digits, 16)
        .map_err(|_| CliError::usage(format!("invalid signature: {input}")))
}

pub fn format_signature(signature: u64) -> String {
    format!("0x{signature:016X}")
}
