use std::fmt::Write as _;
use std::io::{IsTerminal, Write};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;

use crate::exit::{CliError, CliResult};

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
    Raw,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

/// One JSON document per line.
pub fn print_json<T: Serialize>(value: &T) {
    println!(
        "{}",
        serde_json::to_string(value).unwrap_or_else(|_| "{}".to_string())
    );
}

pub fn print_table(header: &[&str], rows: Vec<Vec<String>>) {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header.to_vec());
    for row in rows {
        table.add_row(row);
    }
    println!("{table}");
}

pub fn print_raw(data: &[u8]) {
    let mut out = std::io::stdout();
    let _ = out.write_all(data);
    let _ = out.flush();
}

/// Lowercase hex, no separators.
pub fn hex(data: &[u8]) -> String {
    data.iter().fold(String::with_capacity(data.len() * 2), |mut out, byte| {
        let _ = write!(out, "{byte:02x}");
        out
    })
}

/// Parse hex bytes, tolerating an `0x` prefix and embedded whitespace.
pub fn parse_hex(input: &str) -> CliResult<Vec<u8>> {
    let digits: String = input
        .trim()
        .trim_start_matches("0x")
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();
    if !digits.is_ascii() {
        return Err(CliError::usage(format!("invalid hex: {input}")));
    }
    if digits.len() % 2 != 0 {
        return Err(CliError::usage(format!("odd number of hex digits: {input}")));
    }
    (0..digits.len())
        .step_by(2)
        .map(|i| {
            u8::from_str_radix(&digits[i..i + 2], 16)
                .map_err(|_| CliError::usage(format!("invalid hex: {input}")))
        })
        .collect()
}

/// Parse an unsigned number given as `0x…` hex or decimal.
pub fn parse_number(input: &str) -> CliResult<u64> {
    let input = input.trim();
    let parsed = match input.strip_prefix("0x").or_else(|| input.strip_prefix("0X")) {
        Some(digits) => u64::from_str_radix(digits, 16),
        None => input.parse(),
    };
    parsed.map_err(|_| CliError::usage(format!("invalid number: {input}")))
}

/// Parse a number that must fit `T`.
pub fn parse_bounded<T: TryFrom<u64>>(input: &str, what: &str) -> CliResult<T> {
    let value = parse_number(input)?;
    T::try_from(value).map_err(|_| CliError::usage(format!("{what} out of range: {input}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_round_trip() {
        assert_eq!(hex(&[0x00, 0xab, 0x10]), "00ab10");
        assert_eq!(parse_hex("00ab10").unwrap(), vec![0x00, 0xab, 0x10]);
        assert_eq!(parse_hex("0x01 02").unwrap(), vec![1, 2]);
        assert_eq!(parse_hex("").unwrap(), Vec::<u8>::new());
    }

    #[test]
    fn hex_rejects_garbage() {
        assert!(parse_hex("abc").is_err());
        assert!(parse_hex("zz").is_err());
    }

    #[test]
    fn numbers_in_either_base() {
        assert_eq!(parse_number("0x9001550A").unwrap(), 0x9001_550A);
        assert_eq!(parse_number("341").unwrap(), 341);
        assert!(parse_number("0xZZ").is_err());
        assert!(parse_bounded::<u8>("256", "tail byte").is_err());
        assert_eq!(parse_bounded::<u8>("0xC5", "tail byte").unwrap(), 0xC5);
    }
}
