use dronecan_dsdl::transfer_crc;
use serde::Serialize;

use crate::cmd::{format_signature, parse_signature, CrcArgs};
use crate::exit::{CliResult, SUCCESS};
use crate::output::{parse_hex, print_json, print_table, print_raw, OutputFormat};

#[derive(Serialize)]
struct CrcOutput {
    crc: String,
    signature: String,
    payload_size: usize,
}

pub fn run(args: CrcArgs, format: OutputFormat) -> CliResult<i32> {
    let signature = parse_signature(&args.signature)?;
    let payload = parse_hex(&args.payload)?;
    let crc = transfer_crc(signature, &payload);

    let out = CrcOutput {
        crc: format!("0x{crc:04X}"),
        signature: format_signature(signature),
        payload_size: payload.len(),
    };
    match format {
        OutputFormat::Json => print_json(&out),
        OutputFormat::Table => print_table(
            &["SIGNATURE", "SIZE", "CRC"],
            vec![vec![
                out.signature.clone(),
                out.payload_size.to_string(),
                out.crc.clone(),
            ]],
        ),
        OutputFormat::Pretty => println!("{}", out.crc),
        // Wire order: the CRC leads a multi-frame payload little-endian.
        OutputFormat::Raw => print_raw(&crc.to_le_bytes()),
    }
    Ok(SUCCESS)
}
