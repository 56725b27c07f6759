use dronecan_frame::Tail;
use serde::Serialize;

use crate::cmd::TailArgs;
use crate::exit::{CliResult, SUCCESS};
use crate::output::{parse_bounded, print_json, print_table, OutputFormat};

#[derive(Serialize)]
struct TailOutput {
    byte: String,
    #[serde(flatten)]
    tail: Tail,
}

pub fn run(args: TailArgs, format: OutputFormat) -> CliResult<i32> {
    let byte: u8 = parse_bounded(&args.byte, "tail byte")?;
    let out = TailOutput {
        byte: format!("0x{byte:02X}"),
        tail: Tail::decode(byte),
    };

    match format {
        OutputFormat::Json => print_json(&out),
        OutputFormat::Table => print_table(
            &["BYTE", "TRANSFER ID", "TOGGLE", "START", "END"],
            vec![vec![
                out.byte.clone(),
                out.tail.transfer_id.to_string(),
                out.tail.toggle.to_string(),
                out.tail.start.to_string(),
                out.tail.end.to_string(),
            ]],
        ),
        OutputFormat::Pretty => println!(
            "{} transfer_id={} toggle={} start={} end={}",
            out.byte, out.tail.transfer_id, out.tail.toggle, out.tail.start, out.tail.end
        ),
        OutputFormat::Raw => println!("{}", out.tail.transfer_id),
    }
    Ok(SUCCESS)
}
