use std::fs::File;
use std::io::BufWriter;

use dronecan_frame::{Frame, SignatureLookup, Tail, TransferSender};
use dronecan_link::{CanFrame, Link, LinkWriter};
use serde::Serialize;
use tracing::info;

use crate::cmd::{parse_signature, SegmentArgs};
use crate::exit::{frame_error, io_error, link_error, CliError, CliResult, DATA_INVALID, SUCCESS};
use crate::output::{hex, parse_bounded, parse_hex, print_json, print_table, OutputFormat};

/// Resolves every frame to the one signature given on the command line.
struct FixedSignature(Option<u64>);

impl SignatureLookup for FixedSignature {
    fn signature_for(&self, _frame: &Frame) -> Option<u64> {
        self.0
    }
}

#[derive(Serialize)]
struct FrameOutput {
    index: usize,
    id: String,
    data: String,
    tail: Tail,
}

#[derive(Serialize)]
struct WrittenOutput {
    path: String,
    frames: usize,
    transfer_id: u8,
}

pub fn run(args: SegmentArgs, format: OutputFormat) -> CliResult<i32> {
    let id: u32 = parse_bounded(&args.id, "frame identifier")?;
    let frame = Frame::decode(id)
        .map_err(|err| CliError::new(DATA_INVALID, format!("cannot decode identifier: {err}")))?;
    let signature = args.signature.as_deref().map(parse_signature).transpose()?;
    let payload = parse_hex(&args.payload)?;
    let transfer_id = args
        .transfer_id
        .as_deref()
        .map(|input| parse_bounded::<u8>(input, "transfer id"))
        .transpose()?;

    let mut sender = TransferSender::new(Vec::new(), FixedSignature(signature));
    let transfer_id = sender
        .send(&frame, &payload, transfer_id)
        .map_err(|err| frame_error("segment failed", err))?;
    let frames = sender.into_inner();

    if let Some(path) = args.output {
        let file = File::create(&path)
            .map_err(|err| io_error(&format!("cannot create {}", path.display()), err))?;
        let count = write_records(BufWriter::new(file), &frames)?;
        info!(path = %path.display(), frames = count, transfer_id, "wrote capture");
        let out = WrittenOutput {
            path: path.display().to_string(),
            frames: count,
            transfer_id,
        };
        match format {
            OutputFormat::Json => print_json(&out),
            _ => println!("wrote {} frames to {}", out.frames, out.path),
        }
        return Ok(SUCCESS);
    }

    if let OutputFormat::Raw = format {
        write_records(std::io::stdout().lock(), &frames)?;
        return Ok(SUCCESS);
    }

    let rows: Vec<FrameOutput> = frames
        .iter()
        .enumerate()
        .map(|(index, frame)| FrameOutput {
            index,
            id: format!("0x{:08X}", frame.id()),
            data: hex(frame.data()),
            tail: frame.data().last().map(|b| Tail::decode(*b)).unwrap_or_default(),
        })
        .collect();
    match format {
        OutputFormat::Json => rows.iter().for_each(print_json),
        OutputFormat::Table => print_table(
            &["#", "ID", "DATA", "TRANSFER ID", "TOGGLE", "START", "END"],
            rows.iter()
                .map(|row| {
                    vec![
                        row.index.to_string(),
                        row.id.clone(),
                        row.data.clone(),
                        row.tail.transfer_id.to_string(),
                        row.tail.toggle.to_string(),
                        row.tail.start.to_string(),
                        row.tail.end.to_string(),
                    ]
                })
                .collect(),
        ),
        OutputFormat::Pretty | OutputFormat::Raw => {
            for row in &rows {
                println!("{} {}", row.id, row.data);
            }
        }
    }
    Ok(SUCCESS)
}

fn write_records<W: std::io::Write>(inner: W, frames: &[CanFrame]) -> CliResult<usize> {
    let mut writer = LinkWriter::new(inner);
    for frame in frames {
        writer
            .write(frame.clone())
            .map_err(|err| link_error("write failed", err))?;
    }
    writer.flush().map_err(|err| link_error("flush failed", err))?;
    Ok(frames.len())
}
