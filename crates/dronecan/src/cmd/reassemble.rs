use std::fs::File;
use std::io::BufReader;

use dronecan_frame::{FrameKind, SignatureTable, Transfer, TransferReceiver};
use dronecan_link::LinkReader;
use serde::Serialize;
use tracing::{info, warn};

use crate::cmd::{parse_signature, ReassembleArgs};
use crate::exit::{io_error, link_error, CliError, CliResult, SUCCESS};
use crate::output::{hex, parse_bounded, print_json, print_raw, print_table, OutputFormat};

#[derive(Serialize)]
struct TransferOutput {
    kind: FrameKind,
    type_id: u16,
    source: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    destination: Option<u8>,
    transfer_id: u8,
    payload_size: usize,
    payload: String,
}

impl From<&Transfer> for TransferOutput {
    fn from(transfer: &Transfer) -> Self {
        Self {
            kind: transfer.frame.kind(),
            type_id: transfer.frame.type_id(),
            source: transfer.frame.source(),
            destination: transfer.frame.destination(),
            transfer_id: transfer.transfer_id,
            payload_size: transfer.payload.len(),
            payload: hex(&transfer.payload),
        }
    }
}

pub fn run(args: ReassembleArgs, format: OutputFormat) -> CliResult<i32> {
    let table = signature_table(&args.messages, &args.services)?;
    let file = File::open(&args.input)
        .map_err(|err| io_error(&format!("cannot open {}", args.input.display()), err))?;

    let mut receiver = TransferReceiver::new(table);
    let mut frames = 0usize;
    let mut transfers = Vec::new();
    for frame in LinkReader::new(BufReader::new(file)) {
        let frame = frame.map_err(|err| link_error("read failed", err))?;
        frames += 1;
        let Some(transfer) = receiver.read(&frame) else {
            continue;
        };
        if let OutputFormat::Json = format {
            print_json(&TransferOutput::from(&transfer));
        }
        transfers.push(transfer);
    }
    if receiver.pending() > 0 {
        warn!(pending = receiver.pending(), "capture ended inside a transfer");
    }
    info!(frames, transfers = transfers.len(), "capture reassembled");

    match format {
        OutputFormat::Json => {}
        OutputFormat::Table => print_table(
            &["KIND", "TYPE", "SOURCE", "DEST", "TRANSFER ID", "SIZE", "PAYLOAD"],
            transfers
                .iter()
                .map(TransferOutput::from)
                .map(|out| {
                    vec![
                        out.kind.to_string(),
                        out.type_id.to_string(),
                        out.source.to_string(),
                        out.destination.map(|d| d.to_string()).unwrap_or_default(),
                        out.transfer_id.to_string(),
                        out.payload_size.to_string(),
                        out.payload,
                    ]
                })
                .collect(),
        ),
        OutputFormat::Pretty => {
            for out in transfers.iter().map(TransferOutput::from) {
                println!(
                    "{} type={} source={} transfer_id={} payload={}",
                    out.kind, out.type_id, out.source, out.transfer_id, out.payload
                );
            }
        }
        OutputFormat::Raw => {
            for transfer in &transfers {
                print_raw(&transfer.payload);
            }
        }
    }
    Ok(SUCCESS)
}

fn signature_table(messages: &[String], services: &[String]) -> CliResult<SignatureTable> {
    let mut table = SignatureTable::new();
    for entry in messages {
        let (id, signature) = split_pair(entry)?;
        table.insert_message(parse_bounded(id, "message id")?, signature);
    }
    for entry in services {
        let (id, signature) = split_pair(entry)?;
        table.insert_service(parse_bounded(id, "service id")?, signature);
    }
    Ok(table)
}

fn split_pair(entry: &str) -> CliResult<(&str, u64)> {
    let (id, signature) = entry
        .split_once('=')
        .ok_or_else(|| CliError::usage(format!("expected ID=HEX, got {entry}")))?;
    Ok((id, parse_signature(signature)?))
}

#[cfg(test)]
mod tests {
    use dronecan_frame::{Frame, SignatureLookup};

    use super::*;

    #[test]
    fn signature_pairs() {
        let table = signature_table(
            &["341=0x0F0868D0C1A7C6F1".to_string()],
            &["0x01=ab".to_string()],
        )
        .unwrap();
        assert_eq!(
            table.signature_for(&Frame::message(1, 341)),
            Some(0x0F08_68D0_C1A7_C6F1)
        );
        assert_eq!(table.signature_for(&Frame::request(1, 2, 1)), Some(0xAB));
    }

    #[test]
    fn malformed_pairs() {
        assert!(signature_table(&["341".to_string()], &[]).is_err());
        assert!(signature_table(&[], &["300=ab".to_string()]).is_err());
    }
}
