use dronecan_frame::priority::priority_name;
use dronecan_frame::{Frame, FrameKind};
use serde::Serialize;

use crate::cmd::IdArgs;
use crate::exit::{CliError, CliResult, DATA_INVALID, SUCCESS};
use crate::output::{parse_bounded, print_json, print_table, OutputFormat};

#[derive(Serialize)]
struct IdOutput {
    id: String,
    kind: FrameKind,
    type_id: u16,
    source: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    discriminator: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    destination: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    request: Option<bool>,
    priority: u8,
    priority_name: &'static str,
    reserved: u8,
}

pub fn run(args: IdArgs, format: OutputFormat) -> CliResult<i32> {
    let value: u32 = parse_bounded(&args.id, "frame identifier")?;
    let frame = Frame::decode(value)
        .map_err(|err| CliError::new(DATA_INVALID, format!("cannot decode identifier: {err}")))?;

    let (discriminator, request) = match frame {
        Frame::Anonymous { discriminator, .. } => (Some(discriminator), None),
        Frame::Service { request, .. } => (None, Some(request)),
        Frame::Message { .. } => (None, None),
    };
    let out = IdOutput {
        id: format!("0x{value:08X}"),
        kind: frame.kind(),
        type_id: frame.type_id(),
        source: frame.source(),
        discriminator,
        destination: frame.destination(),
        request,
        priority: frame.priority(),
        priority_name: priority_name(frame.priority()),
        reserved: frame.reserved(),
    };

    print_id(&out, format);
    Ok(SUCCESS)
}

fn print_id(out: &IdOutput, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(out),
        OutputFormat::Table => {
            let mut rows = vec![
                vec!["kind".to_string(), out.kind.to_string()],
                vec!["type id".to_string(), out.type_id.to_string()],
                vec!["source".to_string(), out.source.to_string()],
            ];
            if let Some(discriminator) = out.discriminator {
                rows.push(vec!["discriminator".to_string(), format!("0x{discriminator:04X}")]);
            }
            if let Some(destination) = out.destination {
                rows.push(vec!["destination".to_string(), destination.to_string()]);
            }
            if let Some(request) = out.request {
                let direction = if request { "request" } else { "response" };
                rows.push(vec!["direction".to_string(), direction.to_string()]);
            }
            rows.push(vec![
                "priority".to_string(),
                format!("{} ({})", out.priority, out.priority_name),
            ]);
            rows.push(vec!["reserved".to_string(), format!("0b{:03b}", out.reserved)]);
            print_table(&["FIELD", out.id.as_str()], rows);
        }
        OutputFormat::Pretty => {
            let mut line = format!(
                "{} kind={} type_id={} source={}",
                out.id, out.kind, out.type_id, out.source
            );
            if let Some(discriminator) = out.discriminator {
                line.push_str(&format!(" discriminator=0x{discriminator:04X}"));
            }
            if let Some(destination) = out.destination {
                line.push_str(&format!(" destination={destination}"));
            }
            if let Some(request) = out.request {
                line.push_str(&format!(" request={request}"));
            }
            line.push_str(&format!(
                " priority={} ({}) reserved={}",
                out.priority, out.priority_name, out.reserved
            ));
            println!("{line}");
        }
        OutputFormat::Raw => println!("{}", out.type_id),
    }
}
