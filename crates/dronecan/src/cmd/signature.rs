use std::fs;

use dronecan_dsdl::compose;
use serde::Serialize;
use tracing::debug;

use crate::cmd::{format_signature, parse_signature, SignatureArgs};
use crate::exit::{io_error, CliError, CliResult, SUCCESS};
use crate::output::{print_json, print_table, OutputFormat};

#[derive(Serialize)]
struct SignatureOutput {
    signature: String,
    name: Option<String>,
    nested: Vec<String>,
}

pub fn run(args: SignatureArgs, format: OutputFormat) -> CliResult<i32> {
    let text = match (args.text, args.file) {
        (Some(text), _) => text,
        (None, Some(path)) => {
            let mut text = fs::read_to_string(&path)
                .map_err(|err| io_error(&format!("cannot read {}", path.display()), err))?;
            if text.ends_with('\n') {
                text.pop();
                if text.ends_with('\r') {
                    text.pop();
                }
            }
            text
        }
        (None, None) => return Err(CliError::usage("one of --text or --file is required")),
    };
    let nested = args
        .nested
        .iter()
        .map(|input| parse_signature(input))
        .collect::<CliResult<Vec<u64>>>()?;

    let signature = compose(&text, &nested);
    debug!(len = text.len(), nested = nested.len(), "composed signature");

    let out = SignatureOutput {
        signature: format_signature(signature),
        name: text.lines().next().map(str::to_string),
        nested: nested.into_iter().map(format_signature).collect(),
    };
    match format {
        OutputFormat::Json => print_json(&out),
        OutputFormat::Table => print_table(
            &["TYPE", "SIGNATURE", "NESTED"],
            vec![vec![
                out.name.clone().unwrap_or_default(),
                out.signature.clone(),
                out.nested.len().to_string(),
            ]],
        ),
        OutputFormat::Pretty | OutputFormat::Raw => println!("{}", out.signature),
    }
    Ok(SUCCESS)
}
