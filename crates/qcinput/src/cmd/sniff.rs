use std::path::Path;

use qcinput_rules::files::sniff_file;
use serde::Serialize;

use crate::cmd::SniffArgs;
use crate::exit::{CliResult, FAILURE, SUCCESS};
use crate::output::{print_json, table, OutputFormat};

const SNIFF_BYTES: usize = 16;

#[derive(Debug, Serialize)]
struct SniffRow {
    path: String,
    kind: &'static str,
    document: bool,
    bitmap: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

pub fn run(args: SniffArgs, format: OutputFormat) -> CliResult<i32> {
    let rows: Vec<SniffRow> = args.paths.iter().map(|path| sniff_row(path)).collect();
    let unreadable = rows.iter().any(|row| row.error.is_some());

    match format {
        OutputFormat::Json => print_json(&rows),
        OutputFormat::Table => {
            let mut out = table(vec!["PATH", "KIND", "DOCUMENT", "BITMAP"]);
            for row in &rows {
                out.add_row(vec![
                    row.path.clone(),
                    row.error.clone().unwrap_or_else(|| row.kind.to_string()),
                    row.document.to_string(),
                    row.bitmap.to_string(),
                ]);
            }
            println!("{out}");
        }
        OutputFormat::Pretty => {
            for row in &rows {
                match &row.error {
                    Some(err) => println!("{}: error: {err}", row.path),
                    None => println!("{}: {}", row.path, row.kind),
                }
            }
        }
    }

    Ok(if unreadable { FAILURE } else { SUCCESS })
}

fn sniff_row(path: &Path) -> SniffRow {
    let display = path.display().to_string();
    match sniff_file(path, SNIFF_BYTES) {
        Ok(kind) => SniffRow {
            path: display,
            kind: kind.as_str(),
            document: kind.is_document(),
            bitmap: kind.is_bitmap(),
            error: None,
        },
        Err(err) => SniffRow {
            path: display,
            kind: "unknown",
            document: false,
            bitmap: false,
            error: Some(err.to_string()),
        },
    }
}
