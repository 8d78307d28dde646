use std::io::IsTerminal;

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use qcinput_rules::{EngineError, Envelope};
use serde::Serialize;

#[derive(Clone, Debug, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
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

pub fn print_json<T: Serialize>(value: &T) {
    println!(
        "{}",
        serde_json::to_string(value).unwrap_or_else(|_| "{}".to_string())
    );
}

pub fn table(header: Vec<&str>) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header);
    table
}

/// Print the outcome of a validation run.
pub fn print_verdict(verdict: &Result<(), EngineError>, format: OutputFormat) {
    let envelope = match verdict {
        Ok(()) => Envelope::success(serde_json::Value::Array(Vec::new())),
        Err(err) => Envelope::from_error(err),
    };
    let field = verdict
        .as_ref()
        .err()
        .and_then(EngineError::validation)
        .map(|err| err.field.as_str())
        .unwrap_or("-");

    match format {
        OutputFormat::Json => print_json(&envelope),
        OutputFormat::Table => {
            let mut out = table(vec!["RETURN CODE", "FIELD", "MESSAGE"]);
            out.add_row(vec![
                envelope.meta.return_code.to_string(),
                field.to_string(),
                envelope.meta.message.clone(),
            ]);
            println!("{out}");
        }
        OutputFormat::Pretty => {
            if envelope.is_success() {
                println!("ok");
            } else {
                println!(
                    "return_code={} field={} message={}",
                    envelope.meta.return_code, field, envelope.meta.message
                );
            }
        }
    }
}
