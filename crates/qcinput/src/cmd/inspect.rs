use qcinput_rules::requirements::{ArrayValues, FieldSpec, RuleOptions};
use qcinput_rules::{Requirements, RuleRegistry};
use serde::Serialize;

use crate::cmd::{load_catalog, load_requirements, InspectArgs};
use crate::exit::{CliError, CliResult, CONFIG, SUCCESS, USAGE};
use crate::output::{print_json, table, OutputFormat};

#[derive(Debug, Serialize)]
struct FieldRow {
    endpoint: String,
    path: String,
    rule: String,
    typed: bool,
    optional: bool,
    registered: bool,
}

#[derive(Debug, Serialize)]
struct InspectOutput {
    fields: Vec<FieldRow>,
    unregistered_rules: Vec<String>,
}

pub fn run(args: InspectArgs, format: OutputFormat) -> CliResult<i32> {
    let descriptions: Vec<(String, Requirements)> = if let Some(path) = &args.source.requirements {
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        vec![(name, load_requirements(path)?)]
    } else if let Some(dir) = &args.source.catalog {
        let catalog = load_catalog(dir)?;
        catalog
            .endpoints()
            .into_iter()
            .filter_map(|endpoint| {
                catalog
                    .get(endpoint)
                    .map(|requirements| (endpoint.to_string(), requirements.clone()))
            })
            .collect()
    } else {
        return Err(CliError::new(
            USAGE,
            "one of --requirements or --catalog is required",
        ));
    };

    let registry = RuleRegistry::with_builtins();
    let mut fields = Vec::new();
    for (endpoint, requirements) in &descriptions {
        collect_rows(endpoint, "", requirements, &registry, &mut fields);
    }
    let mut unregistered_rules: Vec<String> = fields
        .iter()
        .filter(|row| !row.registered)
        .map(|row| row.rule.clone())
        .collect();
    unregistered_rules.sort();
    unregistered_rules.dedup();

    let output = InspectOutput {
        fields,
        unregistered_rules,
    };
    print_inspect(&output, format);

    if output.unregistered_rules.is_empty() {
        Ok(SUCCESS)
    } else {
        tracing::warn!(rules = ?output.unregistered_rules, "descriptions reference unregistered rules");
        Ok(CONFIG)
    }
}

fn collect_rows(
    endpoint: &str,
    prefix: &str,
    requirements: &Requirements,
    registry: &RuleRegistry,
    rows: &mut Vec<FieldRow>,
) {
    for field in requirements {
        let path = format!("{prefix}{}", field.key);
        rows.push(row(endpoint, &path, field, registry));

        if let RuleOptions::Array(array) = &field.options.rule {
            match &array.values {
                ArrayValues::Elements(element) => {
                    rows.push(row(endpoint, &format!("{path}[]"), element, registry));
                }
                ArrayValues::Records(nested) => {
                    collect_rows(endpoint, &format!("{path}[]."), nested, registry, rows);
                }
            }
        }
    }
}

fn row(endpoint: &str, path: &str, field: &FieldSpec, registry: &RuleRegistry) -> FieldRow {
    FieldRow {
        endpoint: endpoint.to_string(),
        path: path.to_string(),
        rule: field.rule.clone(),
        typed: field.typed,
        optional: field.options.optional,
        registered: registry.contains(&field.rule),
    }
}

fn print_inspect(output: &InspectOutput, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(output),
        OutputFormat::Table => {
            let mut out = table(vec!["ENDPOINT", "FIELD", "RULE", "TYPED", "OPTIONAL"]);
            for field in &output.fields {
                let rule = if field.registered {
                    field.rule.clone()
                } else {
                    format!("{} (unregistered)", field.rule)
                };
                out.add_row(vec![
                    field.endpoint.clone(),
                    field.path.clone(),
                    rule,
                    field.typed.to_string(),
                    field.optional.to_string(),
                ]);
            }
            println!("{out}");
        }
        OutputFormat::Pretty => {
            for field in &output.fields {
                println!(
                    "{} {} rule={}{}{}",
                    field.endpoint,
                    field.path,
                    field.rule,
                    if field.optional { " optional" } else { "" },
                    if field.registered { "" } else { " unregistered" },
                );
            }
        }
    }
}
