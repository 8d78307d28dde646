use qcinput_rules::{BuiltinRule, Rule, RuleRegistry, CONFIGURATION_ERROR_CODE};
use serde::Serialize;

use crate::cmd::RulesArgs;
use crate::exit::{CliResult, SUCCESS};
use crate::output::{print_json, table, OutputFormat};

#[derive(Debug, Serialize)]
struct ErrorCode {
    kind: &'static str,
    code: u16,
}

#[derive(Debug, Serialize)]
struct RuleOutput {
    name: String,
    builtin: bool,
    errors: Vec<ErrorCode>,
}

#[derive(Debug, Serialize)]
struct RulesOutput {
    rules: Vec<RuleOutput>,
    missing_argument_code: u16,
    configuration_error_code: u16,
}

pub fn run(_args: RulesArgs, format: OutputFormat) -> CliResult<i32> {
    let registry = RuleRegistry::with_builtins();
    let output = describe(&registry);

    match format {
        OutputFormat::Json => print_json(&output),
        OutputFormat::Table => {
            let mut out = table(vec!["RULE", "ERRORS"]);
            for rule in &output.rules {
                out.add_row(vec![rule.name.clone(), error_list(&rule.errors)]);
            }
            println!("{out}");
        }
        OutputFormat::Pretty => {
            for rule in &output.rules {
                println!("{:<10} {}", rule.name, error_list(&rule.errors));
            }
        }
    }

    Ok(SUCCESS)
}

fn describe(registry: &RuleRegistry) -> RulesOutput {
    let rules = registry
        .names()
        .into_iter()
        .map(|name| {
            let builtin = match registry.resolve(name) {
                Ok(Rule::Builtin(rule)) => Some(*rule),
                _ => None,
            };
            RuleOutput {
                name: name.to_string(),
                builtin: builtin.is_some(),
                errors: builtin
                    .map(BuiltinRule::error_kinds)
                    .unwrap_or_default()
                    .iter()
                    .map(|kind| ErrorCode {
                        kind: kind.as_str(),
                        code: kind.code(),
                    })
                    .collect(),
            }
        })
        .collect();

    RulesOutput {
        rules,
        missing_argument_code: qcinput_rules::ValidationErrorKind::MissingArgument.code(),
        configuration_error_code: CONFIGURATION_ERROR_CODE,
    }
}

fn error_list(errors: &[ErrorCode]) -> String {
    errors
        .iter()
        .map(|err| format!("{} ({})", err.kind, err.code))
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn describes_every_builtin() {
        let output = describe(&RuleRegistry::with_builtins());
        assert_eq!(output.rules.len(), BuiltinRule::ALL.len());
        assert!(output.rules.iter().all(|rule| rule.builtin));

        let int = output.rules.iter().find(|rule| rule.name == "int").unwrap();
        let codes: Vec<u16> = int.errors.iter().map(|err| err.code).collect();
        assert_eq!(codes, vec![104, 103]);
        assert_eq!(error_list(&int.errors), "not_integer (104), out_of_range (103)");
    }
}
