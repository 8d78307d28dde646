use std::fmt;
use std::io;

use qcinput_rules::{CatalogError, EngineError, RequirementsError};

pub const SUCCESS: i32 = 0;
pub const FAILURE: i32 = 1;
pub const PERMISSION_DENIED: i32 = 50;
pub const VALIDATION_FAILED: i32 = 60;
pub const USAGE: i32 = 64;
pub const NO_INPUT: i32 = 66;
pub const CONFIG: i32 = 78;
pub const INTERNAL: i32 = 125;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

pub fn io_error(context: &str, err: io::Error) -> CliError {
    let code = match err.kind() {
        io::ErrorKind::PermissionDenied => PERMISSION_DENIED,
        io::ErrorKind::NotFound => NO_INPUT,
        _ => INTERNAL,
    };
    CliError::new(code, format!("{context}: {err}"))
}

pub fn json_error(context: &str, err: serde_json::Error) -> CliError {
    CliError::new(USAGE, format!("{context}: {err}"))
}

pub fn requirements_error(context: &str, err: RequirementsError) -> CliError {
    CliError::new(CONFIG, format!("{context}: {err}"))
}

pub fn catalog_error(context: &str, err: CatalogError) -> CliError {
    match err {
        CatalogError::UnknownEndpoint(_) => CliError::new(USAGE, format!("{context}: {err}")),
        other => CliError::new(CONFIG, format!("{context}: {other}")),
    }
}

/// Exit code for a finished validation run.
pub fn verdict_code(verdict: &Result<(), EngineError>) -> i32 {
    match verdict {
        Ok(()) => SUCCESS,
        Err(err) if err.is_client_error() => VALIDATION_FAILED,
        Err(_) => CONFIG,
    }
}

#[cfg(test)]
mod tests {
    use qcinput_rules::{ValidationError, ValidationErrorKind};

    use super::*;

    #[test]
    fn verdicts_map_to_exit_codes() {
        assert_eq!(verdict_code(&Ok(())), SUCCESS);
        assert_eq!(
            verdict_code(&Err(EngineError::Invalid(ValidationError::new(
                ValidationErrorKind::NotBoolean,
                "flag",
                "Input argument 'flag' is not a boolean value",
            )))),
            VALIDATION_FAILED
        );
        assert_eq!(
            verdict_code(&Err(EngineError::UnknownRule("zip".to_string()))),
            CONFIG
        );
    }

    #[test]
    fn missing_files_are_no_input() {
        let err = io_error(
            "failed reading input",
            io::Error::new(io::ErrorKind::NotFound, "gone"),
        );
        assert_eq!(err.code, NO_INPUT);
        assert!(err.message.starts_with("failed reading input"));
    }
}
