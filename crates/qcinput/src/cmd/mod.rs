use std::path::{Path, PathBuf};

use clap::{Args, Subcommand, ValueEnum};
use qcinput_rules::{EngineConfig, LengthUnit, Requirements, RequirementsCatalog};
use serde_json::Value;

use crate::exit::{catalog_error, io_error, json_error, requirements_error, CliResult};
use crate::output::OutputFormat;

pub mod inspect;
pub mod rules;
pub mod sniff;
pub mod validate;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Validate an input document against a requirements description.
    Validate(ValidateArgs),
    /// List registered validation rules and their error codes.
    Rules(RulesArgs),
    /// Load requirements descriptions and print their fields.
    Inspect(InspectArgs),
    /// Report the sniffed content type of files.
    Sniff(SniffArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Validate(args) => validate::run(args, format),
        Command::Rules(args) => rules::run(args, format),
        Command::Inspect(args) => inspect::run(args, format),
        Command::Sniff(args) => sniff::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

/// Where requirements descriptions come from.
#[derive(Args, Debug)]
pub struct SourceArgs {
    /// Requirements description file. Takes precedence over --catalog.
    #[arg(long, short = 'r', value_name = "FILE")]
    pub requirements: Option<PathBuf>,
    /// Directory of `<endpoint>.requirements.json` files.
    #[arg(long, value_name = "DIR", env = "QCINPUT_REQUIREMENTS_DIR")]
    pub catalog: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum LengthUnitArg {
    Bytes,
    Chars,
}

impl From<LengthUnitArg> for LengthUnit {
    fn from(unit: LengthUnitArg) -> Self {
        match unit {
            LengthUnitArg::Bytes => LengthUnit::Bytes,
            LengthUnitArg::Chars => LengthUnit::Chars,
        }
    }
}

#[derive(Args, Debug)]
pub struct ValidateArgs {
    #[command(flatten)]
    pub source: SourceArgs,
    /// Endpoint whose description is used (with --catalog).
    #[arg(long, short = 'e')]
    pub endpoint: Option<String>,
    /// JSON object with the request input. Defaults to an empty object.
    #[arg(long, short = 'i', value_name = "FILE")]
    pub input: Option<PathBuf>,
    /// JSON manifest of uploaded files keyed by upload name.
    #[arg(long, value_name = "FILE")]
    pub files: Option<PathBuf>,
    /// Check absent non-optional typed `files` fields instead of skipping them.
    #[arg(long)]
    pub strict_files: bool,
    /// Unit used for string length constraints.
    #[arg(long, value_enum, default_value = "bytes")]
    pub length_unit: LengthUnitArg,
    /// Maximum nesting depth of array fields.
    #[arg(long)]
    pub max_depth: Option<usize>,
    /// Maximum number of elements in one array field.
    #[arg(long)]
    pub max_array_len: Option<usize>,
}

impl ValidateArgs {
    pub fn engine_config(&self) -> EngineConfig {
        let defaults = EngineConfig::default();
        EngineConfig {
            max_depth: self.max_depth.unwrap_or(defaults.max_depth),
            max_array_len: self.max_array_len.unwrap_or(defaults.max_array_len),
            length_unit: self.length_unit.into(),
            strict_files: self.strict_files,
            ..defaults
        }
    }
}

#[derive(Args, Debug, Default)]
pub struct RulesArgs {}

#[derive(Args, Debug)]
pub struct InspectArgs {
    #[command(flatten)]
    pub source: SourceArgs,
}

#[derive(Args, Debug)]
pub struct SniffArgs {
    /// Files to inspect.
    #[arg(required = true)]
    pub paths: Vec<PathBuf>,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

pub(crate) fn read_json(path: &Path) -> CliResult<Value> {
    let content = std::fs::read_to_string(path)
        .map_err(|err| io_error(&format!("failed reading {}", path.display()), err))?;
    serde_json::from_str(&content)
        .map_err(|err| json_error(&format!("{} is not valid JSON", path.display()), err))
}

pub(crate) fn load_requirements(path: &Path) -> CliResult<Requirements> {
    let content = std::fs::read_to_string(path)
        .map_err(|err| io_error(&format!("failed reading {}", path.display()), err))?;
    Requirements::from_json_str(&content)
        .map_err(|err| requirements_error(&format!("invalid requirements {}", path.display()), err))
}

pub(crate) fn load_catalog(dir: &Path) -> CliResult<RequirementsCatalog> {
    RequirementsCatalog::from_directory(dir)
        .map_err(|err| catalog_error(&format!("failed loading {}", dir.display()), err))
}
