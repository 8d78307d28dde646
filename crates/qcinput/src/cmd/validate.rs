use qcinput_rules::{
    validate, CatalogError, FileSource, Requirements, RuleRegistry, UploadedFiles,
};
use serde_json::{Map, Value};

use crate::cmd::{load_catalog, load_requirements, read_json, ValidateArgs};
use crate::exit::{catalog_error, json_error, verdict_code, CliError, CliResult, USAGE};
use crate::output::{print_verdict, OutputFormat};

pub fn run(args: ValidateArgs, format: OutputFormat) -> CliResult<i32> {
    let engine = args.engine_config();
    let requirements = resolve_requirements(&args)?;
    let input = read_input(&args)?;
    let files = read_files(&args)?;

    let registry = RuleRegistry::with_builtins();
    let verdict = validate(
        &registry,
        &engine,
        &requirements,
        &input,
        files.as_ref().map(|files| files as &dyn FileSource),
    );

    match &verdict {
        Ok(()) => tracing::info!(fields = requirements.len(), "input is valid"),
        Err(err) if err.is_client_error() => {
            tracing::info!(code = err.code(), error = %err, "input rejected")
        }
        Err(err) => tracing::error!(error = %err, "requirements are misconfigured"),
    }

    print_verdict(&verdict, format);
    Ok(verdict_code(&verdict))
}

fn resolve_requirements(args: &ValidateArgs) -> CliResult<Requirements> {
    if let Some(path) = &args.source.requirements {
        return load_requirements(path);
    }

    let Some(dir) = &args.source.catalog else {
        return Err(CliError::new(
            USAGE,
            "one of --requirements or --catalog is required",
        ));
    };
    let Some(endpoint) = &args.endpoint else {
        return Err(CliError::new(USAGE, "--endpoint is required with --catalog"));
    };

    let catalog = load_catalog(dir)?;
    catalog.get(endpoint).cloned().ok_or_else(|| {
        catalog_error(
            "cannot validate",
            CatalogError::UnknownEndpoint(endpoint.clone()),
        )
    })
}

fn read_input(args: &ValidateArgs) -> CliResult<Map<String, Value>> {
    let Some(path) = &args.input else {
        return Ok(Map::new());
    };
    match read_json(path)? {
        Value::Object(map) => Ok(map),
        _ => Err(CliError::new(
            USAGE,
            format!("{} must contain a JSON object", path.display()),
        )),
    }
}

fn read_files(args: &ValidateArgs) -> CliResult<Option<UploadedFiles>> {
    let Some(path) = &args.files else {
        return Ok(None);
    };
    let manifest = read_json(path)?;
    UploadedFiles::from_value(manifest)
        .map(Some)
        .map_err(|err| json_error(&format!("invalid upload manifest {}", path.display()), err))
}
