//! Walks a requirements description against client input.
//!
//! Fields are checked in declared order and the first failure is returned;
//! nothing after it is evaluated.

use serde_json::{Map, Value};

use crate::config::EngineConfig;
use crate::error::{EngineError, Result, ValidationError, ValidationErrorKind};
use crate::files::FileSource;
use crate::registry::RuleRegistry;
use crate::requirements::{FieldSpec, Requirements};
use crate::rules::BuiltinRule;

/// Caller state handed to every rule.
#[derive(Clone, Copy)]
pub struct ValidationContext<'a> {
    registry: &'a RuleRegistry,
    config: &'a EngineConfig,
    files: Option<&'a dyn FileSource>,
    depth: usize,
}

impl<'a> ValidationContext<'a> {
    pub fn new(registry: &'a RuleRegistry, config: &'a EngineConfig) -> Self {
        Self {
            registry,
            config,
            files: None,
            depth: 0,
        }
    }

    /// Attach the uploaded-file side channel read by the `files` rule.
    pub fn with_files(mut self, files: &'a dyn FileSource) -> Self {
        self.files = Some(files);
        self
    }

    pub fn registry(&self) -> &'a RuleRegistry {
        self.registry
    }

    pub fn config(&self) -> &'a EngineConfig {
        self.config
    }

    pub fn files(&self) -> Option<&'a dyn FileSource> {
        self.files
    }

    /// Current array nesting depth; zero at the top-level description.
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Context for the contents of an array, or `None` past the configured
    /// depth limit.
    pub fn nested(&self) -> Option<Self> {
        if self.depth >= self.config.max_depth {
            return None;
        }
        Some(Self {
            depth: self.depth + 1,
            ..*self
        })
    }
}

/// Validate `input` against `requirements` with a fresh context.
pub fn validate(
    registry: &RuleRegistry,
    config: &EngineConfig,
    requirements: &Requirements,
    input: &Map<String, Value>,
    files: Option<&dyn FileSource>,
) -> Result<()> {
    let mut ctx = ValidationContext::new(registry, config);
    if let Some(files) = files {
        ctx = ctx.with_files(files);
    }
    dispatch(&ctx, requirements, input)
}

/// Validate `input` against `requirements`, stopping at the first failure.
pub fn dispatch(
    ctx: &ValidationContext<'_>,
    requirements: &Requirements,
    input: &Map<String, Value>,
) -> Result<()> {
    for field in requirements {
        let Some(value) = select(ctx, field, input)? else {
            continue;
        };
        tracing::debug!(
            field = %field.key,
            rule = %field.rule,
            depth = ctx.depth(),
            "checking field"
        );
        let rule = ctx.registry().resolve(&field.rule)?;
        rule.check(ctx, &field.key, value, &field.options)?;
    }
    Ok(())
}

/// Decide whether a field is checked and with which value.
///
/// `Ok(None)` skips the field, `Ok(Some(None))` checks it without an input
/// value.
fn select<'v>(
    ctx: &ValidationContext<'_>,
    field: &FieldSpec,
    input: &'v Map<String, Value>,
) -> Result<Option<Option<&'v Value>>> {
    if !field.typed {
        return Ok(Some(None));
    }

    match input.get(&field.key) {
        Some(value) if !value.is_null() => Ok(Some(Some(value))),
        _ if field.options.optional => Ok(None),
        _ if field.rule == BuiltinRule::Files.name() => {
            if ctx.config().strict_files {
                Ok(Some(None))
            } else {
                tracing::debug!(field = %field.key, "skipping absent files field");
                Ok(None)
            }
        }
        _ => Err(EngineError::Invalid(ValidationError::new(
            ValidationErrorKind::MissingArgument,
            field.key.as_str(),
            format!("Input argument {} is undefined", field.key),
        ))),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use serde_json::json;

    use super::*;
    use crate::files::{FileUpload, UploadedFile, UploadedFiles};

    fn requirements(value: Value) -> Requirements {
        Requirements::from_value(&value).unwrap()
    }

    fn input(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            other => panic!("input must be an object, got {other}"),
        }
    }

    fn run(description: Value, body: Value) -> Result<()> {
        let registry = RuleRegistry::with_builtins();
        let config = EngineConfig::default();
        validate(
            &registry,
            &config,
            &requirements(description),
            &input(body),
            None,
        )
    }

    fn failure(result: Result<()>) -> ValidationError {
        match result {
            Err(EngineError::Invalid(err)) => err,
            other => panic!("expected a validation error, got {other:?}"),
        }
    }

    #[test]
    fn satisfied_description_passes() {
        let result = run(
            json!({
                "product": { "type": "string", "min_length": 1 },
                "lot": { "type": "int", "min": 1 },
                "weight": { "type": "float" },
                "inspector": { "type": "email" },
                "passed": { "type": "bool" },
                "date": { "type": "datetime", "format": "%Y-%m-%d" },
                "contact": { "type": "phone" },
                "ratio": { "type": "number" }
            }),
            json!({
                "product": "basil",
                "lot": "12",
                "weight": "1,250.5",
                "inspector": "qa@example.com",
                "passed": "TRUE",
                "date": "2024-03-01",
                "contact": "+52 (33) 1234-5678",
                "ratio": 0.25
            }),
        );
        assert!(result.is_ok(), "{result:?}");
    }

    #[test]
    fn missing_required_field_is_named() {
        let err = failure(run(
            json!({ "lot": { "type": "int" } }),
            json!({ "other": 1 }),
        ));
        assert_eq!(err.kind, ValidationErrorKind::MissingArgument);
        assert_eq!(err.field, "lot");
        assert_eq!(err.code(), 101);
    }

    #[test]
    fn null_counts_as_absent() {
        let err = failure(run(json!({ "lot": { "type": "int" } }), json!({ "lot": null })));
        assert_eq!(err.kind, ValidationErrorKind::MissingArgument);

        assert!(run(
            json!({ "lot": { "type": "int", "optional": true } }),
            json!({ "lot": null })
        )
        .is_ok());
    }

    #[test]
    fn optional_absent_field_is_skipped() {
        assert!(run(
            json!({ "note": { "type": "string", "optional": true } }),
            json!({})
        )
        .is_ok());
    }

    #[test]
    fn optional_present_field_is_still_checked() {
        let err = failure(run(
            json!({ "note": { "type": "string", "optional": true } }),
            json!({ "note": 5 }),
        ));
        assert_eq!(err.kind, ValidationErrorKind::NotString);
    }

    #[test]
    fn first_failure_wins() {
        let err = failure(run(
            json!({
                "a": { "type": "int" },
                "b": { "type": "email" }
            }),
            json!({ "a": "x", "b": "not-an-email" }),
        ));
        assert_eq!(err.field, "a");

        let err = failure(run(
            json!({
                "b": { "type": "email" },
                "a": { "type": "int" }
            }),
            json!({ "a": "x", "b": "not-an-email" }),
        ));
        assert_eq!(err.field, "b");
    }

    #[test]
    fn homogeneous_array_names_failing_index() {
        let err = failure(run(
            json!({ "field": { "type": "array", "values": { "type": "number" } } }),
            json!({ "field": [1, 2, "x"] }),
        ));
        assert_eq!(err.kind, ValidationErrorKind::NotNumeric);
        assert_eq!(err.field, "field[2]");
    }

    #[test]
    fn homogeneous_array_uses_element_constraints() {
        let description = json!({
            "scores": { "type": "array", "values": { "type": "int", "min": 0, "max": 10 } }
        });
        assert!(run(description.clone(), json!({ "scores": [0, 5, 10] })).is_ok());

        let err = failure(run(description, json!({ "scores": [0, 11] })));
        assert_eq!(err.kind, ValidationErrorKind::OutOfRange);
        assert_eq!(err.field, "scores[1]");
    }

    #[test]
    fn record_array_validates_each_element() {
        let description = json!({
            "rows": {
                "type": "array",
                "values": {
                    "category": { "type": "string" },
                    "count": { "type": "int", "min": 0 }
                }
            }
        });

        assert!(run(
            description.clone(),
            json!({ "rows": [
                { "category": "bruised", "count": 3 },
                { "category": "wilted", "count": 0 }
            ]})
        )
        .is_ok());

        let err = failure(run(
            description.clone(),
            json!({ "rows": [
                { "category": "bruised", "count": 3 },
                { "category": "wilted" }
            ]}),
        ));
        assert_eq!(err.kind, ValidationErrorKind::MissingArgument);
        assert_eq!(err.field, "count");

        let err = failure(run(description, json!({ "rows": [7] })));
        assert_eq!(err.kind, ValidationErrorKind::MissingArgument);
        assert_eq!(err.field, "category");
    }

    #[test]
    fn empty_array_requires_optional() {
        let required = json!({
            "rows": { "type": "array", "values": { "id": { "type": "int" } } }
        });
        let err = failure(run(required, json!({ "rows": [] })));
        assert_eq!(err.kind, ValidationErrorKind::EmptyArray);

        let optional = json!({
            "rows": { "type": "array", "optional": true, "values": { "id": { "type": "int" } } }
        });
        assert!(run(optional, json!({ "rows": [] })).is_ok());
    }

    #[test]
    fn array_length_limit() {
        let registry = RuleRegistry::with_builtins();
        let config = EngineConfig {
            max_array_len: 2,
            ..EngineConfig::default()
        };
        let description =
            requirements(json!({ "xs": { "type": "array", "values": { "type": "int" } } }));

        assert!(validate(&registry, &config, &description, &input(json!({ "xs": [1, 2] })), None).is_ok());
        let err = failure(validate(
            &registry,
            &config,
            &description,
            &input(json!({ "xs": [1, 2, 3] })),
            None,
        ));
        assert_eq!(err.kind, ValidationErrorKind::LimitExceeded);
    }

    #[test]
    fn nesting_depth_limit() {
        let registry = RuleRegistry::with_builtins();
        let config = EngineConfig {
            max_depth: 1,
            ..EngineConfig::default()
        };
        let description = requirements(json!({
            "outer": {
                "type": "array",
                "values": {
                    "inner": { "type": "array", "values": { "type": "int" } }
                }
            }
        }));
        let body = input(json!({ "outer": [ { "inner": [1] } ] }));

        let err = failure(validate(&registry, &config, &description, &body, None));
        assert_eq!(err.kind, ValidationErrorKind::LimitExceeded);
        assert_eq!(err.field, "inner");

        let config = EngineConfig::default();
        assert!(validate(&registry, &config, &description, &body, None).is_ok());
    }

    #[test]
    fn unknown_rule_is_a_configuration_error() {
        let result = run(
            json!({ "plant": { "type": "plant_code" } }),
            json!({ "plant": "MX-01" }),
        );
        assert_eq!(result, Err(EngineError::UnknownRule("plant_code".to_string())));

        let result = run(
            json!({ "xs": { "type": "array", "values": { "type": "zip" } } }),
            json!({ "xs": ["44100"] }),
        );
        assert_eq!(result, Err(EngineError::UnknownRule("zip".to_string())));
    }

    #[test]
    fn untyped_entry_invokes_rule_by_key() {
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&calls);
        let mut registry = RuleRegistry::with_builtins();
        registry.register("session_open", move |_ctx, name, value, _options| {
            seen.fetch_add(1, Ordering::SeqCst);
            assert_eq!(name, "session_open");
            assert!(value.is_none());
            Ok(())
        });

        let config = EngineConfig::default();
        let description = requirements(json!({ "session_open": {} }));
        validate(&registry, &config, &description, &Map::new(), None).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn absent_files_field_is_skipped_unless_strict() {
        let registry = RuleRegistry::with_builtins();
        let description = requirements(json!({
            "evidence": { "type": "files", "name": "evidence", "format": "document" }
        }));

        let lenient = EngineConfig::default();
        assert!(validate(&registry, &lenient, &description, &Map::new(), None).is_ok());

        let strict = EngineConfig {
            strict_files: true,
            ..EngineConfig::default()
        };
        let err = failure(validate(&registry, &strict, &description, &Map::new(), None));
        assert_eq!(err.kind, ValidationErrorKind::MissingFile);
        assert_eq!(err.field, "evidence");
    }

    #[test]
    fn present_typed_files_field_reads_side_channel_by_upload_name() {
        let dir = tempfile::tempdir().unwrap();
        let photo = dir.path().join("php4C1D");
        std::fs::write(&photo, b"%PDF-1.4\n").unwrap();

        let mut uploads = UploadedFiles::new();
        uploads.insert(
            "photos",
            FileUpload::Multiple(vec![UploadedFile::new(&photo, "crate.pdf")]),
        );

        let registry = RuleRegistry::with_builtins();
        let config = EngineConfig::default();
        let description = requirements(json!({
            "evidence": { "type": "files", "name": "photos", "format": "bitmap" }
        }));
        let body = input(json!({ "evidence": "ignored" }));

        let err = failure(validate(&registry, &config, &description, &body, Some(&uploads)));
        assert_eq!(err.kind, ValidationErrorKind::NotBitmap);
        assert_eq!(err.field, "photos");
        assert!(err.message.contains("crate.pdf"));

        let err = failure(validate(&registry, &config, &description, &body, None));
        assert_eq!(err.kind, ValidationErrorKind::MissingFile);
        assert_eq!(err.field, "photos");
    }

    #[test]
    fn untyped_files_entry_reads_side_channel() {
        let dir = tempfile::tempdir().unwrap();
        let report = dir.path().join("php9F2A");
        std::fs::write(&report, b"%PDF-1.5\n").unwrap();

        let mut uploads = UploadedFiles::new();
        uploads.insert(
            "report",
            FileUpload::Single(UploadedFile::new(&report, "weekly.pdf")),
        );

        let registry = RuleRegistry::with_builtins();
        let config = EngineConfig::default();
        let description = requirements(json!({
            "files": { "name": "report", "format": "document" }
        }));

        assert!(validate(&registry, &config, &description, &Map::new(), Some(&uploads)).is_ok());
        let err = failure(validate(&registry, &config, &description, &Map::new(), None));
        assert_eq!(err.kind, ValidationErrorKind::MissingFile);
    }

    #[test]
    fn repeated_validation_is_idempotent() {
        let registry = RuleRegistry::with_builtins();
        let config = EngineConfig::default();
        let description = requirements(json!({
            "a": { "type": "int" },
            "b": { "type": "bool" }
        }));
        let body = input(json!({ "a": 1, "b": "maybe" }));

        let first = validate(&registry, &config, &description, &body, None);
        for _ in 0..3 {
            assert_eq!(validate(&registry, &config, &description, &body, None), first);
        }
        assert_eq!(failure(first).field, "b");
    }
}
