//! Built-in validation rules.
//!
//! Each rule wraps one or more predicates from [`crate::value`] and turns a
//! failed check into a [`ValidationError`] with a fixed kind.

use serde_json::{Map, Value};

use crate::dispatcher::{dispatch, ValidationContext};
use crate::error::{EngineError, Result, ValidationError, ValidationErrorKind};
use crate::files::{is_bitmap_file, is_document_file};
use crate::requirements::{
    ArrayValues, FieldOptions, FileFormat, FilesOptions, IntOptions, RuleOptions, StringOptions,
};
use crate::value;

/// The rules every registry starts with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BuiltinRule {
    Number,
    Int,
    Float,
    String,
    Email,
    Bool,
    DateTime,
    Array,
    Files,
    Phone,
}

impl BuiltinRule {
    pub const ALL: [BuiltinRule; 10] = [
        BuiltinRule::Number,
        BuiltinRule::Int,
        BuiltinRule::Float,
        BuiltinRule::String,
        BuiltinRule::Email,
        BuiltinRule::Bool,
        BuiltinRule::DateTime,
        BuiltinRule::Array,
        BuiltinRule::Files,
        BuiltinRule::Phone,
    ];

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|rule| rule.name() == name)
    }

    pub fn name(self) -> &'static str {
        match self {
            BuiltinRule::Number => "number",
            BuiltinRule::Int => "int",
            BuiltinRule::Float => "float",
            BuiltinRule::String => "string",
            BuiltinRule::Email => "email",
            BuiltinRule::Bool => "bool",
            BuiltinRule::DateTime => "datetime",
            BuiltinRule::Array => "array",
            BuiltinRule::Files => "files",
            BuiltinRule::Phone => "phone",
        }
    }

    /// Error kinds this rule can report.
    pub fn error_kinds(self) -> &'static [ValidationErrorKind] {
        use ValidationErrorKind::*;
        match self {
            BuiltinRule::Number => &[NotNumeric],
            BuiltinRule::Int => &[NotInteger, OutOfRange],
            BuiltinRule::Float => &[NotFloat],
            BuiltinRule::String => &[NotString, WrongLength, LengthOutOfRange],
            BuiltinRule::Email => &[NotEmail],
            BuiltinRule::Bool => &[NotBoolean],
            BuiltinRule::DateTime => &[NotDateTime],
            BuiltinRule::Array => &[NotArray, EmptyArray, LimitExceeded],
            BuiltinRule::Files => &[MissingFile, NotDocument, NotBitmap],
            BuiltinRule::Phone => &[NotPhoneNumber],
        }
    }

    /// Check one field. `value` is `None` for entries selected by rule name,
    /// which take everything they need from `options`.
    pub fn check(
        self,
        ctx: &ValidationContext<'_>,
        name: &str,
        value: Option<&Value>,
        options: &FieldOptions,
    ) -> Result<()> {
        let candidate = value.unwrap_or(&Value::Null);
        match self {
            BuiltinRule::Number => ensure(
                value::is_numeric(candidate),
                ValidationErrorKind::NotNumeric,
                name,
                || format!("Input argument '{name}' is not a numeric value"),
            ),
            BuiltinRule::Int => check_int(name, candidate, options),
            BuiltinRule::Float => ensure(
                value::is_float(candidate),
                ValidationErrorKind::NotFloat,
                name,
                || format!("Input argument '{name}' is not a floating-point value"),
            ),
            BuiltinRule::String => check_string(ctx, name, candidate, options),
            BuiltinRule::Email => ensure(
                value::is_email(candidate),
                ValidationErrorKind::NotEmail,
                name,
                || format!("Input argument '{name}' is not an email string"),
            ),
            BuiltinRule::Bool => ensure(
                value::is_boolean(candidate),
                ValidationErrorKind::NotBoolean,
                name,
                || format!("Input argument '{name}' is not a boolean value"),
            ),
            BuiltinRule::DateTime => check_date_time(name, candidate, options),
            BuiltinRule::Array => check_array(ctx, name, candidate, options),
            BuiltinRule::Files => check_files(ctx, name, options),
            BuiltinRule::Phone => ensure(
                value::is_phone_number(candidate),
                ValidationErrorKind::NotPhoneNumber,
                name,
                || format!("Input argument '{name}' is not a phone number"),
            ),
        }
    }
}

fn ensure(
    ok: bool,
    kind: ValidationErrorKind,
    name: &str,
    message: impl FnOnce() -> String,
) -> Result<()> {
    if ok {
        Ok(())
    } else {
        Err(fail(kind, name, message()))
    }
}

fn fail(kind: ValidationErrorKind, name: &str, message: String) -> EngineError {
    EngineError::Invalid(ValidationError::new(kind, name, message))
}

fn check_int(name: &str, candidate: &Value, options: &FieldOptions) -> Result<()> {
    if !value::is_integer(candidate) {
        return Err(fail(
            ValidationErrorKind::NotInteger,
            name,
            format!("Input argument '{name}' is not an integer value"),
        ));
    }

    let bounds = match &options.rule {
        RuleOptions::Int(int) => *int,
        _ => IntOptions::default(),
    };
    if bounds.has_bounds() {
        let (min, max) = bounds.bounds();
        return ensure(
            value::integer_is_between(candidate, min, max),
            ValidationErrorKind::OutOfRange,
            name,
            || format!("Input argument '{name}' is not within [{min}, {max}]"),
        );
    }
    Ok(())
}

fn check_string(
    ctx: &ValidationContext<'_>,
    name: &str,
    candidate: &Value,
    options: &FieldOptions,
) -> Result<()> {
    if !value::is_string(candidate) {
        return Err(fail(
            ValidationErrorKind::NotString,
            name,
            format!("Input argument '{name}' is not a string value"),
        ));
    }

    let unit = ctx.config().length_unit;
    let string = match &options.rule {
        RuleOptions::String(string) => *string,
        _ => StringOptions::default(),
    };
    if let Some(length) = string.length {
        return ensure(
            value::string_has_length(candidate, length, unit),
            ValidationErrorKind::WrongLength,
            name,
            || format!("Input argument '{name}' does not have a length of {length}"),
        );
    }

    let (min, max) = string.bounds();
    ensure(
        value::string_has_length_interval(candidate, min, max, unit),
        ValidationErrorKind::LengthOutOfRange,
        name,
        || format!("Input argument '{name}' does not have a length that is within [{min}, {max}]"),
    )
}

fn check_date_time(name: &str, candidate: &Value, options: &FieldOptions) -> Result<()> {
    let format = match &options.rule {
        RuleOptions::DateTime(date_time) => date_time.format.as_str(),
        _ => "",
    };
    ensure(
        !format.is_empty() && value::is_date_time(candidate, format),
        ValidationErrorKind::NotDateTime,
        name,
        || format!("Input argument '{name}' is not a date and/or time literal of the format '{format}'"),
    )
}

fn check_array(
    ctx: &ValidationContext<'_>,
    name: &str,
    candidate: &Value,
    options: &FieldOptions,
) -> Result<()> {
    let RuleOptions::Array(array) = &options.rule else {
        return Err(fail(
            ValidationErrorKind::NotArray,
            name,
            format!("Input argument '{name}' has no element description"),
        ));
    };

    let items: &[Value] = match candidate {
        Value::Array(items) => items,
        Value::Null => &[],
        _ => {
            return Err(fail(
                ValidationErrorKind::NotArray,
                name,
                format!("Input argument '{name}' is not an array"),
            ))
        }
    };

    let max_len = ctx.config().max_array_len;
    if items.len() > max_len {
        return Err(fail(
            ValidationErrorKind::LimitExceeded,
            name,
            format!("Input argument '{name}' has more than {max_len} elements"),
        ));
    }

    if items.is_empty() {
        if options.optional {
            return Ok(());
        }
        return Err(fail(
            ValidationErrorKind::EmptyArray,
            name,
            format!("Input argument {name} is an empty array"),
        ));
    }

    let Some(inner) = ctx.nested() else {
        let max_depth = ctx.config().max_depth;
        return Err(fail(
            ValidationErrorKind::LimitExceeded,
            name,
            format!("Input argument '{name}' is nested deeper than {max_depth} levels"),
        ));
    };

    match &array.values {
        ArrayValues::Elements(element) => {
            let rule = ctx.registry().resolve(&element.rule)?;
            for (index, item) in items.iter().enumerate() {
                rule.check(&inner, &format!("{name}[{index}]"), Some(item), &element.options)?;
            }
        }
        ArrayValues::Records(nested) => {
            let empty = Map::new();
            for item in items {
                let record = item.as_object().unwrap_or(&empty);
                dispatch(&inner, nested, record)?;
            }
        }
    }
    Ok(())
}

fn check_files(ctx: &ValidationContext<'_>, field: &str, options: &FieldOptions) -> Result<()> {
    let RuleOptions::Files(FilesOptions { name, format }) = &options.rule else {
        return Err(fail(
            ValidationErrorKind::MissingFile,
            field,
            format!("File field '{field}' has no upload name"),
        ));
    };

    let upload = ctx
        .files()
        .and_then(|files| files.lookup(name))
        .filter(|upload| !upload.files().is_empty());

    let Some(upload) = upload else {
        if options.optional {
            return Ok(());
        }
        return Err(fail(
            ValidationErrorKind::MissingFile,
            name,
            format!("File '{name}' is undefined"),
        ));
    };

    let Some(format) = format else {
        return Ok(());
    };
    let max_bytes = ctx.config().max_sniff_bytes;
    for file in upload.files() {
        let (matches, kind) = match format {
            FileFormat::Document => (
                is_document_file(&file.tmp_path, max_bytes),
                ValidationErrorKind::NotDocument,
            ),
            FileFormat::Bitmap => (
                is_bitmap_file(&file.tmp_path, max_bytes),
                ValidationErrorKind::NotBitmap,
            ),
        };
        if !matches {
            return Err(fail(
                kind,
                name,
                format!(
                    "The file '{}' is not a {} file",
                    file.name,
                    format.as_str()
                ),
            ));
        }
    }
    Ok(())
}
