//! Typed requirements descriptions.
//!
//! A description is authored as a JSON object mapping field keys to option
//! objects, in the order fields must be checked:
//!
//! ```json
//! {
//!   "product_id": { "type": "int", "min": 1 },
//!   "comment":    { "type": "string", "max_length": 140, "optional": true },
//!   "files":      { "name": "evidence", "format": "bitmap" }
//! }
//! ```
//!
//! When an options object has a `type`, that names the rule and the key names
//! the input field. Without a `type` the key itself is the rule name and no
//! input value is looked up.
//!
//! Options are checked once at load time: first against a JSON meta-schema,
//! then per rule while building [`RuleOptions`].

use jsonschema::Validator;
use once_cell::sync::Lazy;
use serde_json::{Map, Value};

use crate::error::RequirementsError;
use crate::rules::BuiltinRule;

const META_SCHEMA: &str = r##"{
    "$schema": "https://json-schema.org/draft/2020-12/schema",
    "$ref": "#/$defs/description",
    "$defs": {
        "description": {
            "type": "object",
            "additionalProperties": { "$ref": "#/$defs/field" }
        },
        "field": {
            "type": "object",
            "properties": {
                "type": { "type": "string", "minLength": 1 },
                "optional": { "type": "boolean" },
                "min": { "type": "integer" },
                "max": { "type": "integer" },
                "length": { "type": "integer", "minimum": 0 },
                "min_length": { "type": "integer", "minimum": 0 },
                "max_length": { "type": "integer", "minimum": 0 },
                "format": { "type": "string" },
                "name": { "type": "string" },
                "values": {
                    "anyOf": [
                        { "$ref": "#/$defs/field" },
                        { "$ref": "#/$defs/description" }
                    ]
                }
            }
        }
    }
}"##;

static META_VALIDATOR: Lazy<Validator> = Lazy::new(|| {
    let schema: Value = serde_json::from_str(META_SCHEMA).expect("meta-schema is valid JSON");
    jsonschema::validator_for(&schema).expect("meta-schema compiles")
});

/// An ordered list of field requirements for one service endpoint.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Requirements {
    fields: Vec<FieldSpec>,
}

/// One entry of a requirements description.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSpec {
    /// The description key: an input field name for typed entries, the rule
    /// name otherwise.
    pub key: String,
    /// The rule applied to this entry.
    pub rule: String,
    /// Whether the rule was selected by a `type` option.
    pub typed: bool,
    pub options: FieldOptions,
}

/// Options common to every rule plus the rule-specific part.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldOptions {
    pub optional: bool,
    pub rule: RuleOptions,
    raw: Map<String, Value>,
}

impl FieldOptions {
    /// The options object exactly as authored. Custom rules read their
    /// settings from here.
    pub fn raw(&self) -> &Map<String, Value> {
        &self.raw
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.raw.get(key)
    }
}

/// Rule-specific options, checked when the description is loaded.
#[derive(Debug, Clone, PartialEq)]
pub enum RuleOptions {
    Number,
    Int(IntOptions),
    Float,
    String(StringOptions),
    Email,
    Bool,
    DateTime(DateTimeOptions),
    Array(ArrayOptions),
    Files(FilesOptions),
    Phone,
    /// A rule that is not built in; resolved against the registry at
    /// dispatch time.
    Custom,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct IntOptions {
    pub min: Option<i64>,
    pub max: Option<i64>,
}

impl IntOptions {
    pub fn has_bounds(&self) -> bool {
        self.min.is_some() || self.max.is_some()
    }

    pub fn bounds(&self) -> (i64, i64) {
        (self.min.unwrap_or(i64::MIN), self.max.unwrap_or(i64::MAX))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StringOptions {
    pub length: Option<usize>,
    pub min_length: Option<usize>,
    pub max_length: Option<usize>,
}

impl StringOptions {
    pub fn bounds(&self) -> (usize, usize) {
        (
            self.min_length.unwrap_or(0),
            self.max_length.unwrap_or(usize::MAX),
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateTimeOptions {
    /// A `strftime` pattern such as `%Y-%m-%d`.
    pub format: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ArrayOptions {
    pub values: ArrayValues,
}

/// What the elements of an array field must look like.
#[derive(Debug, Clone, PartialEq)]
pub enum ArrayValues {
    /// Every element is checked with one rule.
    Elements(Box<FieldSpec>),
    /// Every element is a record checked against a nested description.
    Records(Requirements),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilesOptions {
    /// The upload field name looked up in the file side channel.
    pub name: String,
    pub format: Option<FileFormat>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    Document,
    Bitmap,
}

impl FileFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            FileFormat::Document => "document",
            FileFormat::Bitmap => "bitmap",
        }
    }
}

impl Requirements {
    /// Parse a description from JSON text.
    pub fn from_json_str(json: &str) -> Result<Self, RequirementsError> {
        let value: Value = serde_json::from_str(json)?;
        Self::from_value(&value)
    }

    /// Parse a description from a JSON value.
    pub fn from_value(value: &Value) -> Result<Self, RequirementsError> {
        check_meta_schema(value)?;
        match value {
            Value::Object(map) => parse_description(map),
            _ => Err(RequirementsError::Malformed(
                "description must be an object".to_string(),
            )),
        }
    }

    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    pub fn iter(&self) -> std::slice::Iter<'_, FieldSpec> {
        self.fields.iter()
    }

    pub fn get(&self, key: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|field| field.key == key)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl<'a> IntoIterator for &'a Requirements {
    type Item = &'a FieldSpec;
    type IntoIter = std::slice::Iter<'a, FieldSpec>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.iter()
    }
}

fn check_meta_schema(value: &Value) -> Result<(), RequirementsError> {
    let mut errors = META_VALIDATOR.iter_errors(value);
    if let Some(first) = errors.next() {
        let mut message = first.to_string();
        for err in errors.take(3) {
            message.push_str("; ");
            message.push_str(&err.to_string());
        }
        return Err(RequirementsError::Malformed(message));
    }
    Ok(())
}

fn parse_description(map: &Map<String, Value>) -> Result<Requirements, RequirementsError> {
    let fields = map
        .iter()
        .map(|(key, options)| parse_field(key, options))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Requirements { fields })
}

fn parse_field(key: &str, options: &Value) -> Result<FieldSpec, RequirementsError> {
    let Value::Object(raw) = options else {
        return Err(invalid(key, "options must be an object"));
    };

    let declared_type = raw.get("type").and_then(Value::as_str);
    let typed = declared_type.is_some();
    let rule = declared_type.unwrap_or(key).to_string();
    let optional = raw.get("optional").and_then(Value::as_bool).unwrap_or(false);

    let rule_options = match BuiltinRule::from_name(&rule) {
        Some(builtin) => parse_rule_options(key, builtin, raw)?,
        None => RuleOptions::Custom,
    };

    Ok(FieldSpec {
        key: key.to_string(),
        rule,
        typed,
        options: FieldOptions {
            optional,
            rule: rule_options,
            raw: raw.clone(),
        },
    })
}

fn parse_rule_options(
    key: &str,
    rule: BuiltinRule,
    raw: &Map<String, Value>,
) -> Result<RuleOptions, RequirementsError> {
    let options = match rule {
        BuiltinRule::Number => RuleOptions::Number,
        BuiltinRule::Float => RuleOptions::Float,
        BuiltinRule::Email => RuleOptions::Email,
        BuiltinRule::Bool => RuleOptions::Bool,
        BuiltinRule::Phone => RuleOptions::Phone,
        BuiltinRule::Int => {
            let options = IntOptions {
                min: int_option(key, raw, "min")?,
                max: int_option(key, raw, "max")?,
            };
            if let (Some(min), Some(max)) = (options.min, options.max) {
                if min > max {
                    return Err(invalid(key, format!("min {min} exceeds max {max}")));
                }
            }
            RuleOptions::Int(options)
        }
        BuiltinRule::String => {
            let options = StringOptions {
                length: length_option(key, raw, "length")?,
                min_length: length_option(key, raw, "min_length")?,
                max_length: length_option(key, raw, "max_length")?,
            };
            let (min, max) = options.bounds();
            if min > max {
                return Err(invalid(
                    key,
                    format!("min_length {min} exceeds max_length {max}"),
                ));
            }
            RuleOptions::String(options)
        }
        BuiltinRule::DateTime => match raw.get("format").and_then(Value::as_str) {
            Some(format) if !format.is_empty() => RuleOptions::DateTime(DateTimeOptions {
                format: format.to_string(),
            }),
            _ => return Err(invalid(key, "datetime rule requires a format")),
        },
        BuiltinRule::Array => {
            let Some(Value::Object(values)) = raw.get("values") else {
                return Err(invalid(key, "array rule requires a values object"));
            };
            let values = if values.get("type").is_some_and(Value::is_string) {
                ArrayValues::Elements(Box::new(parse_field(key, &Value::Object(values.clone()))?))
            } else {
                ArrayValues::Records(parse_description(values)?)
            };
            RuleOptions::Array(ArrayOptions { values })
        }
        BuiltinRule::Files => {
            let name = match raw.get("name").and_then(Value::as_str) {
                Some(name) if !name.is_empty() => name.to_string(),
                _ => return Err(invalid(key, "files rule requires an upload name")),
            };
            let format = match raw.get("format").and_then(Value::as_str) {
                None => None,
                Some("document") => Some(FileFormat::Document),
                Some("bitmap") => Some(FileFormat::Bitmap),
                Some(other) => {
                    return Err(invalid(key, format!("unsupported file format '{other}'")))
                }
            };
            RuleOptions::Files(FilesOptions { name, format })
        }
    };
    Ok(options)
}

fn int_option(
    key: &str,
    raw: &Map<String, Value>,
    option: &str,
) -> Result<Option<i64>, RequirementsError> {
    match raw.get(option) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => value
            .as_i64()
            .map(Some)
            .ok_or_else(|| invalid(key, format!("{option} must be a 64-bit integer"))),
    }
}

fn length_option(
    key: &str,
    raw: &Map<String, Value>,
    option: &str,
) -> Result<Option<usize>, RequirementsError> {
    match raw.get(option) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => value
            .as_u64()
            .and_then(|n| usize::try_from(n).ok())
            .map(Some)
            .ok_or_else(|| invalid(key, format!("{option} must be a non-negative integer"))),
    }
}

fn invalid(field: &str, reason: impl Into<String>) -> RequirementsError {
    RequirementsError::InvalidOptions {
        field: field.to_string(),
        reason: reason.into(),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn declared_order_is_preserved() {
        let requirements = Requirements::from_json_str(
            r#"{
                "zeta": { "type": "int" },
                "alpha": { "type": "string" },
                "mid": { "type": "bool" }
            }"#,
        )
        .unwrap();

        let keys: Vec<&str> = requirements.iter().map(|f| f.key.as_str()).collect();
        assert_eq!(keys, vec!["zeta", "alpha", "mid"]);
    }

    #[test]
    fn typed_and_untyped_entries() {
        let requirements = Requirements::from_value(&json!({
            "lot": { "type": "int", "min": 1, "max": 99 },
            "files": { "name": "evidence", "format": "document", "optional": true }
        }))
        .unwrap();

        let lot = requirements.get("lot").unwrap();
        assert!(lot.typed);
        assert_eq!(lot.rule, "int");
        assert!(!lot.options.optional);
        assert_eq!(
            lot.options.rule,
            RuleOptions::Int(IntOptions {
                min: Some(1),
                max: Some(99)
            })
        );

        let files = requirements.get("files").unwrap();
        assert!(!files.typed);
        assert_eq!(files.rule, "files");
        assert!(files.options.optional);
        assert_eq!(
            files.options.rule,
            RuleOptions::Files(FilesOptions {
                name: "evidence".to_string(),
                format: Some(FileFormat::Document)
            })
        );
    }

    #[test]
    fn array_values_select_elements_or_records() {
        let requirements = Requirements::from_value(&json!({
            "scores": { "type": "array", "values": { "type": "number" } },
            "rows": {
                "type": "array",
                "values": {
                    "category": { "type": "string" },
                    "count": { "type": "int", "min": 0 }
                }
            }
        }))
        .unwrap();

        match &requirements.get("scores").unwrap().options.rule {
            RuleOptions::Array(ArrayOptions {
                values: ArrayValues::Elements(element),
            }) => assert_eq!(element.rule, "number"),
            other => panic!("unexpected options: {other:?}"),
        }
        match &requirements.get("rows").unwrap().options.rule {
            RuleOptions::Array(ArrayOptions {
                values: ArrayValues::Records(nested),
            }) => assert_eq!(nested.len(), 2),
            other => panic!("unexpected options: {other:?}"),
        }
    }

    #[test]
    fn record_field_named_type_is_not_an_element_rule() {
        let requirements = Requirements::from_value(&json!({
            "defects": {
                "type": "array",
                "values": { "type": { "type": "string" } }
            }
        }))
        .unwrap();

        assert!(matches!(
            requirements.get("defects").unwrap().options.rule,
            RuleOptions::Array(ArrayOptions {
                values: ArrayValues::Records(_)
            })
        ));
    }

    #[test]
    fn unknown_rules_parse_as_custom() {
        let requirements = Requirements::from_value(&json!({
            "plant": { "type": "plant_code", "prefix": "MX" }
        }))
        .unwrap();

        let plant = requirements.get("plant").unwrap();
        assert_eq!(plant.options.rule, RuleOptions::Custom);
        assert_eq!(plant.options.get("prefix"), Some(&json!("MX")));
    }

    #[test]
    fn meta_schema_rejects_badly_typed_options() {
        for bad in [
            json!([]),
            json!({ "x": 5 }),
            json!({ "x": { "type": "int", "min": "1" } }),
            json!({ "x": { "type": "string", "length": -1 } }),
            json!({ "x": { "type": "bool", "optional": "yes" } }),
        ] {
            assert!(
                matches!(
                    Requirements::from_value(&bad),
                    Err(RequirementsError::Malformed(_))
                ),
                "{bad} should be rejected"
            );
        }
    }

    #[test]
    fn rule_specific_options_are_checked() {
        for bad in [
            json!({ "when": { "type": "datetime" } }),
            json!({ "list": { "type": "array" } }),
            json!({ "list": { "type": "array", "values": { "y": 3 } } }),
            json!({ "files": { "format": "document" } }),
            json!({ "files": { "name": "a", "format": "spreadsheet" } }),
            json!({ "n": { "type": "int", "min": 10, "max": 1 } }),
            json!({ "s": { "type": "string", "min_length": 5, "max_length": 2 } }),
        ] {
            assert!(
                matches!(
                    Requirements::from_value(&bad),
                    Err(RequirementsError::InvalidOptions { .. })
                ),
                "{bad} should be rejected"
            );
        }
    }

    #[test]
    fn invalid_json_is_reported() {
        assert!(matches!(
            Requirements::from_json_str("{not json"),
            Err(RequirementsError::InvalidJson(_))
        ));
    }
}
