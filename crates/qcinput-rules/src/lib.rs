//! Declarative validation of client-supplied service input.
//!
//! Each service endpoint declares a requirements description: an ordered
//! map from field to rule and constraints. The dispatcher walks that
//! description against the decoded request, resolves every rule through a
//! [`RuleRegistry`], and reports the first violation as a typed
//! [`ValidationError`] with a stable numeric code.
//!
//! ```
//! use qcinput_rules::{validate, EngineConfig, Requirements, RuleRegistry};
//! use serde_json::json;
//!
//! let registry = RuleRegistry::with_builtins();
//! let requirements = Requirements::from_value(&json!({
//!     "lot": { "type": "int", "min": 1 },
//!     "inspector": { "type": "email", "optional": true }
//! }))
//! .unwrap();
//! let input = json!({ "lot": 0 });
//!
//! let err = validate(
//!     &registry,
//!     &EngineConfig::default(),
//!     &requirements,
//!     input.as_object().unwrap(),
//!     None,
//! )
//! .unwrap_err();
//! assert_eq!(err.code(), 103);
//! ```

pub mod catalog;
pub mod config;
pub mod dispatcher;
pub mod envelope;
pub mod error;
pub mod files;
pub mod registry;
pub mod requirements;
pub mod rules;
pub mod value;

pub use catalog::RequirementsCatalog;
pub use config::{CatalogConfig, EngineConfig, LengthUnit};
pub use dispatcher::{dispatch, validate, ValidationContext};
pub use envelope::Envelope;
pub use error::{
    CatalogError, EngineError, RequirementsError, Result, ValidationError, ValidationErrorKind,
    CONFIGURATION_ERROR_CODE,
};
pub use files::{FileKind, FileSource, FileUpload, UploadedFile, UploadedFiles};
pub use registry::{Rule, RuleFn, RuleRegistry};
pub use requirements::{FieldOptions, FieldSpec, Requirements, RuleOptions};
pub use rules::BuiltinRule;
