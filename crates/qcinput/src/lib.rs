//! Declarative validation of client-supplied service input.
//!
//! qcinput checks decoded request bodies against per-endpoint requirements
//! descriptions before a service runs, reporting the first violation with a
//! stable numeric code.
//!
//! # Crate Structure
//!
//! - [`rules`]: the validation engine: predicates, built-in rules, rule
//!   registry, dispatcher, requirements loading and catalogs
//!
//! The `qcinput` binary (behind the `cli` feature) runs the engine over JSON
//! files from the command line.

/// Re-export engine types.
pub mod rules {
    pub use qcinput_rules::*;
}

pub use qcinput_rules::{
    validate, EngineConfig, EngineError, Envelope, Requirements, RequirementsCatalog,
    RuleRegistry, ValidationError, ValidationErrorKind,
};
