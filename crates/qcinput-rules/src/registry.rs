use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::dispatcher::ValidationContext;
use crate::error::{EngineError, Result, ValidationError};
use crate::requirements::FieldOptions;
use crate::rules::BuiltinRule;

/// Signature of a caller-defined rule.
///
/// Receives the context, the field name to report, the field value (`None`
/// for entries selected by rule name) and the field options.
pub type RuleFn = dyn Fn(&ValidationContext<'_>, &str, Option<&Value>, &FieldOptions) -> std::result::Result<(), ValidationError>
    + Send
    + Sync;

/// A resolved rule.
#[derive(Clone)]
pub enum Rule {
    Builtin(BuiltinRule),
    Custom(Arc<RuleFn>),
}

impl Rule {
    pub fn check(
        &self,
        ctx: &ValidationContext<'_>,
        name: &str,
        value: Option<&Value>,
        options: &FieldOptions,
    ) -> Result<()> {
        match self {
            Rule::Builtin(rule) => rule.check(ctx, name, value, options),
            Rule::Custom(rule) => rule(ctx, name, value, options).map_err(EngineError::Invalid),
        }
    }

    pub fn is_builtin(&self) -> bool {
        matches!(self, Rule::Builtin(_))
    }
}

impl fmt::Debug for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rule::Builtin(rule) => f.debug_tuple("Builtin").field(rule).finish(),
            Rule::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

/// Name-keyed registry of validation rules.
///
/// Build it once at startup, register any custom rules, then share it by
/// reference with every request. Lookups take `&self`; registration needs
/// `&mut self`, so a registry shared across threads after startup must sit
/// behind a `RwLock`.
#[derive(Clone, Default)]
pub struct RuleRegistry {
    rules: HashMap<String, Rule>,
}

impl RuleRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry holding every built-in rule.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        for rule in BuiltinRule::ALL {
            registry
                .rules
                .insert(rule.name().to_string(), Rule::Builtin(rule));
        }
        registry
    }

    /// Register a custom rule. An existing rule with the same name, built-in
    /// or not, is replaced.
    pub fn register<F>(&mut self, name: impl Into<String>, rule: F)
    where
        F: Fn(&ValidationContext<'_>, &str, Option<&Value>, &FieldOptions) -> std::result::Result<(), ValidationError>
            + Send
            + Sync
            + 'static,
    {
        let name = name.into();
        if self.rules.contains_key(&name) {
            tracing::debug!(rule = %name, "replacing registered rule");
        }
        self.rules.insert(name, Rule::Custom(Arc::new(rule)));
    }

    /// Look up a rule by name.
    pub fn resolve(&self, name: &str) -> Result<&Rule> {
        self.rules.get(name).ok_or_else(|| {
            tracing::error!(rule = %name, "requirements reference an unregistered rule");
            EngineError::UnknownRule(name.to_string())
        })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.rules.contains_key(name)
    }

    /// Registered rule names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.rules.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl fmt::Debug for RuleRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuleRegistry")
            .field("rules", &self.names())
            .finish()
    }
}
