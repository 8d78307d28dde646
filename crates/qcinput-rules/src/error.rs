use std::fmt;

/// Return code reported for configuration errors (unknown rules).
pub const CONFIGURATION_ERROR_CODE: u16 = 100;

/// The kind of constraint a client-supplied value violated.
///
/// Every kind has a stable numeric code so clients can look up a localized
/// message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValidationErrorKind {
    MissingArgument,
    NotNumeric,
    OutOfRange,
    NotInteger,
    NotFloat,
    WrongLength,
    LengthOutOfRange,
    NotString,
    NotEmail,
    NotBoolean,
    NotDateTime,
    EmptyArray,
    NotDocument,
    NotBitmap,
    MissingFile,
    NotPhoneNumber,
    NotArray,
    LimitExceeded,
}

impl ValidationErrorKind {
    pub fn code(self) -> u16 {
        match self {
            ValidationErrorKind::MissingArgument => 101,
            ValidationErrorKind::NotNumeric => 102,
            ValidationErrorKind::OutOfRange => 103,
            ValidationErrorKind::NotInteger => 104,
            ValidationErrorKind::NotFloat => 105,
            ValidationErrorKind::WrongLength => 106,
            ValidationErrorKind::LengthOutOfRange => 107,
            ValidationErrorKind::NotString => 108,
            ValidationErrorKind::NotEmail => 109,
            ValidationErrorKind::NotBoolean => 110,
            ValidationErrorKind::NotDateTime => 111,
            ValidationErrorKind::EmptyArray => 112,
            ValidationErrorKind::NotDocument => 113,
            ValidationErrorKind::NotBitmap => 114,
            ValidationErrorKind::MissingFile => 115,
            ValidationErrorKind::NotPhoneNumber => 116,
            ValidationErrorKind::NotArray => 117,
            ValidationErrorKind::LimitExceeded => 118,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ValidationErrorKind::MissingArgument => "missing_argument",
            ValidationErrorKind::NotNumeric => "not_numeric",
            ValidationErrorKind::OutOfRange => "out_of_range",
            ValidationErrorKind::NotInteger => "not_integer",
            ValidationErrorKind::NotFloat => "not_float",
            ValidationErrorKind::WrongLength => "wrong_length",
            ValidationErrorKind::LengthOutOfRange => "length_out_of_range",
            ValidationErrorKind::NotString => "not_string",
            ValidationErrorKind::NotEmail => "not_email",
            ValidationErrorKind::NotBoolean => "not_boolean",
            ValidationErrorKind::NotDateTime => "not_datetime",
            ValidationErrorKind::EmptyArray => "empty_array",
            ValidationErrorKind::NotDocument => "not_document",
            ValidationErrorKind::NotBitmap => "not_bitmap",
            ValidationErrorKind::MissingFile => "missing_file",
            ValidationErrorKind::NotPhoneNumber => "not_phone_number",
            ValidationErrorKind::NotArray => "not_array",
            ValidationErrorKind::LimitExceeded => "limit_exceeded",
        }
    }
}

impl fmt::Display for ValidationErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The first constraint violation found in a client-supplied input.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct ValidationError {
    pub kind: ValidationErrorKind,
    pub field: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(
        kind: ValidationErrorKind,
        field: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn code(&self) -> u16 {
        self.kind.code()
    }
}

/// Errors returned by the dispatcher.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EngineError {
    /// Client input failed a declared constraint.
    #[error(transparent)]
    Invalid(#[from] ValidationError),

    /// A requirements description names a rule that was never registered.
    #[error("validation rule '{0}' is not registered")]
    UnknownRule(String),
}

impl EngineError {
    /// True when the client caused the failure and may correct and resubmit.
    pub fn is_client_error(&self) -> bool {
        matches!(self, EngineError::Invalid(_))
    }

    pub fn code(&self) -> u16 {
        match self {
            EngineError::Invalid(err) => err.code(),
            EngineError::UnknownRule(_) => CONFIGURATION_ERROR_CODE,
        }
    }

    pub fn validation(&self) -> Option<&ValidationError> {
        match self {
            EngineError::Invalid(err) => Some(err),
            EngineError::UnknownRule(_) => None,
        }
    }
}

/// Errors found while loading a requirements description.
#[derive(Debug, thiserror::Error)]
pub enum RequirementsError {
    /// The description is not valid JSON.
    #[error("requirements description is not valid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    /// The description does not match the requirements meta-schema.
    #[error("requirements description is malformed: {0}")]
    Malformed(String),

    /// A field's options are inconsistent with its rule.
    #[error("invalid options for field '{field}': {reason}")]
    InvalidOptions { field: String, reason: String },
}

/// Errors found while building a requirements catalog.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    /// A description file could not be read.
    #[error("failed to load requirements: {0}")]
    LoadFailed(String),

    /// A description failed to parse.
    #[error("requirements for endpoint '{endpoint}' are invalid: {source}")]
    Requirements {
        endpoint: String,
        #[source]
        source: RequirementsError,
    },

    /// No description registered for the given endpoint.
    #[error("no requirements registered for endpoint '{0}'")]
    UnknownEndpoint(String),
}

pub type Result<T> = std::result::Result<T, EngineError>;
