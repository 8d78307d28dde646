//! Response envelope shared by every service answer.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::EngineError;

pub const SUCCESS_CODE: u16 = 0;
pub const SUCCESS_MESSAGE: &str = "Success";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Meta {
    pub return_code: u16,
    pub message: String,
}

/// `{ "meta": { "return_code", "message" }, "data" }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub meta: Meta,
    pub data: Value,
}

impl Envelope {
    pub fn success(data: Value) -> Self {
        Self {
            meta: Meta {
                return_code: SUCCESS_CODE,
                message: SUCCESS_MESSAGE.to_string(),
            },
            data,
        }
    }

    pub fn failure(return_code: u16, message: impl Into<String>) -> Self {
        Self {
            meta: Meta {
                return_code,
                message: message.into(),
            },
            data: Value::Array(Vec::new()),
        }
    }

    pub fn from_error(err: &EngineError) -> Self {
        Self::failure(err.code(), err.to_string())
    }

    pub fn is_success(&self) -> bool {
        self.meta.return_code == SUCCESS_CODE
    }
}

impl From<&EngineError> for Envelope {
    fn from(err: &EngineError) -> Self {
        Self::from_error(err)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::error::{ValidationError, ValidationErrorKind};

    #[test]
    fn success_envelope_shape() {
        let envelope = Envelope::success(json!({ "id": 4 }));
        assert!(envelope.is_success());
        assert_eq!(
            serde_json::to_value(&envelope).unwrap(),
            json!({
                "meta": { "return_code": 0, "message": "Success" },
                "data": { "id": 4 }
            })
        );
    }

    #[test]
    fn error_envelope_carries_code_and_message() {
        let err = EngineError::Invalid(ValidationError::new(
            ValidationErrorKind::EmptyArray,
            "rows",
            "Input argument rows is an empty array",
        ));
        let envelope = Envelope::from(&err);
        assert!(!envelope.is_success());
        assert_eq!(envelope.meta.return_code, 112);
        assert_eq!(envelope.meta.message, "Input argument rows is an empty array");
        assert_eq!(envelope.data, json!([]));

        let envelope = Envelope::from_error(&EngineError::UnknownRule("zip".to_string()));
        assert_eq!(envelope.meta.return_code, 100);
    }
}
