use serde_json::Value;

use crate::database::entities::scores;
use crate::errors::{CoreError, CoreResult, IapError};

const MAX_NAME_LENGTH: usize = 255;
const MAX_URL_LENGTH: usize = 2048;

/// Input checks shared by the resource services
pub struct ValidationService;

impl ValidationService {
    /// Trim and check a resource name; `what` is used in the error message.
    pub fn validate_name(what: &str, name: &str) -> CoreResult<String> {
        let trimmed = name.trim();

        if trimmed.is_empty() {
            return Err(CoreError::validation(format!("{} name is required", what)));
        }

        if trimmed.chars().count() > MAX_NAME_LENGTH {
            return Err(CoreError::validation(format!(
                "{} name is too long (max {} characters)",
                what, MAX_NAME_LENGTH
            )));
        }

        Ok(trimmed.to_string())
    }

    /// Properties must be a JSON object; a missing value becomes `{}`.
    pub fn validate_properties(properties: Option<Value>) -> CoreResult<Value> {
        match properties {
            None | Some(Value::Null) => Ok(Value::Object(Default::default())),
            Some(value @ Value::Object(_)) => Ok(value),
            Some(_) => Err(CoreError::validation("Properties must be a JSON object")),
        }
    }

    /// Blank optional strings are stored as NULL.
    pub fn normalize_optional(value: Option<String>) -> Option<String> {
        value
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    pub fn validate_url(field: &str, url: &str) -> CoreResult<String> {
        let trimmed = url.trim();

        if trimmed.is_empty() {
            return Err(CoreError::validation(format!("{} is required", field)));
        }

        if trimmed.len() > MAX_URL_LENGTH {
            return Err(CoreError::validation(format!("{} is too long", field)));
        }

        if trimmed.chars().any(char::is_whitespace) {
            return Err(CoreError::validation(format!(
                "{} must not contain whitespace",
                field
            )));
        }

        Ok(trimmed.to_string())
    }

    pub fn validate_score(score: i32) -> Result<i32, IapError> {
        if scores::is_valid_score(score) {
            Ok(score)
        } else {
            Err(IapError::ScoreOutOfRange(score))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::CoreErrorKind;
    use serde_json::json;

    #[test]
    fn test_name_is_trimmed_and_required() {
        assert_eq!(
            ValidationService::validate_name("Activity", "  Quiz 1 ").unwrap(),
            "Quiz 1"
        );

        let err = ValidationService::validate_name("Activity", "   ").unwrap_err();
        assert_eq!(err.kind(), CoreErrorKind::Validation);
        assert_eq!(err.message(), "Activity name is required");

        assert!(ValidationService::validate_name("IAP", &"x".repeat(256)).is_err());
    }

    #[test]
    fn test_properties_default_to_empty_object() {
        assert_eq!(ValidationService::validate_properties(None).unwrap(), json!({}));
        assert_eq!(
            ValidationService::validate_properties(Some(json!({"lang": "pt"}))).unwrap(),
            json!({"lang": "pt"})
        );
        assert!(ValidationService::validate_properties(Some(json!([1, 2]))).is_err());
    }

    #[test]
    fn test_optional_strings_are_normalized() {
        assert_eq!(ValidationService::normalize_optional(Some("  ".into())), None);
        assert_eq!(
            ValidationService::normalize_optional(Some(" http://a/b ".into())),
            Some("http://a/b".to_string())
        );
        assert_eq!(ValidationService::normalize_optional(None), None);
    }

    #[test]
    fn test_url_validation() {
        assert!(ValidationService::validate_url("deploy_url", "https://lms.example/iap/1").is_ok());
        assert!(ValidationService::validate_url("deploy_url", "").is_err());
        assert!(ValidationService::validate_url("deploy_url", "http://a b").is_err());
    }

    #[test]
    fn test_score_bounds() {
        assert_eq!(ValidationService::validate_score(0).unwrap(), 0);
        assert_eq!(ValidationService::validate_score(100).unwrap(), 100);
        assert!(matches!(
            ValidationService::validate_score(101),
            Err(IapError::ScoreOutOfRange(101))
        ));
        assert!(ValidationService::validate_score(-1).is_err());
    }
}
