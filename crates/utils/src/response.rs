use serde::{Deserialize, Serialize};

/// Standard response envelope for every API endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_data: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error_data: None,
            message: None,
        }
    }

    /// Success with a user-visible notice, e.g. a non-fatal notification
    /// delivery warning attached to an otherwise successful save.
    pub fn success_with_message(data: T, message: impl Into<String>) -> Self {
        Self {
            success: true,
            data: Some(data),
            error_data: None,
            message: Some(message.into()),
        }
    }

    pub fn error(message: &str) -> Self {
        Self {
            success: false,
            data: None,
            error_data: None,
            message: Some(message.to_string()),
        }
    }

    /// Error carrying structured detail, e.g. a field -> messages map from
    /// form validation.
    pub fn error_with_data(message: &str, error_data: serde_json::Value) -> Self {
        Self {
            success: false,
            data: None,
            error_data: Some(error_data),
            message: Some(message.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_envelope_omits_error_fields() {
        let response = ApiResponse::success(42);
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["success"], true);
        assert_eq!(json["data"], 42);
        assert!(json.get("error_data").is_none());
        assert!(json.get("message").is_none());
    }

    #[test]
    fn error_envelope_carries_message_and_data() {
        let detail = serde_json::json!({"urgency": ["must be between 1 and 5"]});
        let response = ApiResponse::<()>::error_with_data("Validation failed", detail.clone());
        assert!(!response.success);
        assert_eq!(response.error_data, Some(detail));
        assert_eq!(response.message.as_deref(), Some("Validation failed"));
    }
}
