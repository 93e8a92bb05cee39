use axum::{http::StatusCode, Json};
use serde_json::json;
use validator::ValidationErrors;

pub fn into_response(errors: ValidationErrors) -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({
            "error": "Invalid request body",
            "errors": errors
        })),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use validator::Validate;

    #[derive(Validate)]
    struct NamedPayload {
        #[validate(length(min = 1))]
        name: String,
    }

    #[test]
    fn failed_validation_maps_to_a_400_with_per_field_errors() {
        let errors = NamedPayload {
            name: String::new(),
        }
        .validate()
        .unwrap_err();

        let (status, Json(body)) = into_response(errors);
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Invalid request body");
        assert!(body["errors"]["name"].is_array());
    }
}
