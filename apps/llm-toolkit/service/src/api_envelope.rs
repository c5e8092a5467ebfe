use std::collections::HashMap;

use axum::Json;
use axum::http::header::WWW_AUTHENTICATE;
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiErrorCode {
    InvalidRequest,
    Unauthorized,
    NotFound,
    Conflict,
    InvalidState,
    InternalError,
}

impl ApiErrorCode {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::InvalidRequest => "invalid_request",
            Self::Unauthorized => "unauthorized",
            Self::NotFound => "not_found",
            Self::Conflict => "conflict",
            Self::InvalidState => "invalid_state",
            Self::InternalError => "internal_error",
        }
    }

    pub const fn default_status(self) -> StatusCode {
        match self {
            Self::InvalidRequest => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Conflict => StatusCode::CONFLICT,
            Self::InvalidState => StatusCode::BAD_REQUEST,
            Self::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ApiErrorResponse {
    pub success: bool,
    pub error: String,
    pub code: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<HashMap<String, Vec<String>>>,
}

/// Failure half of every handler result. Renders the `{success: false}` envelope
/// and attaches a bearer challenge to 401 responses.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub body: ApiErrorResponse,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let challenge = self.status == StatusCode::UNAUTHORIZED;
        let mut response = (self.status, Json(self.body)).into_response();
        if challenge {
            response
                .headers_mut()
                .insert(WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
        }
        response
    }
}

#[derive(Debug, Serialize)]
pub struct ApiDataEnvelope<T> {
    pub success: bool,
    pub data: T,
}

#[derive(Debug, Serialize)]
pub struct ApiAckEnvelope {
    pub success: bool,
}

pub fn ok_data<T: Serialize>(data: T) -> (StatusCode, Json<ApiDataEnvelope<T>>) {
    (
        StatusCode::OK,
        Json(ApiDataEnvelope {
            success: true,
            data,
        }),
    )
}

pub fn created_data<T: Serialize>(data: T) -> (StatusCode, Json<ApiDataEnvelope<T>>) {
    (
        StatusCode::CREATED,
        Json(ApiDataEnvelope {
            success: true,
            data,
        }),
    )
}

pub fn ok_ack() -> (StatusCode, Json<ApiAckEnvelope>) {
    (StatusCode::OK, Json(ApiAckEnvelope { success: true }))
}

pub fn error_response(code: ApiErrorCode, message: impl Into<String>) -> ApiError {
    error_response_with_fields(code, message, None)
}

pub fn error_response_with_fields(
    code: ApiErrorCode,
    message: impl Into<String>,
    errors: Option<HashMap<String, Vec<String>>>,
) -> ApiError {
    ApiError {
        status: code.default_status(),
        body: ApiErrorResponse {
            success: false,
            error: message.into(),
            code: code.as_str(),
            errors,
        },
    }
}

pub fn validation_error(field: &str, message: &str) -> ApiError {
    let mut errors = HashMap::new();
    errors.insert(field.to_string(), vec![message.to_string()]);

    error_response_with_fields(ApiErrorCode::InvalidRequest, message, Some(errors))
}

pub fn unauthorized_error(message: &str) -> ApiError {
    error_response(ApiErrorCode::Unauthorized, message)
}

pub fn not_found_error(message: impl Into<String>) -> ApiError {
    error_response(ApiErrorCode::NotFound, message)
}

pub fn conflict_error(message: impl Into<String>) -> ApiError {
    error_response(ApiErrorCode::Conflict, message)
}

pub fn invalid_state_error(message: impl Into<String>) -> ApiError {
    error_response(ApiErrorCode::InvalidState, message)
}

pub fn internal_error(message: impl Into<String>) -> ApiError {
    error_response(ApiErrorCode::InternalError, message)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_codes_map_to_documented_statuses() {
        let expected = [
            (ApiErrorCode::InvalidRequest, "invalid_request", 422),
            (ApiErrorCode::Unauthorized, "unauthorized", 401),
            (ApiErrorCode::NotFound, "not_found", 404),
            (ApiErrorCode::Conflict, "conflict", 409),
            (ApiErrorCode::InvalidState, "invalid_state", 400),
            (ApiErrorCode::InternalError, "internal_error", 500),
        ];

        for (code, name, status) in expected {
            assert_eq!(code.as_str(), name);
            assert_eq!(code.default_status().as_u16(), status);
        }
    }

    #[test]
    fn unauthorized_response_carries_bearer_challenge() {
        let response = unauthorized_error("Could not validate credentials").into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            response
                .headers()
                .get(WWW_AUTHENTICATE)
                .and_then(|value| value.to_str().ok()),
            Some("Bearer")
        );
    }

    #[test]
    fn not_found_response_has_no_challenge_header() {
        let response = not_found_error("Project not found").into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(response.headers().get(WWW_AUTHENTICATE).is_none());
    }

    #[test]
    fn validation_error_lists_field_messages() -> Result<(), serde_json::Error> {
        let error = validation_error("email", "Enter a valid email address.");
        let body = serde_json::to_value(&error.body)?;

        assert_eq!(body["success"], false);
        assert_eq!(body["code"], "invalid_request");
        assert_eq!(body["errors"]["email"][0], "Enter a valid email address.");
        Ok(())
    }
}
