use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::recipes::client::UpstreamError;

/// A single field-level validation failure, echoed back in the 400 body.
#[derive(Debug, Clone, Serialize)]
pub struct FieldError {
    pub field: &'static str,
    pub message: &'static str,
}

/// Domain errors that cross the handler boundary. Every variant renders as
/// the JSON envelope `{"status":"error","message":...}` plus an optional
/// machine-readable `code` and `data` payload.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Validation failed")]
    Validation(Vec<FieldError>),

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("Email not verified. Please verify your email before accessing this resource.")]
    EmailNotVerified { email: String },

    #[error("Invalid OTP code. Please check the code and try again.")]
    InvalidOtp,

    #[error("OTP code has expired. Please request a new verification email.")]
    OtpExpired { email: String },

    #[error("Too many failed attempts. Please request a new OTP code.")]
    TooManyOtpAttempts,

    #[error("Please wait {retry_after} seconds before requesting another verification email.")]
    ResendThrottled { retry_after: i64 },

    #[error("Too many authentication attempts, please try again later")]
    TooManyAuthAttempts,

    #[error("{0}")]
    NotFound(String),

    #[error("Failed to send verification email. Please try again later.")]
    EmailSendFailed,

    #[error(transparent)]
    Upstream(#[from] UpstreamError),

    #[error("Internal server error")]
    Internal(anyhow::Error),
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err)
    }
}

/// Translation table keeping the store's error vocabulary out of the public
/// contract: constraint-violation codes become plain 400s, everything else
/// is a logged 500.
impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(ref db) = err {
            match db.code().as_deref() {
                Some("23505") => {
                    let message = match db.constraint() {
                        Some("users_email_key") => "Email already exists",
                        Some("users_username_key") => "Username already exists",
                        _ => "Duplicate field value entered",
                    };
                    return Self::BadRequest(message.into());
                }
                Some("23503") => {
                    return Self::BadRequest("Referenced record does not exist".into())
                }
                Some("23514") => return Self::BadRequest("Invalid data provided".into()),
                Some("23502") => return Self::BadRequest("Required field is missing".into()),
                Some("22P02") => return Self::BadRequest("Invalid input format".into()),
                _ => {}
            }
        }
        Self::Internal(err.into())
    }
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_)
            | Self::BadRequest(_)
            | Self::InvalidOtp
            | Self::OtpExpired { .. } => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::EmailNotVerified { .. } => StatusCode::FORBIDDEN,
            Self::TooManyOtpAttempts | Self::ResendThrottled { .. } | Self::TooManyAuthAttempts => {
                StatusCode::TOO_MANY_REQUESTS
            }
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::EmailSendFailed | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Upstream(e) => e.status(),
        }
    }

    fn code(&self) -> Option<&'static str> {
        match self {
            Self::EmailNotVerified { .. } => Some("EMAIL_NOT_VERIFIED"),
            Self::InvalidOtp => Some("INVALID_OTP"),
            Self::OtpExpired { .. } => Some("OTP_EXPIRED"),
            Self::TooManyOtpAttempts => Some("TOO_MANY_ATTEMPTS"),
            Self::ResendThrottled { .. } => Some("RATE_LIMITED"),
            _ => None,
        }
    }

    fn data(&self) -> Option<serde_json::Value> {
        match self {
            Self::EmailNotVerified { email } => {
                Some(json!({ "email": email, "needsVerification": true }))
            }
            Self::OtpExpired { email } => Some(json!({ "email": email })),
            Self::ResendThrottled { retry_after } => Some(json!({ "retryAfter": retry_after })),
            _ => None,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let Self::Internal(ref source) = self {
            error!(error = ?source, "unhandled internal error");
        }

        let mut body = json!({
            "status": "error",
            "message": self.to_string(),
        });
        if let Some(code) = self.code() {
            body["code"] = json!(code);
        }
        if let Some(data) = self.data() {
            body["data"] = data;
        }
        if let Self::Validation(ref errors) = self {
            body["errors"] = json!(errors);
        }

        (self.status(), Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    async fn body_json(err: ApiError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("read body");
        (status, serde_json::from_slice(&bytes).expect("json body"))
    }

    #[tokio::test]
    async fn email_not_verified_carries_code_and_payload() {
        let (status, body) = body_json(ApiError::EmailNotVerified {
            email: "a@x.com".into(),
        })
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["status"], "error");
        assert_eq!(body["code"], "EMAIL_NOT_VERIFIED");
        assert_eq!(body["data"]["email"], "a@x.com");
        assert_eq!(body["data"]["needsVerification"], true);
    }

    #[tokio::test]
    async fn resend_throttled_reports_retry_after() {
        let (status, body) = body_json(ApiError::ResendThrottled { retry_after: 42 }).await;
        assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(body["code"], "RATE_LIMITED");
        assert_eq!(body["data"]["retryAfter"], 42);
    }

    #[tokio::test]
    async fn otp_errors_map_to_their_codes() {
        let (status, body) = body_json(ApiError::InvalidOtp).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "INVALID_OTP");

        let (status, body) = body_json(ApiError::OtpExpired {
            email: "a@x.com".into(),
        })
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "OTP_EXPIRED");
        assert_eq!(body["data"]["email"], "a@x.com");

        let (status, body) = body_json(ApiError::TooManyOtpAttempts).await;
        assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(body["code"], "TOO_MANY_ATTEMPTS");
    }

    #[tokio::test]
    async fn validation_lists_field_errors() {
        let (status, body) = body_json(ApiError::Validation(vec![FieldError {
            field: "password",
            message: "Password must be at least 6 characters long",
        }]))
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Validation failed");
        assert_eq!(body["errors"][0]["field"], "password");
    }

    #[tokio::test]
    async fn internal_error_hides_detail() {
        let (status, body) =
            body_json(ApiError::Internal(anyhow::anyhow!("secret detail"))).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["message"], "Internal server error");
        assert!(body.get("code").is_none());
    }
}
