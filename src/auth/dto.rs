use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::auth::repo::User;

/// Request body for signup.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignupRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub is_vegetarian: bool,
}

/// Request body for login.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Request body for email verification.
#[derive(Debug, Deserialize)]
pub struct VerifyEmailRequest {
    pub email: String,
    pub otp: String,
}

/// Request body for requesting a fresh verification code.
#[derive(Debug, Deserialize)]
pub struct ResendVerificationRequest {
    pub email: String,
}

/// Request body for profile updates; absent fields are left untouched.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileRequest {
    pub full_name: Option<String>,
    pub avatar_url: Option<String>,
}

/// Public projection of a user row; never carries the password hash.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub id: Uuid,
    pub email: String,
    pub username: String,
    pub is_vegetarian: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl From<&User> for UserSummary {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            username: user.username.clone(),
            is_vegetarian: user.is_vegetarian,
            created_at: user.created_at,
        }
    }
}

/// Fuller snapshot used by /me and profile updates.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileData {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub full_name: Option<String>,
    pub avatar_url: Option<String>,
    pub is_vegetarian: bool,
    pub email_verified: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl From<&User> for ProfileData {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
            full_name: user.full_name.clone(),
            avatar_url: user.avatar_url.clone(),
            is_vegetarian: user.is_vegetarian,
            email_verified: user.email_verified,
            created_at: user.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignupData {
    pub id: Uuid,
    pub email: String,
    pub username: String,
    pub is_vegetarian: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    pub email_verified: bool,
    pub verification_email_sent: bool,
    /// Only populated in development when the verification email failed.
    #[serde(rename = "developmentOTP", skip_serializing_if = "Option::is_none")]
    pub development_otp: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SignupResponse {
    pub status: &'static str,
    pub message: &'static str,
    pub data: SignupData,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub status: &'static str,
    pub message: &'static str,
    pub data: UserSummary,
    pub token: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifiedData {
    pub email: String,
    pub username: String,
    pub verified: bool,
}

#[derive(Debug, Serialize)]
pub struct VerifyEmailResponse {
    pub status: &'static str,
    pub message: &'static str,
    pub data: VerifiedData,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResendData {
    pub email: String,
    pub verification_sent: bool,
}

#[derive(Debug, Serialize)]
pub struct ResendResponse {
    pub status: &'static str,
    pub message: &'static str,
    pub data: ResendData,
}

#[derive(Debug, Serialize)]
pub struct UserEnvelope {
    pub user: ProfileData,
}

#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub status: &'static str,
    pub data: UserEnvelope,
}

#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub status: &'static str,
    pub message: &'static str,
    pub data: UserEnvelope,
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    fn signup_data(dev_otp: Option<String>) -> SignupData {
        SignupData {
            id: Uuid::nil(),
            email: "a@x.com".into(),
            username: "alice01".into(),
            is_vegetarian: false,
            created_at: datetime!(2025-06-01 12:00:00 UTC),
            email_verified: false,
            verification_email_sent: dev_otp.is_none(),
            development_otp: dev_otp,
        }
    }

    #[test]
    fn signup_data_hides_absent_development_otp() {
        let json = serde_json::to_value(signup_data(None)).expect("serialize");
        assert!(json.get("developmentOTP").is_none());
        assert!(json.get("developmentOtp").is_none());
        assert_eq!(json["emailVerified"], false);
        assert_eq!(json["verificationEmailSent"], true);
    }

    #[test]
    fn signup_data_exposes_development_otp_when_set() {
        let json = serde_json::to_value(signup_data(Some("123456".into()))).expect("serialize");
        assert_eq!(json["developmentOTP"], "123456");
        assert_eq!(json["verificationEmailSent"], false);
    }

    #[test]
    fn timestamps_serialize_as_rfc3339() {
        let json = serde_json::to_value(signup_data(None)).expect("serialize");
        let created = json["createdAt"].as_str().expect("string timestamp");
        assert!(created.starts_with("2025-06-01T12:00:00"));
    }

    #[test]
    fn user_summary_never_leaks_credentials() {
        let summary = UserSummary {
            id: Uuid::nil(),
            email: "a@x.com".into(),
            username: "alice01".into(),
            is_vegetarian: true,
            created_at: datetime!(2025-06-01 12:00:00 UTC),
        };
        let json = serde_json::to_string(&summary).expect("serialize");
        assert!(!json.contains("password"));
        assert!(json.contains("\"isVegetarian\":true"));
    }
}
