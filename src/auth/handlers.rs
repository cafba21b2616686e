use axum::{
    extract::{FromRef, State},
    http::StatusCode,
    Json,
};
use lazy_static::lazy_static;
use regex::Regex;
use time::OffsetDateTime;
use tracing::{error, info, instrument, warn};

use crate::{
    auth::{
        dto::{
            LoginRequest, LoginResponse, MeResponse, ProfileData, ProfileResponse, ResendData,
            ResendResponse, ResendVerificationRequest, SignupData, SignupRequest, SignupResponse,
            UpdateProfileRequest, UserEnvelope, UserSummary, VerifiedData, VerifyEmailRequest,
            VerifyEmailResponse,
        },
        extractors::AuthUser,
        jwt::JwtKeys,
        otp,
        password,
        repo::{NewUser, User},
    },
    error::{ApiError, FieldError},
    state::AppState,
};

lazy_static! {
    static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    static ref USERNAME_RE: Regex = Regex::new(r"^[A-Za-z0-9_]+$").unwrap();
    static ref OTP_RE: Regex = Regex::new(r"^[0-9]{6}$").unwrap();
    static ref URL_RE: Regex = Regex::new(r"^https?://\S+$").unwrap();
}

fn validate_signup(username: &str, email: &str, password: &str) -> Vec<FieldError> {
    let mut errors = Vec::new();
    if username.len() < 3 || username.len() > 50 {
        errors.push(FieldError {
            field: "username",
            message: "Username must be between 3 and 50 characters",
        });
    } else if !USERNAME_RE.is_match(username) {
        errors.push(FieldError {
            field: "username",
            message: "Username can only contain letters, numbers, and underscores",
        });
    }
    if !EMAIL_RE.is_match(email) {
        errors.push(FieldError {
            field: "email",
            message: "Please provide a valid email",
        });
    }
    if password.len() < 6 {
        errors.push(FieldError {
            field: "password",
            message: "Password must be at least 6 characters long",
        });
    }
    errors
}

fn validate_login(email: &str, password: &str) -> Vec<FieldError> {
    let mut errors = Vec::new();
    if !EMAIL_RE.is_match(email) {
        errors.push(FieldError {
            field: "email",
            message: "Please provide a valid email",
        });
    }
    if password.is_empty() {
        errors.push(FieldError {
            field: "password",
            message: "Password is required",
        });
    }
    errors
}

fn validate_verify(email: &str, code: &str) -> Vec<FieldError> {
    let mut errors = Vec::new();
    if !EMAIL_RE.is_match(email) {
        errors.push(FieldError {
            field: "email",
            message: "Please provide a valid email address",
        });
    }
    if !OTP_RE.is_match(code) {
        errors.push(FieldError {
            field: "otp",
            message: "OTP code must be exactly 6 digits",
        });
    }
    errors
}

fn validate_profile(full_name: Option<&str>, avatar_url: Option<&str>) -> Vec<FieldError> {
    let mut errors = Vec::new();
    if full_name.is_some_and(|n| n.len() > 100) {
        errors.push(FieldError {
            field: "fullName",
            message: "Full name must be less than 100 characters",
        });
    }
    if avatar_url.is_some_and(|u| !URL_RE.is_match(u)) {
        errors.push(FieldError {
            field: "avatarUrl",
            message: "Please provide a valid URL for avatar",
        });
    }
    errors
}

#[instrument(skip(state, payload))]
pub async fn signup(
    State(state): State<AppState>,
    Json(payload): Json<SignupRequest>,
) -> Result<(StatusCode, Json<SignupResponse>), ApiError> {
    let username = payload.username.trim().to_string();
    let email = payload.email.trim().to_lowercase();

    let errors = validate_signup(&username, &email, &payload.password);
    if !errors.is_empty() {
        warn!(email = %email, "signup validation failed");
        return Err(ApiError::Validation(errors));
    }

    if User::find_by_email(&state.db, &email).await?.is_some() {
        warn!(email = %email, "signup duplicate email");
        return Err(ApiError::BadRequest("Email already exists".into()));
    }
    if User::find_by_username(&state.db, &username).await?.is_some() {
        warn!(username = %username, "signup duplicate username");
        return Err(ApiError::BadRequest("Username already exists".into()));
    }

    let hash = password::hash_password(&payload.password)?;
    let issued = otp::issue();

    // A concurrent signup racing past the checks above loses at the unique
    // constraint; the store-error translation turns that into the same
    // duplicate message.
    let user = User::create(
        &state.db,
        &NewUser {
            username: &username,
            email: &email,
            password_hash: &hash,
            is_vegetarian: payload.is_vegetarian,
            otp: &issued,
        },
    )
    .await?;

    let email_sent = match state
        .mailer
        .send_verification(&user.email, &user.username, &issued.code)
        .await
    {
        Ok(()) => true,
        Err(e) => {
            error!(error = %e, email = %user.email, "verification email failed");
            false
        }
    };

    let development_otp =
        (!email_sent && state.config.expose_otp_on_send_failure).then(|| issued.code.clone());

    info!(user_id = %user.id, email = %user.email, "user signed up");
    Ok((
        StatusCode::CREATED,
        Json(SignupResponse {
            status: "success",
            message: if email_sent {
                "Account created successfully! Please check your email to verify your account \
                 before logging in."
            } else {
                "Account created successfully! Please use the verification code in development \
                 mode or contact support."
            },
            data: SignupData {
                id: user.id,
                email: user.email,
                username: user.username,
                is_vegetarian: user.is_vegetarian,
                created_at: user.created_at,
                email_verified: false,
                verification_email_sent: email_sent,
                development_otp,
            },
        }),
    ))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let email = payload.email.trim().to_lowercase();

    let errors = validate_login(&email, &payload.password);
    if !errors.is_empty() {
        return Err(ApiError::Validation(errors));
    }

    let user = User::find_by_email(&state.db, &email).await?.ok_or_else(|| {
        warn!(email = %email, "login unknown email");
        ApiError::Unauthorized("Invalid credentials".into())
    })?;

    // The password check runs before the verified-flag check so a wrong
    // password on an unverified account still gets the generic rejection.
    let Some(hash) = user.password_hash.as_deref() else {
        warn!(user_id = %user.id, "login against soft-deleted account");
        return Err(ApiError::Unauthorized("Invalid credentials".into()));
    };
    if !password::verify_password(&payload.password, hash)? {
        warn!(user_id = %user.id, "login invalid password");
        return Err(ApiError::Unauthorized("Invalid credentials".into()));
    }

    if !user.email_verified {
        return Err(ApiError::EmailNotVerified { email: user.email });
    }

    let keys = JwtKeys::from_ref(&state);
    let token = keys.sign(user.id)?;

    info!(user_id = %user.id, "user logged in");
    Ok(Json(LoginResponse {
        status: "success",
        message: "Login successful",
        data: UserSummary::from(&user),
        token,
    }))
}

#[instrument(skip(state, payload))]
pub async fn verify_email(
    State(state): State<AppState>,
    Json(payload): Json<VerifyEmailRequest>,
) -> Result<Json<VerifyEmailResponse>, ApiError> {
    let email = payload.email.trim().to_lowercase();
    let code = payload.otp.trim();

    let errors = validate_verify(&email, code);
    if !errors.is_empty() {
        return Err(ApiError::Validation(errors));
    }

    let Some(user) = User::find_by_email_and_otp(&state.db, &email, code).await? else {
        // Only a row that exists for this email gets its counter bumped;
        // unknown emails are indistinguishable in the response.
        User::bump_otp_attempts(&state.db, &email).await?;
        warn!(email = %email, "otp mismatch");
        return Err(ApiError::InvalidOtp);
    };

    if user.otp_attempts >= otp::MAX_VERIFY_ATTEMPTS {
        warn!(user_id = %user.id, attempts = user.otp_attempts, "otp attempt cap reached");
        return Err(ApiError::TooManyOtpAttempts);
    }

    if otp::is_expired(user.otp_expires_at, OffsetDateTime::now_utc()) {
        return Err(ApiError::OtpExpired { email: user.email });
    }

    User::mark_verified(&state.db, user.id).await?;

    // Verification stands whatever happens to the welcome email.
    if let Err(e) = state.mailer.send_welcome(&user.email, &user.username).await {
        error!(error = %e, email = %user.email, "welcome email failed");
    }

    info!(user_id = %user.id, "email verified");
    Ok(Json(VerifyEmailResponse {
        status: "success",
        message: "Email verified successfully! You can now log in to your account.",
        data: VerifiedData {
            email: user.email,
            username: user.username,
            verified: true,
        },
    }))
}

#[instrument(skip(state, payload))]
pub async fn resend_verification(
    State(state): State<AppState>,
    Json(payload): Json<ResendVerificationRequest>,
) -> Result<Json<ResendResponse>, ApiError> {
    let email = payload.email.trim().to_lowercase();

    if !EMAIL_RE.is_match(&email) {
        return Err(ApiError::Validation(vec![FieldError {
            field: "email",
            message: "Please provide a valid email",
        }]));
    }

    let user = User::find_by_email(&state.db, &email)
        .await?
        .ok_or_else(|| ApiError::NotFound("No account found with this email address".into()))?;

    if user.email_verified {
        return Err(ApiError::BadRequest(
            "Email is already verified. You can log in now.".into(),
        ));
    }

    let now = OffsetDateTime::now_utc();
    if let Some(retry_after) = otp::resend_retry_after(user.email_verification_sent_at, now) {
        warn!(user_id = %user.id, retry_after, "resend throttled");
        return Err(ApiError::ResendThrottled { retry_after });
    }

    let issued = otp::issue_at(now);
    User::reissue_otp(&state.db, user.id, &issued).await?;

    // The send is the whole point here, so a mailer failure is a hard error
    // (the previous code is already invalidated at this point).
    state
        .mailer
        .send_verification(&user.email, &user.username, &issued.code)
        .await
        .map_err(|e| {
            error!(error = %e, email = %user.email, "resend verification email failed");
            ApiError::EmailSendFailed
        })?;

    info!(user_id = %user.id, "verification email resent");
    Ok(Json(ResendResponse {
        status: "success",
        message: "Verification email sent! Please check your inbox.",
        data: ResendData {
            email: user.email,
            verification_sent: true,
        },
    }))
}

#[instrument(skip_all)]
pub async fn me(auth: AuthUser) -> Json<MeResponse> {
    Json(MeResponse {
        status: "success",
        data: UserEnvelope {
            user: ProfileData::from(&auth.user),
        },
    })
}

#[instrument(skip(state, auth, payload))]
pub async fn update_profile(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(payload): Json<UpdateProfileRequest>,
) -> Result<Json<ProfileResponse>, ApiError> {
    let full_name = payload.full_name.as_deref().map(str::trim);
    let avatar_url = payload.avatar_url.as_deref().map(str::trim);

    let errors = validate_profile(full_name, avatar_url);
    if !errors.is_empty() {
        return Err(ApiError::Validation(errors));
    }

    let updated = User::update_profile(&state.db, auth.user.id, full_name, avatar_url)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".into()))?;

    info!(user_id = %updated.id, "profile updated");
    Ok(Json(ProfileResponse {
        status: "success",
        message: "Profile updated successfully",
        data: UserEnvelope {
            user: ProfileData::from(&updated),
        },
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signup_accepts_well_formed_payload() {
        assert!(validate_signup("alice01", "a@x.com", "secret1").is_empty());
        assert!(validate_signup("a_b", "a@x.com", "123456").is_empty());
    }

    #[test]
    fn signup_rejects_short_and_long_usernames() {
        assert!(!validate_signup("ab", "a@x.com", "secret1").is_empty());
        let long = "a".repeat(51);
        assert!(!validate_signup(&long, "a@x.com", "secret1").is_empty());
    }

    #[test]
    fn signup_rejects_username_with_symbols() {
        let errors = validate_signup("alice!", "a@x.com", "secret1");
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "username");
    }

    #[test]
    fn signup_rejects_bad_email_and_short_password() {
        let errors = validate_signup("alice01", "not-an-email", "12345");
        let fields: Vec<_> = errors.iter().map(|e| e.field).collect();
        assert!(fields.contains(&"email"));
        assert!(fields.contains(&"password"));
    }

    #[test]
    fn login_requires_email_shape_and_password() {
        assert!(validate_login("a@x.com", "anything").is_empty());
        assert!(!validate_login("nope", "anything").is_empty());
        assert!(!validate_login("a@x.com", "").is_empty());
    }

    #[test]
    fn verify_requires_six_numeric_digits() {
        assert!(validate_verify("a@x.com", "123456").is_empty());
        assert!(!validate_verify("a@x.com", "12345").is_empty());
        assert!(!validate_verify("a@x.com", "1234567").is_empty());
        assert!(!validate_verify("a@x.com", "12345a").is_empty());
        assert!(!validate_verify("a@x.com", "").is_empty());
    }

    #[test]
    fn profile_bounds_are_enforced() {
        assert!(validate_profile(None, None).is_empty());
        assert!(validate_profile(Some("Alice Example"), Some("https://x.com/a.png")).is_empty());
        let long = "a".repeat(101);
        assert!(!validate_profile(Some(&long), None).is_empty());
        assert!(!validate_profile(None, Some("not a url")).is_empty());
        assert!(!validate_profile(None, Some("ftp://x.com/a.png")).is_empty());
    }
}
