use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use tracing::warn;
use uuid::Uuid;

use crate::{
    auth::{jwt::JwtKeys, repo::User},
    error::ApiError,
    state::AppState,
};

/// Decoded token claims attached to the request alongside the user.
#[derive(Debug, Clone, Copy)]
pub struct TokenInfo {
    pub id: Uuid,
    pub issued_at: usize,
    pub expires_at: usize,
}

/// Required auth gate: resolves the bearer token to a verified user or
/// rejects the request. Token problems never touch the store.
pub struct AuthUser {
    pub user: User,
    pub token: TokenInfo,
}

fn bearer_token(parts: &Parts) -> Result<&str, ApiError> {
    let header = parts
        .headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ApiError::Unauthorized("Not authorized, no token provided".into()))?;
    header
        .strip_prefix("Bearer ")
        .ok_or_else(|| ApiError::Unauthorized("Not authorized, no token provided".into()))
}

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)?;
        let keys = JwtKeys::from_ref(state);
        let claims = keys.verify(token).map_err(|e| {
            warn!(error = %e, "token rejected");
            ApiError::Unauthorized(e.to_string())
        })?;

        let user = User::find_active_by_id(&state.db, claims.sub)
            .await?
            .ok_or_else(|| ApiError::Unauthorized("User not found or account deleted".into()))?;

        if !user.email_verified {
            return Err(ApiError::EmailNotVerified { email: user.email });
        }

        Ok(AuthUser {
            user,
            token: TokenInfo {
                id: claims.sub,
                issued_at: claims.iat,
                expires_at: claims.exp,
            },
        })
    }
}

/// Optional auth gate: identical resolution, but any failure simply yields
/// `None`. Unverified users are attached here; endpoints that must gate on
/// verification use `AuthUser`.
pub struct MaybeAuthUser(pub Option<User>);

#[async_trait]
impl FromRequestParts<AppState> for MaybeAuthUser {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let Ok(token) = bearer_token(parts) else {
            return Ok(Self(None));
        };
        let keys = JwtKeys::from_ref(state);
        let Ok(claims) = keys.verify(token) else {
            return Ok(Self(None));
        };
        match User::find_active_by_id(&state.db, claims.sub).await {
            Ok(user) => Ok(Self(user)),
            Err(e) => {
                warn!(error = %e, "optional auth lookup failed");
                Ok(Self(None))
            }
        }
    }
}

/// Role gate kept for when a role column lands on the user record. Until
/// then every authenticated caller passes, whatever roles are required.
pub fn authorize(_user: &AuthUser, _required_roles: &[&str]) -> Result<(), ApiError> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::OffsetDateTime;

    fn fake_auth_user() -> AuthUser {
        AuthUser {
            user: User {
                id: Uuid::new_v4(),
                username: "alice01".into(),
                email: "a@x.com".into(),
                password_hash: Some("hash".into()),
                is_vegetarian: false,
                full_name: None,
                avatar_url: None,
                email_verified: true,
                email_verification_otp: None,
                otp_expires_at: None,
                otp_attempts: 0,
                email_verification_sent_at: None,
                created_at: OffsetDateTime::now_utc(),
                updated_at: OffsetDateTime::now_utc(),
            },
            token: TokenInfo {
                id: Uuid::new_v4(),
                issued_at: 0,
                expires_at: 0,
            },
        }
    }

    #[test]
    fn authorize_passes_any_authenticated_user() {
        let user = fake_auth_user();
        assert!(authorize(&user, &[]).is_ok());
        assert!(authorize(&user, &["admin", "editor"]).is_ok());
    }
}
