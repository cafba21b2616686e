use sqlx::PgPool;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::auth::otp::IssuedOtp;

/// User record in the database. Never serialized directly; public
/// projections live in `dto`.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub password_hash: Option<String>, // NULL marks a soft-deleted account
    pub is_vegetarian: bool,
    pub full_name: Option<String>,
    pub avatar_url: Option<String>,
    pub email_verified: bool,
    pub email_verification_otp: Option<String>,
    pub otp_expires_at: Option<OffsetDateTime>,
    pub otp_attempts: i32,
    pub email_verification_sent_at: Option<OffsetDateTime>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

const USER_COLUMNS: &str = "id, username, email, password_hash, is_vegetarian, full_name, \
    avatar_url, email_verified, email_verification_otp, otp_expires_at, otp_attempts, \
    email_verification_sent_at, created_at, updated_at";

pub struct NewUser<'a> {
    pub username: &'a str,
    pub email: &'a str,
    pub password_hash: &'a str,
    pub is_vegetarian: bool,
    pub otp: &'a IssuedOtp,
}

impl User {
    /// Create an unverified user with a pending OTP cycle. Uniqueness of
    /// email and username is enforced by the store constraints; a lost race
    /// surfaces as a unique-violation error.
    pub async fn create(db: &PgPool, new: &NewUser<'_>) -> sqlx::Result<User> {
        let sql = format!(
            "INSERT INTO users (username, email, password_hash, is_vegetarian, \
             email_verification_otp, otp_expires_at, otp_attempts, email_verification_sent_at) \
             VALUES ($1, $2, $3, $4, $5, $6, 0, $7) \
             RETURNING {USER_COLUMNS}"
        );
        sqlx::query_as::<_, User>(&sql)
            .bind(new.username)
            .bind(new.email)
            .bind(new.password_hash)
            .bind(new.is_vegetarian)
            .bind(&new.otp.code)
            .bind(new.otp.expires_at)
            .bind(new.otp.sent_at)
            .fetch_one(db)
            .await
    }

    pub async fn find_by_email(db: &PgPool, email: &str) -> sqlx::Result<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1");
        sqlx::query_as::<_, User>(&sql)
            .bind(email)
            .fetch_optional(db)
            .await
    }

    pub async fn find_by_username(db: &PgPool, username: &str) -> sqlx::Result<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE username = $1");
        sqlx::query_as::<_, User>(&sql)
            .bind(username)
            .fetch_optional(db)
            .await
    }

    /// Exact match on both the address and the stored code; a wrong code
    /// against a known email returns None here.
    pub async fn find_by_email_and_otp(
        db: &PgPool,
        email: &str,
        code: &str,
    ) -> sqlx::Result<Option<User>> {
        let sql = format!(
            "SELECT {USER_COLUMNS} FROM users \
             WHERE email = $1 AND email_verification_otp = $2"
        );
        sqlx::query_as::<_, User>(&sql)
            .bind(email)
            .bind(code)
            .fetch_optional(db)
            .await
    }

    /// Gate lookup: rows mid-creation or soft-deleted (NULL credential) are
    /// treated as absent.
    pub async fn find_active_by_id(db: &PgPool, id: Uuid) -> sqlx::Result<Option<User>> {
        let sql = format!(
            "SELECT {USER_COLUMNS} FROM users \
             WHERE id = $1 AND password_hash IS NOT NULL"
        );
        sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(db)
            .await
    }

    /// No-op when no row matches the email.
    pub async fn bump_otp_attempts(db: &PgPool, email: &str) -> sqlx::Result<()> {
        sqlx::query("UPDATE users SET otp_attempts = otp_attempts + 1 WHERE email = $1")
            .bind(email)
            .execute(db)
            .await?;
        Ok(())
    }

    /// Flip the verified flag and close the OTP cycle in one statement.
    pub async fn mark_verified(db: &PgPool, id: Uuid) -> sqlx::Result<()> {
        sqlx::query(
            "UPDATE users SET email_verified = TRUE, email_verification_otp = NULL, \
             otp_expires_at = NULL, otp_attempts = 0, updated_at = now() WHERE id = $1",
        )
        .bind(id)
        .execute(db)
        .await?;
        Ok(())
    }

    /// Replace the pending code and reset the attempt counter.
    pub async fn reissue_otp(db: &PgPool, id: Uuid, otp: &IssuedOtp) -> sqlx::Result<()> {
        sqlx::query(
            "UPDATE users SET email_verification_otp = $1, otp_expires_at = $2, \
             email_verification_sent_at = $3, otp_attempts = 0, updated_at = now() \
             WHERE id = $4",
        )
        .bind(&otp.code)
        .bind(otp.expires_at)
        .bind(otp.sent_at)
        .bind(id)
        .execute(db)
        .await?;
        Ok(())
    }

    /// COALESCE keeps fields the caller did not send. None when the row
    /// vanished between the auth gate and the update.
    pub async fn update_profile(
        db: &PgPool,
        id: Uuid,
        full_name: Option<&str>,
        avatar_url: Option<&str>,
    ) -> sqlx::Result<Option<User>> {
        let sql = format!(
            "UPDATE users SET full_name = COALESCE($1, full_name), \
             avatar_url = COALESCE($2, avatar_url), updated_at = now() \
             WHERE id = $3 RETURNING {USER_COLUMNS}"
        );
        sqlx::query_as::<_, User>(&sql)
            .bind(full_name)
            .bind(avatar_url)
            .bind(id)
            .fetch_optional(db)
            .await
    }
}
