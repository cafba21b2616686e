use serde::Deserialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Development,
    Production,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MailConfig {
    /// Absent key means outbound mail is not configured; sends report
    /// failure instead of silently succeeding.
    pub api_key: Option<String>,
    pub from_address: String,
    pub base_url: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpstreamConfig {
    pub base_url: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub environment: Environment,
    pub jwt: JwtConfig,
    pub mail: MailConfig,
    pub upstream: UpstreamConfig,
    /// Inline the OTP in the signup response when the verification email
    /// could not be sent. Only ever true in development.
    pub expose_otp_on_send_failure: bool,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL")?;
        let environment = match std::env::var("APP_ENV").as_deref() {
            Ok("development") => Environment::Development,
            _ => Environment::Production,
        };
        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET")?,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "recipebox".into()),
            audience: std::env::var("JWT_AUDIENCE").unwrap_or_else(|_| "recipebox-users".into()),
            ttl_minutes: std::env::var("JWT_TTL_MINUTES")
                .ok()
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or(60 * 24 * 7),
        };
        let mail = MailConfig {
            api_key: std::env::var("MAIL_API_KEY").ok().filter(|k| !k.is_empty()),
            from_address: std::env::var("MAIL_FROM")
                .unwrap_or_else(|_| "Recipe App <noreply@recipebox.app>".into()),
            base_url: std::env::var("MAIL_API_URL")
                .unwrap_or_else(|_| "https://api.resend.com".into()),
            timeout_secs: std::env::var("MAIL_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(8),
        };
        let upstream = UpstreamConfig {
            base_url: std::env::var("RECIPE_API_URL")
                .unwrap_or_else(|_| "https://www.themealdb.com/api/json/v1/1".into()),
            timeout_secs: std::env::var("RECIPE_API_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(8),
        };
        Ok(Self {
            database_url,
            environment,
            jwt,
            mail,
            upstream,
            expose_otp_on_send_failure: environment == Environment::Development,
        })
    }
}
