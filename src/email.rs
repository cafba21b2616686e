use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use tracing::{info, warn};

use crate::config::MailConfig;

/// Outbound notification sink. Delivery failure is reported, never panics;
/// callers decide whether a failed send is fatal for their flow.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send_verification(&self, to: &str, username: &str, code: &str) -> anyhow::Result<()>;
    async fn send_welcome(&self, to: &str, username: &str) -> anyhow::Result<()>;
}

/// Mailer backed by a Resend-style HTTP API.
pub struct HttpMailer {
    http: reqwest::Client,
    api_key: String,
    from: String,
    base_url: String,
}

impl HttpMailer {
    pub fn new(cfg: &MailConfig, api_key: String) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(cfg.timeout_secs))
            .build()?;
        Ok(Self {
            http,
            api_key,
            from: cfg.from_address.clone(),
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn deliver(&self, to: &str, subject: &str, html: &str, text: &str) -> anyhow::Result<()> {
        let response = self
            .http
            .post(format!("{}/emails", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&json!({
                "from": self.from,
                "to": [to],
                "subject": subject,
                "html": html,
                "text": text,
            }))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let detail = response.text().await.unwrap_or_default();
            anyhow::bail!("mail API returned {status}: {detail}");
        }
        info!(%to, subject, "email sent");
        Ok(())
    }
}

#[async_trait]
impl Mailer for HttpMailer {
    async fn send_verification(&self, to: &str, _username: &str, code: &str) -> anyhow::Result<()> {
        let (html, text) = verification_body(to, code);
        self.deliver(to, "Verify your email address", &html, &text)
            .await
    }

    async fn send_welcome(&self, to: &str, username: &str) -> anyhow::Result<()> {
        let (html, text) = welcome_body(username);
        self.deliver(to, "Welcome to Recipe App!", &html, &text).await
    }
}

/// Used when no API key is configured. Every send fails, so signup reports
/// `verificationEmailSent: false` and (in development) inlines the OTP.
pub struct NoopMailer;

#[async_trait]
impl Mailer for NoopMailer {
    async fn send_verification(&self, to: &str, _username: &str, _code: &str) -> anyhow::Result<()> {
        warn!(%to, "mail API key not configured; dropping verification email");
        anyhow::bail!("mail delivery is not configured")
    }

    async fn send_welcome(&self, to: &str, _username: &str) -> anyhow::Result<()> {
        warn!(%to, "mail API key not configured; dropping welcome email");
        anyhow::bail!("mail delivery is not configured")
    }
}

fn verification_body(to: &str, code: &str) -> (String, String) {
    let html = format!(
        r#"<div style="font-family: Arial, sans-serif; max-width: 600px; margin: 0 auto; padding: 20px;">
  <p>Hey {to}</p>
  <p>welcome to Recipe app, to complete your signup, please use the following verification code:</p>
  <div style="text-align: center; margin: 30px 0; padding: 20px; background-color: #f8f9fa; border-radius: 10px;">
    <div style="font-size: 36px; font-weight: bold; letter-spacing: 8px; font-family: 'Courier New', monospace;">{code}</div>
  </div>
  <p>This code will expire in 5 minutes.</p>
  <p>Thank you,</p>
</div>"#
    );
    let text = format!(
        "Hey {to}, welcome to Recipe app, to complete your signup, please use the following \
         verification code: {code}. This code will expire in 5 minutes. Thank you,"
    );
    (html, text)
}

fn welcome_body(username: &str) -> (String, String) {
    let html = format!(
        r#"<div style="font-family: Arial, sans-serif; max-width: 600px; margin: 0 auto;">
  <h1 style="text-align: center;">Welcome to Recipe App!</h1>
  <p>Hi {username},</p>
  <p>Thank you for joining our recipe community! We're excited to have you on board.</p>
  <p>Start exploring now and happy cooking!</p>
  <p>Best regards,<br>The Recipe App Team</p>
</div>"#
    );
    let text = format!(
        "Welcome to Recipe App! Hi {username}, thank you for joining our recipe community. \
         We're excited to have you on board. Start exploring now and happy cooking!"
    );
    (html, text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verification_body_contains_code_and_ttl() {
        let (html, text) = verification_body("a@x.com", "123456");
        assert!(html.contains("123456"));
        assert!(html.contains("a@x.com"));
        assert!(text.contains("123456"));
        assert!(text.contains("expire in 5 minutes"));
    }

    #[test]
    fn welcome_body_addresses_user_by_name() {
        let (html, text) = welcome_body("alice01");
        assert!(html.contains("alice01"));
        assert!(text.contains("alice01"));
    }

    #[tokio::test]
    async fn noop_mailer_reports_failure() {
        let mailer = NoopMailer;
        assert!(mailer
            .send_verification("a@x.com", "alice01", "123456")
            .await
            .is_err());
        assert!(mailer.send_welcome("a@x.com", "alice01").await.is_err());
    }
}
