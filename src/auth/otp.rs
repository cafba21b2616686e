use rand::Rng;
use time::{Duration, OffsetDateTime};

/// Validity window of an issued code.
pub const OTP_TTL: Duration = Duration::minutes(5);
/// Minimum gap between two verification emails to the same address.
pub const RESEND_COOLDOWN: Duration = Duration::minutes(2);
/// Failed verifications tolerated before the code must be reissued.
pub const MAX_VERIFY_ATTEMPTS: i32 = 5;

/// A freshly issued verification code with its bookkeeping timestamps.
/// Persisting it must also reset the attempt counter to zero.
#[derive(Debug, Clone)]
pub struct IssuedOtp {
    pub code: String,
    pub expires_at: OffsetDateTime,
    pub sent_at: OffsetDateTime,
}

pub fn issue() -> IssuedOtp {
    issue_at(OffsetDateTime::now_utc())
}

pub fn issue_at(now: OffsetDateTime) -> IssuedOtp {
    IssuedOtp {
        code: generate_code(),
        expires_at: now + OTP_TTL,
        sent_at: now,
    }
}

/// Uniform 6-digit numeric code, `100000..=999999`.
pub fn generate_code() -> String {
    rand::thread_rng().gen_range(100_000..=999_999).to_string()
}

/// A matched row with a NULL expiry would break the both-or-neither
/// invariant; treat it as expired rather than verified.
pub fn is_expired(expires_at: Option<OffsetDateTime>, now: OffsetDateTime) -> bool {
    expires_at.map_or(true, |at| now > at)
}

/// Seconds the caller must still wait before another resend, if any.
pub fn resend_retry_after(last_sent: Option<OffsetDateTime>, now: OffsetDateTime) -> Option<i64> {
    let sent = last_sent?;
    let elapsed = now - sent;
    if elapsed < RESEND_COOLDOWN {
        let remaining_ms = (RESEND_COOLDOWN - elapsed).whole_milliseconds();
        Some(((remaining_ms + 999) / 1000) as i64)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn generated_codes_are_six_digits_in_range() {
        for _ in 0..200 {
            let code = generate_code();
            assert_eq!(code.len(), 6);
            let value: u32 = code.parse().expect("numeric");
            assert!((100_000..=999_999).contains(&value));
        }
    }

    #[test]
    fn issue_sets_five_minute_window() {
        let now = datetime!(2025-06-01 12:00:00 UTC);
        let issued = issue_at(now);
        assert_eq!(issued.expires_at, now + Duration::minutes(5));
        assert_eq!(issued.sent_at, now);
    }

    #[test]
    fn expiry_is_strict() {
        let now = datetime!(2025-06-01 12:05:00 UTC);
        assert!(!is_expired(Some(now), now));
        assert!(is_expired(Some(now - Duration::seconds(1)), now));
        assert!(!is_expired(Some(now + Duration::seconds(1)), now));
        assert!(is_expired(None, now));
    }

    #[test]
    fn resend_allowed_without_previous_send() {
        let now = datetime!(2025-06-01 12:00:00 UTC);
        assert_eq!(resend_retry_after(None, now), None);
    }

    #[test]
    fn resend_within_cooldown_reports_remaining_seconds() {
        let sent = datetime!(2025-06-01 12:00:00 UTC);
        let now = sent + Duration::seconds(30);
        assert_eq!(resend_retry_after(Some(sent), now), Some(90));
    }

    #[test]
    fn remaining_seconds_round_up() {
        let sent = datetime!(2025-06-01 12:00:00 UTC);
        let now = sent + Duration::milliseconds(119_500);
        assert_eq!(resend_retry_after(Some(sent), now), Some(1));
    }

    #[test]
    fn resend_allowed_after_cooldown() {
        let sent = datetime!(2025-06-01 12:00:00 UTC);
        assert_eq!(resend_retry_after(Some(sent), sent + Duration::minutes(2)), None);
        assert_eq!(resend_retry_after(Some(sent), sent + Duration::minutes(10)), None);
    }
}
