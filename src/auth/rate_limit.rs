use std::collections::HashMap;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Mutex;

use axum::{
    extract::{ConnectInfo, Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use time::{Duration, OffsetDateTime};
use tracing::warn;

use crate::{error::ApiError, state::AppState};

pub const WINDOW: Duration = Duration::minutes(15);
pub const MAX_ATTEMPTS: u32 = 5;

#[derive(Debug, Clone, Copy)]
struct Bucket {
    count: u32,
    window_started: OffsetDateTime,
}

/// Per-client-IP counter over the auth endpoints: at most `max_attempts`
/// requests per window, then 429 until the window rolls over.
///
/// Known limitation: state is process-local and non-durable. A restart
/// clears it and multiple instances each keep their own window.
pub struct AuthRateLimiter {
    max_attempts: u32,
    window: Duration,
    buckets: Mutex<HashMap<IpAddr, Bucket>>,
}

impl Default for AuthRateLimiter {
    fn default() -> Self {
        Self::new(MAX_ATTEMPTS, WINDOW)
    }
}

impl AuthRateLimiter {
    pub fn new(max_attempts: u32, window: Duration) -> Self {
        Self {
            max_attempts,
            window,
            buckets: Mutex::new(HashMap::new()),
        }
    }

    pub fn check(&self, ip: IpAddr) -> Result<(), ApiError> {
        self.check_at(ip, OffsetDateTime::now_utc())
    }

    pub fn check_at(&self, ip: IpAddr, now: OffsetDateTime) -> Result<(), ApiError> {
        let mut buckets = self.buckets.lock().unwrap_or_else(|e| e.into_inner());
        let bucket = buckets.entry(ip).or_insert(Bucket {
            count: 0,
            window_started: now,
        });

        if now - bucket.window_started >= self.window {
            bucket.count = 1;
            bucket.window_started = now;
        } else {
            bucket.count += 1;
        }

        if bucket.count > self.max_attempts {
            warn!(%ip, count = bucket.count, "auth rate limit exceeded");
            return Err(ApiError::TooManyAuthAttempts);
        }
        Ok(())
    }
}

/// Middleware guarding the public auth endpoints.
pub async fn enforce(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let ip = client_ip(&req);
    match state.auth_limiter.check(ip) {
        Ok(()) => next.run(req).await,
        Err(err) => err.into_response(),
    }
}

/// Proxy headers first, then the socket peer address.
fn client_ip(req: &Request) -> IpAddr {
    let from_header = |name: &str| {
        req.headers()
            .get(name)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .and_then(|v| v.trim().parse::<IpAddr>().ok())
    };
    from_header("x-forwarded-for")
        .or_else(|| from_header("x-real-ip"))
        .or_else(|| {
            req.extensions()
                .get::<ConnectInfo<SocketAddr>>()
                .map(|ci| ci.0.ip())
        })
        .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use time::macros::datetime;

    fn ip(last: u8) -> IpAddr {
        IpAddr::V4(Ipv4Addr::new(10, 0, 0, last))
    }

    #[test]
    fn sixth_attempt_in_window_is_rejected() {
        let limiter = AuthRateLimiter::default();
        let now = datetime!(2025-06-01 12:00:00 UTC);
        for i in 0..5 {
            let at = now + Duration::seconds(i);
            assert!(limiter.check_at(ip(1), at).is_ok(), "attempt {i} should pass");
        }
        assert!(limiter
            .check_at(ip(1), now + Duration::seconds(10))
            .is_err());
    }

    #[test]
    fn window_rollover_resets_the_counter() {
        let limiter = AuthRateLimiter::default();
        let now = datetime!(2025-06-01 12:00:00 UTC);
        for _ in 0..6 {
            let _ = limiter.check_at(ip(2), now);
        }
        assert!(limiter.check_at(ip(2), now).is_err());
        assert!(limiter.check_at(ip(2), now + Duration::minutes(15)).is_ok());
    }

    #[test]
    fn addresses_are_counted_independently() {
        let limiter = AuthRateLimiter::default();
        let now = datetime!(2025-06-01 12:00:00 UTC);
        for _ in 0..5 {
            assert!(limiter.check_at(ip(3), now).is_ok());
        }
        assert!(limiter.check_at(ip(3), now).is_err());
        assert!(limiter.check_at(ip(4), now).is_ok());
    }

    #[test]
    fn client_ip_prefers_forwarded_header() {
        let req = axum::http::Request::builder()
            .header("x-forwarded-for", "203.0.113.7, 10.0.0.1")
            .body(Body::empty())
            .expect("request");
        assert_eq!(client_ip(&req), "203.0.113.7".parse::<IpAddr>().unwrap());
    }

    #[test]
    fn client_ip_falls_back_to_peer_address() {
        let mut req = axum::http::Request::builder()
            .body(Body::empty())
            .expect("request");
        req.extensions_mut()
            .insert(ConnectInfo::<SocketAddr>("192.0.2.9:4321".parse().unwrap()));
        assert_eq!(client_ip(&req), "192.0.2.9".parse::<IpAddr>().unwrap());
    }

    #[test]
    fn unknown_origin_shares_one_bucket() {
        let req = axum::http::Request::builder()
            .body(Body::empty())
            .expect("request");
        assert_eq!(client_ip(&req), IpAddr::V4(Ipv4Addr::UNSPECIFIED));
    }
}
