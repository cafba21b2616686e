use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};

use crate::state::AppState;

pub mod claims;
pub mod dto;
pub mod extractors;
pub mod handlers;
pub mod jwt;
pub mod otp;
pub mod password;
pub mod rate_limit;
pub mod repo;

/// Auth routes under /auth. The four public endpoints sit behind the
/// per-IP rate limiter; token-gated routes do not.
pub fn router(state: &AppState) -> Router<AppState> {
    let guarded = Router::new()
        .route("/auth/signup", post(handlers::signup))
        .route("/auth/login", post(handlers::login))
        .route("/auth/verify-email", post(handlers::verify_email))
        .route(
            "/auth/resend-verification",
            post(handlers::resend_verification),
        )
        .layer(middleware::from_fn_with_state(
            state.clone(),
            rate_limit::enforce,
        ));

    Router::new()
        .merge(guarded)
        .route("/auth/me", get(handlers::me))
        .route("/auth/profile", put(handlers::update_profile))
}
