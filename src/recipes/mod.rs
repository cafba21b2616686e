use axum::{
    routing::{delete, get, post},
    Router,
};

use crate::state::AppState;

pub mod client;
pub mod dto;
pub mod handlers;
pub mod repo;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/recipes/search", post(handlers::search_by_ingredients))
        .route("/recipes/search-recipes", get(handlers::search_by_name))
        .route("/recipes/search-history", post(handlers::save_search))
        .route("/recipes/search/history", get(handlers::search_history))
        .route(
            "/recipes/search/history/:id",
            delete(handlers::delete_search),
        )
        .route("/recipes/:id/favorite", post(handlers::toggle_favourite))
        .route("/recipes/favourites", get(handlers::favourites))
}
