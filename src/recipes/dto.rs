use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::recipes::repo::{Favourite, SearchRecord};

/// Body for the ingredient-driven search.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngredientSearchRequest {
    pub ingredients: Vec<String>,
    pub max_time_minutes: i64,
    pub is_vegetarian: Option<bool>,
}

/// Compact recipe used in search results.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipeSummary {
    pub id: String,
    pub title: String,
    pub cooking_time: i64,
    pub ingredients: Vec<String>,
    pub image: Option<String>,
    pub category: Option<String>,
    pub area: Option<String>,
    pub is_vegetarian: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchData {
    pub recipes: Vec<RecipeSummary>,
    pub total_results: usize,
}

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub status: &'static str,
    pub message: &'static str,
    pub data: SearchData,
}

#[derive(Debug, Deserialize)]
pub struct NameSearchQuery {
    pub query: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IngredientMeasure {
    pub ingredient: String,
    pub measure: Option<String>,
}

/// Full recipe detail for the name search.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipeDetails {
    pub id: String,
    pub title: String,
    pub image: Option<String>,
    pub category: Option<String>,
    pub area: Option<String>,
    pub ingredients: Vec<IngredientMeasure>,
    pub instructions: String,
    pub tags: Vec<String>,
    pub youtube: Option<String>,
    pub source: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NameSearchData {
    pub query: String,
    pub recipes: Vec<RecipeDetails>,
    pub total_results: usize,
}

#[derive(Debug, Serialize)]
pub struct NameSearchResponse {
    pub status: &'static str,
    pub message: &'static str,
    pub data: NameSearchData,
}

/// Optional body for the favourite toggle.
#[derive(Debug, Default, Deserialize)]
pub struct FavouriteBody {
    pub notes: Option<String>,
    pub rating: Option<i32>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FavouriteToggleData {
    pub is_favorited: bool,
}

#[derive(Debug, Serialize)]
pub struct FavouriteToggleResponse {
    pub status: &'static str,
    pub message: &'static str,
    pub data: FavouriteToggleData,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FavouriteItem {
    pub id: Uuid,
    pub recipe_id: String,
    pub notes: Option<String>,
    pub rating: Option<i32>,
    #[serde(with = "time::serde::rfc3339")]
    pub added_at: OffsetDateTime,
}

impl From<&Favourite> for FavouriteItem {
    fn from(row: &Favourite) -> Self {
        Self {
            id: row.id,
            recipe_id: row.recipe_id.clone(),
            notes: row.notes.clone(),
            rating: row.rating,
            added_at: row.added_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct FavouritesData {
    pub favourites: Vec<FavouriteItem>,
}

#[derive(Debug, Serialize)]
pub struct FavouritesResponse {
    pub status: &'static str,
    pub data: FavouritesData,
}

/// Body for saving a search to history. Wire names follow the original
/// contract (snake_case here, unlike the camelCase auth bodies).
#[derive(Debug, Deserialize)]
pub struct SaveSearchRequest {
    pub search_query: String,
    pub search_filters: Option<serde_json::Value>,
    pub results_count: Option<i32>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedSearchData {
    pub search_id: Uuid,
    pub search_query: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_duplicate: Option<bool>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        with = "time::serde::rfc3339::option"
    )]
    pub search_timestamp: Option<OffsetDateTime>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub results_count: Option<i32>,
}

#[derive(Debug, Serialize)]
pub struct SavedSearchResponse {
    pub status: &'static str,
    pub message: &'static str,
    pub data: SavedSearchData,
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchHistoryItem {
    pub id: Uuid,
    pub search_query: String,
    pub search_filters: Option<serde_json::Value>,
    pub results_count: Option<i32>,
    #[serde(with = "time::serde::rfc3339")]
    pub search_timestamp: OffsetDateTime,
}

impl From<&SearchRecord> for SearchHistoryItem {
    fn from(row: &SearchRecord) -> Self {
        Self {
            id: row.id,
            search_query: row.search_query.clone(),
            search_filters: row.search_filters.clone(),
            results_count: row.results_count,
            search_timestamp: row.search_timestamp,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
    pub has_more: bool,
}

#[derive(Debug, Serialize)]
pub struct HistoryData {
    pub searches: Vec<SearchHistoryItem>,
    pub pagination: Pagination,
}

#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub status: &'static str,
    pub data: HistoryData,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub status: &'static str,
    pub message: &'static str,
}
