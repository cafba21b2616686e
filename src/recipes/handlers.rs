use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::{
    auth::extractors::{AuthUser, MaybeAuthUser},
    error::{ApiError, FieldError},
    recipes::{
        client::MealRecord,
        dto::{
            FavouriteBody, FavouriteItem, FavouriteToggleData, FavouriteToggleResponse,
            FavouritesData, FavouritesResponse, HistoryData, HistoryQuery, HistoryResponse,
            IngredientMeasure, IngredientSearchRequest, MessageResponse, NameSearchData,
            NameSearchQuery, NameSearchResponse, Pagination, RecipeDetails, RecipeSummary,
            SaveSearchRequest, SavedSearchData, SavedSearchResponse, SearchData,
            SearchHistoryItem, SearchResponse,
        },
        repo::{Favourite, SearchRecord},
    },
    state::AppState,
};

const RESULT_CAP: usize = 20;

/// The upstream has no cooking times; estimate from ingredient count.
fn estimate_cooking_time(ingredient_count: usize) -> i64 {
    (ingredient_count as i64 * 3).clamp(15, 45)
}

const MEAT_WORDS: &[&str] = &[
    "chicken", "beef", "pork", "lamb", "fish", "shrimp", "bacon", "ham",
];

fn looks_vegetarian(ingredients: &[String]) -> bool {
    !ingredients
        .iter()
        .any(|i| MEAT_WORDS.contains(&i.as_str()))
}

fn summarize(meal: &MealRecord) -> RecipeSummary {
    let ingredients: Vec<String> = meal
        .ingredient_pairs()
        .into_iter()
        .map(|(ingredient, _)| ingredient.to_lowercase())
        .collect();
    RecipeSummary {
        id: meal.id.clone(),
        title: meal.title.clone(),
        cooking_time: estimate_cooking_time(ingredients.len()),
        is_vegetarian: looks_vegetarian(&ingredients),
        image: meal.thumbnail.clone(),
        category: meal.category.clone(),
        area: meal.area.clone(),
        ingredients,
    }
}

fn match_count(recipe: &RecipeSummary, wanted: &[String]) -> usize {
    wanted
        .iter()
        .filter(|w| {
            let w = w.to_lowercase();
            recipe
                .ingredients
                .iter()
                .any(|have| have.contains(&w) || w.contains(have.as_str()))
        })
        .count()
}

/// Best ingredient coverage first, quicker recipes breaking ties.
fn rank_by_match(recipes: &mut [RecipeSummary], wanted: &[String]) {
    recipes.sort_by(|a, b| {
        match_count(b, wanted)
            .cmp(&match_count(a, wanted))
            .then(a.cooking_time.cmp(&b.cooking_time))
    });
}

fn details(meal: &MealRecord) -> RecipeDetails {
    RecipeDetails {
        id: meal.id.clone(),
        title: meal.title.clone(),
        image: meal.thumbnail.clone(),
        category: meal.category.clone(),
        area: meal.area.clone(),
        ingredients: meal
            .ingredient_pairs()
            .into_iter()
            .map(|(ingredient, measure)| IngredientMeasure {
                ingredient,
                measure,
            })
            .collect(),
        instructions: meal
            .instructions
            .as_deref()
            .map(|raw| {
                raw.lines()
                    .map(str::trim)
                    .filter(|line| !line.is_empty())
                    .collect::<Vec<_>>()
                    .join("\n")
            })
            .filter(|cleaned| !cleaned.is_empty())
            .unwrap_or_else(|| "No instructions available".into()),
        tags: meal
            .tags
            .as_deref()
            .map(|raw| {
                raw.split(',')
                    .map(|t| t.trim().to_string())
                    .filter(|t| !t.is_empty())
                    .collect()
            })
            .unwrap_or_default(),
        youtube: meal.youtube.clone().filter(|v| !v.is_empty()),
        source: meal.source.clone().filter(|v| !v.is_empty()),
    }
}

fn validate_ingredient_search(req: &IngredientSearchRequest) -> Vec<FieldError> {
    let mut errors = Vec::new();
    if req.ingredients.is_empty() {
        errors.push(FieldError {
            field: "ingredients",
            message: "At least one ingredient is required",
        });
    } else if req
        .ingredients
        .iter()
        .any(|i| i.trim().is_empty() || i.trim().len() > 50)
    {
        errors.push(FieldError {
            field: "ingredients",
            message: "Each ingredient must be a string between 1 and 50 characters",
        });
    }
    if !(1..=1440).contains(&req.max_time_minutes) {
        errors.push(FieldError {
            field: "maxTimeMinutes",
            message: "Max time must be between 1 and 1440 minutes",
        });
    }
    errors
}

#[instrument(skip(state, user, payload))]
pub async fn search_by_ingredients(
    State(state): State<AppState>,
    MaybeAuthUser(user): MaybeAuthUser,
    Json(payload): Json<IngredientSearchRequest>,
) -> Result<Json<SearchResponse>, ApiError> {
    let errors = validate_ingredient_search(&payload);
    if !errors.is_empty() {
        return Err(ApiError::Validation(errors));
    }

    let ingredients: Vec<String> = payload
        .ingredients
        .iter()
        .map(|i| i.trim().to_string())
        .collect();

    // Authenticated vegetarians get vegetarian-only results unless the
    // request says otherwise; anonymous callers get no implicit filter.
    let vegetarian_filter = payload
        .is_vegetarian
        .or_else(|| user.as_ref().and_then(|u| u.is_vegetarian.then_some(true)));

    let query = ingredients.join(" ");
    let meals = state.recipes.search_meals(&query).await?;

    let mut recipes: Vec<RecipeSummary> = meals.iter().map(summarize).collect();
    if let Some(vegetarian) = vegetarian_filter {
        recipes.retain(|r| r.is_vegetarian == vegetarian);
    }
    recipes.retain(|r| r.cooking_time <= payload.max_time_minutes);
    rank_by_match(&mut recipes, &ingredients);
    recipes.truncate(RESULT_CAP);

    info!(total = recipes.len(), "ingredient search completed");
    Ok(Json(SearchResponse {
        status: "success",
        message: if recipes.is_empty() {
            "No recipes found"
        } else {
            "Recipes found successfully"
        },
        data: SearchData {
            total_results: recipes.len(),
            recipes,
        },
    }))
}

#[instrument(skip(state))]
pub async fn search_by_name(
    State(state): State<AppState>,
    Query(params): Query<NameSearchQuery>,
) -> Result<Json<NameSearchResponse>, ApiError> {
    let query = params.query.as_deref().map(str::trim).unwrap_or_default();
    if query.is_empty() {
        return Err(ApiError::BadRequest("Query parameter is required".into()));
    }
    if query.len() > 100 {
        return Err(ApiError::BadRequest(
            "Query parameter too long (max 100 characters)".into(),
        ));
    }

    let meals = state.recipes.search_meals(query).await?;
    let recipes: Vec<RecipeDetails> = meals.iter().map(details).collect();

    Ok(Json(NameSearchResponse {
        status: "success",
        message: if recipes.is_empty() {
            "No recipes found"
        } else {
            "Recipes found successfully"
        },
        data: NameSearchData {
            query: query.to_string(),
            total_results: recipes.len(),
            recipes,
        },
    }))
}

#[instrument(skip(state, auth, payload))]
pub async fn save_search(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(payload): Json<SaveSearchRequest>,
) -> Result<(StatusCode, Json<SavedSearchResponse>), ApiError> {
    // Collapse runs of whitespace the way the original sanitizer did.
    let query = payload
        .search_query
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");

    if query.is_empty() {
        return Err(ApiError::BadRequest("Search query cannot be empty".into()));
    }
    if query.len() > 500 {
        return Err(ApiError::Validation(vec![FieldError {
            field: "search_query",
            message: "Search query must be between 1 and 500 characters",
        }]));
    }
    if payload
        .results_count
        .is_some_and(|n| !(0..=10_000).contains(&n))
    {
        return Err(ApiError::Validation(vec![FieldError {
            field: "results_count",
            message: "Results count must be a positive integer between 0 and 10000",
        }]));
    }

    if let Some(existing) =
        SearchRecord::find_recent_duplicate(&state.db, auth.user.id, &query).await?
    {
        SearchRecord::touch(&state.db, existing).await?;
        return Ok((
            StatusCode::OK,
            Json(SavedSearchResponse {
                status: "success",
                message: "Search query updated",
                data: SavedSearchData {
                    search_id: existing,
                    search_query: query,
                    is_duplicate: Some(true),
                    search_timestamp: None,
                    results_count: None,
                },
            }),
        ));
    }

    let record = SearchRecord::insert(
        &state.db,
        auth.user.id,
        &query,
        payload.search_filters.as_ref(),
        payload.results_count,
    )
    .await?;

    info!(user_id = %auth.user.id, query = %record.search_query, "search saved");
    Ok((
        StatusCode::CREATED,
        Json(SavedSearchResponse {
            status: "success",
            message: "Search query saved successfully",
            data: SavedSearchData {
                search_id: record.id,
                search_query: record.search_query,
                is_duplicate: None,
                search_timestamp: Some(record.search_timestamp),
                results_count: record.results_count,
            },
        }),
    ))
}

#[instrument(skip(state, auth))]
pub async fn search_history(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(params): Query<HistoryQuery>,
) -> Result<Json<HistoryResponse>, ApiError> {
    let limit = params.limit.unwrap_or(20).clamp(1, 100);
    let offset = params.offset.unwrap_or(0).max(0);

    let rows = SearchRecord::list_for_user(&state.db, auth.user.id, limit, offset).await?;
    let total = SearchRecord::count_for_user(&state.db, auth.user.id).await?;

    Ok(Json(HistoryResponse {
        status: "success",
        data: HistoryData {
            searches: rows.iter().map(SearchHistoryItem::from).collect(),
            pagination: Pagination {
                total,
                limit,
                offset,
                has_more: offset + limit < total,
            },
        },
    }))
}

#[instrument(skip(state, auth))]
pub async fn delete_search(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    let id: Uuid = id
        .parse()
        .map_err(|_| ApiError::BadRequest("Invalid search ID".into()))?;

    if !SearchRecord::delete(&state.db, id, auth.user.id).await? {
        return Err(ApiError::NotFound(
            "Search not found or not authorized to delete".into(),
        ));
    }

    Ok(Json(MessageResponse {
        status: "success",
        message: "Search deleted successfully",
    }))
}

#[instrument(skip(state, auth, body))]
pub async fn toggle_favourite(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(recipe_id): Path<String>,
    body: Option<Json<FavouriteBody>>,
) -> Result<Json<FavouriteToggleResponse>, ApiError> {
    // External recipe ids are numeric strings.
    if recipe_id.is_empty() || !recipe_id.chars().all(|c| c.is_ascii_digit()) {
        return Err(ApiError::BadRequest("Invalid recipe ID".into()));
    }

    let FavouriteBody { notes, rating } = body.map(|Json(b)| b).unwrap_or_default();
    if rating.is_some_and(|r| !(1..=5).contains(&r)) {
        return Err(ApiError::BadRequest("Rating must be between 1 and 5".into()));
    }

    if Favourite::find(&state.db, auth.user.id, &recipe_id)
        .await?
        .is_some()
    {
        Favourite::remove(&state.db, auth.user.id, &recipe_id).await?;
        info!(user_id = %auth.user.id, %recipe_id, "favourite removed");
        Ok(Json(FavouriteToggleResponse {
            status: "success",
            message: "Recipe removed from favourites",
            data: FavouriteToggleData {
                is_favorited: false,
            },
        }))
    } else {
        Favourite::insert(
            &state.db,
            auth.user.id,
            &recipe_id,
            notes.as_deref(),
            rating,
        )
        .await?;
        info!(user_id = %auth.user.id, %recipe_id, "favourite added");
        Ok(Json(FavouriteToggleResponse {
            status: "success",
            message: "Recipe added to favourites",
            data: FavouriteToggleData { is_favorited: true },
        }))
    }
}

#[instrument(skip(state, auth))]
pub async fn favourites(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<FavouritesResponse>, ApiError> {
    let rows = Favourite::list_for_user(&state.db, auth.user.id).await?;
    if rows.is_empty() {
        warn!(user_id = %auth.user.id, "no favourites yet");
    }
    Ok(Json(FavouritesResponse {
        status: "success",
        data: FavouritesData {
            favourites: rows.iter().map(FavouriteItem::from).collect(),
        },
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meal(id: &str, title: &str, ingredients: &[&str]) -> MealRecord {
        let mut raw = serde_json::json!({
            "idMeal": id,
            "strMeal": title,
            "strMealThumb": null,
            "strCategory": "Misc",
            "strArea": "Unknown",
            "strInstructions": "Cook it.",
            "strTags": null,
            "strYoutube": null,
            "strSource": null,
        });
        for (slot, ingredient) in ingredients.iter().enumerate() {
            raw[format!("strIngredient{}", slot + 1)] = serde_json::json!(ingredient);
        }
        serde_json::from_value(raw).expect("meal record")
    }

    #[test]
    fn cooking_time_is_clamped() {
        assert_eq!(estimate_cooking_time(1), 15);
        assert_eq!(estimate_cooking_time(5), 15);
        assert_eq!(estimate_cooking_time(8), 24);
        assert_eq!(estimate_cooking_time(15), 45);
        assert_eq!(estimate_cooking_time(20), 45);
    }

    #[test]
    fn vegetarian_heuristic_flags_meat_words() {
        let veg = vec!["tomato".to_string(), "basil".to_string()];
        assert!(looks_vegetarian(&veg));
        let meaty = vec!["tomato".to_string(), "chicken".to_string()];
        assert!(!looks_vegetarian(&meaty));
    }

    #[test]
    fn ranking_prefers_more_matches_then_speed() {
        let mut recipes = vec![
            summarize(&meal("1", "Slow Tomato Stack", &[
                "tomato", "basil", "onion", "garlic", "pepper", "salt", "oil", "sugar", "flour",
                "water", "yeast", "cheese", "cream", "butter", "milk",
            ])),
            summarize(&meal("2", "Quick Tomato Soup", &["tomato", "basil"])),
            summarize(&meal("3", "Plain Bread", &["flour", "water"])),
        ];
        rank_by_match(&mut recipes, &["tomato".to_string(), "basil".to_string()]);
        // Both tomato dishes match twice; the quicker one wins the tie.
        assert_eq!(recipes[0].id, "2");
        assert_eq!(recipes[1].id, "1");
        assert_eq!(recipes[2].id, "3");
    }

    #[test]
    fn match_count_is_substring_tolerant() {
        let recipe = summarize(&meal("1", "Soup", &["cherry tomatoes", "basil"]));
        assert_eq!(match_count(&recipe, &["tomato".to_string()]), 1);
        assert_eq!(match_count(&recipe, &["anchovy".to_string()]), 0);
    }

    #[test]
    fn details_cleans_instructions_and_tags() {
        let mut record = meal("1", "Soup", &["tomato"]);
        record.instructions = Some("Step one.\n\n   \nStep two.".into());
        record.tags = Some("Soup, Comfort ,".into());
        let d = details(&record);
        assert_eq!(d.instructions, "Step one.\nStep two.");
        assert_eq!(d.tags, vec!["Soup".to_string(), "Comfort".to_string()]);
    }

    #[test]
    fn details_defaults_missing_instructions() {
        let mut record = meal("1", "Soup", &["tomato"]);
        record.instructions = None;
        assert_eq!(details(&record).instructions, "No instructions available");
    }

    #[test]
    fn ingredient_search_validation() {
        let ok = IngredientSearchRequest {
            ingredients: vec!["tomato".into()],
            max_time_minutes: 30,
            is_vegetarian: None,
        };
        assert!(validate_ingredient_search(&ok).is_empty());

        let empty = IngredientSearchRequest {
            ingredients: vec![],
            max_time_minutes: 30,
            is_vegetarian: None,
        };
        assert_eq!(validate_ingredient_search(&empty)[0].field, "ingredients");

        let blank_item = IngredientSearchRequest {
            ingredients: vec!["  ".into()],
            max_time_minutes: 30,
            is_vegetarian: None,
        };
        assert!(!validate_ingredient_search(&blank_item).is_empty());

        let bad_time = IngredientSearchRequest {
            ingredients: vec!["tomato".into()],
            max_time_minutes: 0,
            is_vegetarian: None,
        };
        assert_eq!(
            validate_ingredient_search(&bad_time)[0].field,
            "maxTimeMinutes"
        );
    }
}
