use std::collections::HashMap;
use std::time::Duration;

use axum::http::StatusCode;
use serde::Deserialize;
use thiserror::Error;
use tracing::warn;

use crate::config::UpstreamConfig;

/// Failures of the upstream recipe API, mapped onto the statuses the
/// clients already handle. Auth flows are never affected by these.
#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("Request timeout - recipe API is taking too long to respond")]
    Timeout,
    #[error("Recipe API is currently unavailable")]
    Unavailable,
    #[error("Recipe API returned an unexpected response")]
    Protocol,
}

impl UpstreamError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Timeout => StatusCode::REQUEST_TIMEOUT,
            Self::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
            Self::Protocol => StatusCode::BAD_GATEWAY,
        }
    }
}

impl From<reqwest::Error> for UpstreamError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else if err.is_connect() {
            Self::Unavailable
        } else {
            Self::Protocol
        }
    }
}

#[derive(Debug, Deserialize)]
struct SearchEnvelope {
    meals: Option<Vec<MealRecord>>,
}

/// One meal as the upstream returns it. Ingredients come flattened into
/// strIngredient1..20 / strMeasure1..20 columns, collected via `extra`.
#[derive(Debug, Clone, Deserialize)]
pub struct MealRecord {
    #[serde(rename = "idMeal")]
    pub id: String,
    #[serde(rename = "strMeal")]
    pub title: String,
    #[serde(rename = "strMealThumb")]
    pub thumbnail: Option<String>,
    #[serde(rename = "strCategory")]
    pub category: Option<String>,
    #[serde(rename = "strArea")]
    pub area: Option<String>,
    #[serde(rename = "strInstructions")]
    pub instructions: Option<String>,
    #[serde(rename = "strTags")]
    pub tags: Option<String>,
    #[serde(rename = "strYoutube")]
    pub youtube: Option<String>,
    #[serde(rename = "strSource")]
    pub source: Option<String>,
    #[serde(flatten)]
    pub extra: HashMap<String, Option<String>>,
}

impl MealRecord {
    /// Non-empty (ingredient, measure) pairs in slot order.
    pub fn ingredient_pairs(&self) -> Vec<(String, Option<String>)> {
        (1..=20)
            .filter_map(|slot| {
                let ingredient = self
                    .extra
                    .get(&format!("strIngredient{slot}"))
                    .and_then(|v| v.as_deref())
                    .map(str::trim)
                    .filter(|v| !v.is_empty())?;
                let measure = self
                    .extra
                    .get(&format!("strMeasure{slot}"))
                    .and_then(|v| v.as_deref())
                    .map(str::trim)
                    .filter(|v| !v.is_empty())
                    .map(str::to_string);
                Some((ingredient.to_string(), measure))
            })
            .collect()
    }
}

/// Thin client over the public meal lookup API. Every request carries the
/// configured timeout; the builder is constructed once at startup.
pub struct MealDbClient {
    http: reqwest::Client,
    base_url: String,
}

impl MealDbClient {
    pub fn new(cfg: &UpstreamConfig) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(cfg.timeout_secs))
            .user_agent("RecipeApp/1.0")
            .build()?;
        Ok(Self {
            http,
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Free-text name search. An empty `meals` field upstream means no hits.
    pub async fn search_meals(&self, query: &str) -> Result<Vec<MealRecord>, UpstreamError> {
        let url = format!("{}/search.php", self.base_url);
        let response = self.http.get(&url).query(&[("s", query)]).send().await?;
        if !response.status().is_success() {
            warn!(status = %response.status(), "recipe API error status");
            return Err(UpstreamError::Protocol);
        }
        let envelope: SearchEnvelope = response.json().await?;
        Ok(envelope.meals.unwrap_or_default())
    }
}
