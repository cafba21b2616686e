use sqlx::PgPool;
use time::OffsetDateTime;
use uuid::Uuid;

/// A recipe pinned by a user; recipe_id is the external API identifier.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Favourite {
    pub id: Uuid,
    pub user_id: Uuid,
    pub recipe_id: String,
    pub notes: Option<String>,
    pub rating: Option<i32>,
    pub added_at: OffsetDateTime,
}

impl Favourite {
    pub async fn find(
        db: &PgPool,
        user_id: Uuid,
        recipe_id: &str,
    ) -> sqlx::Result<Option<Favourite>> {
        sqlx::query_as::<_, Favourite>(
            "SELECT id, user_id, recipe_id, notes, rating, added_at \
             FROM favourites WHERE user_id = $1 AND recipe_id = $2",
        )
        .bind(user_id)
        .bind(recipe_id)
        .fetch_optional(db)
        .await
    }

    pub async fn insert(
        db: &PgPool,
        user_id: Uuid,
        recipe_id: &str,
        notes: Option<&str>,
        rating: Option<i32>,
    ) -> sqlx::Result<()> {
        sqlx::query(
            "INSERT INTO favourites (user_id, recipe_id, notes, rating) VALUES ($1, $2, $3, $4)",
        )
        .bind(user_id)
        .bind(recipe_id)
        .bind(notes)
        .bind(rating)
        .execute(db)
        .await?;
        Ok(())
    }

    pub async fn remove(db: &PgPool, user_id: Uuid, recipe_id: &str) -> sqlx::Result<()> {
        sqlx::query("DELETE FROM favourites WHERE user_id = $1 AND recipe_id = $2")
            .bind(user_id)
            .bind(recipe_id)
            .execute(db)
            .await?;
        Ok(())
    }

    pub async fn list_for_user(db: &PgPool, user_id: Uuid) -> sqlx::Result<Vec<Favourite>> {
        sqlx::query_as::<_, Favourite>(
            "SELECT id, user_id, recipe_id, notes, rating, added_at \
             FROM favourites WHERE user_id = $1 ORDER BY added_at DESC",
        )
        .bind(user_id)
        .fetch_all(db)
        .await
    }
}

/// One saved search. Near-duplicate saves within five minutes only refresh
/// the timestamp of the existing row.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SearchRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    pub search_query: String,
    pub search_filters: Option<serde_json::Value>,
    pub results_count: Option<i32>,
    pub search_timestamp: OffsetDateTime,
}

impl SearchRecord {
    pub async fn find_recent_duplicate(
        db: &PgPool,
        user_id: Uuid,
        query: &str,
    ) -> sqlx::Result<Option<Uuid>> {
        sqlx::query_scalar::<_, Uuid>(
            "SELECT id FROM search_history \
             WHERE user_id = $1 AND search_query = $2 \
             AND search_timestamp > now() - INTERVAL '5 minutes' \
             LIMIT 1",
        )
        .bind(user_id)
        .bind(query)
        .fetch_optional(db)
        .await
    }

    pub async fn touch(db: &PgPool, id: Uuid) -> sqlx::Result<()> {
        sqlx::query("UPDATE search_history SET search_timestamp = now() WHERE id = $1")
            .bind(id)
            .execute(db)
            .await?;
        Ok(())
    }

    pub async fn insert(
        db: &PgPool,
        user_id: Uuid,
        query: &str,
        filters: Option<&serde_json::Value>,
        results_count: Option<i32>,
    ) -> sqlx::Result<SearchRecord> {
        sqlx::query_as::<_, SearchRecord>(
            "INSERT INTO search_history (user_id, search_query, search_filters, results_count) \
             VALUES ($1, $2, $3, $4) \
             RETURNING id, user_id, search_query, search_filters, results_count, search_timestamp",
        )
        .bind(user_id)
        .bind(query)
        .bind(filters)
        .bind(results_count)
        .fetch_one(db)
        .await
    }

    pub async fn list_for_user(
        db: &PgPool,
        user_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> sqlx::Result<Vec<SearchRecord>> {
        sqlx::query_as::<_, SearchRecord>(
            "SELECT id, user_id, search_query, search_filters, results_count, search_timestamp \
             FROM search_history WHERE user_id = $1 \
             ORDER BY search_timestamp DESC LIMIT $2 OFFSET $3",
        )
        .bind(user_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(db)
        .await
    }

    pub async fn count_for_user(db: &PgPool, user_id: Uuid) -> sqlx::Result<i64> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM search_history WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(db)
            .await
    }

    /// True when a row owned by this user was deleted.
    pub async fn delete(db: &PgPool, id: Uuid, user_id: Uuid) -> sqlx::Result<bool> {
        let result = sqlx::query("DELETE FROM search_history WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(db)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
