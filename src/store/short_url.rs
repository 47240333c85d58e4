use crate::models::{
    Scope,
    short_url::{NewShortUrl, ShortUrlModel, UpdateShortUrl},
};
use sqlx::{Pool, Postgres};
use tracing::instrument;
use uuid::Uuid;

const SHORT_URL_COLUMNS: &str = "id, user_id, category_id, short_code, original_url, title, \
    is_active, expires_at, max_clicks, click_count, created_at, updated_at";

#[derive(Clone, Debug)]
pub struct ShortUrlRepository {
    pg_pool: Pool<Postgres>,
}

impl ShortUrlRepository {
    pub fn new(pg_pool: Pool<Postgres>) -> Self {
        Self { pg_pool }
    }

    #[instrument(name = "Saving new short URL", skip(self, new))]
    pub async fn store(
        &self,
        short_code: &str,
        user_id: Uuid,
        new: &NewShortUrl,
    ) -> anyhow::Result<ShortUrlModel> {
        let row = sqlx::query_as::<_, ShortUrlModel>(&format!(
            "INSERT INTO short_urls (id, user_id, category_id, short_code, original_url, title,
                expires_at, max_clicks)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {SHORT_URL_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(new.category_id)
        .bind(short_code)
        .bind(new.original_url.trim())
        .bind(new.title.as_deref())
        .bind(new.expires_at)
        .bind(new.max_clicks)
        .fetch_one(&self.pg_pool)
        .await?;
        Ok(row)
    }

    pub async fn fetch(&self, short_code: &str) -> anyhow::Result<Option<ShortUrlModel>> {
        let row = sqlx::query_as::<_, ShortUrlModel>(&format!(
            "SELECT {SHORT_URL_COLUMNS} FROM short_urls WHERE short_code = $1"
        ))
        .bind(short_code)
        .fetch_optional(&self.pg_pool)
        .await?;
        Ok(row)
    }

    pub async fn find(&self, scope: Scope, id: Uuid) -> anyhow::Result<Option<ShortUrlModel>> {
        let row = sqlx::query_as::<_, ShortUrlModel>(&format!(
            "SELECT {SHORT_URL_COLUMNS} FROM short_urls
            WHERE id = $1 AND ($2::uuid IS NULL OR user_id = $2)"
        ))
        .bind(id)
        .bind(scope.owner())
        .fetch_optional(&self.pg_pool)
        .await?;
        Ok(row)
    }

    pub async fn list(&self, scope: Scope) -> anyhow::Result<Vec<ShortUrlModel>> {
        let rows = sqlx::query_as::<_, ShortUrlModel>(&format!(
            "SELECT {SHORT_URL_COLUMNS} FROM short_urls
            WHERE ($1::uuid IS NULL OR user_id = $1)
            ORDER BY created_at DESC"
        ))
        .bind(scope.owner())
        .fetch_all(&self.pg_pool)
        .await?;
        Ok(rows)
    }

    #[instrument(name = "Updating short URL", skip(self, update))]
    pub async fn update(
        &self,
        scope: Scope,
        id: Uuid,
        update: &UpdateShortUrl,
    ) -> anyhow::Result<Option<ShortUrlModel>> {
        let row = sqlx::query_as::<_, ShortUrlModel>(&format!(
            "UPDATE short_urls SET
                original_url = COALESCE($3, original_url),
                title = COALESCE($4, title),
                is_active = COALESCE($5, is_active),
                category_id = CASE WHEN $6 THEN $7 ELSE category_id END,
                expires_at = CASE WHEN $8 THEN $9 ELSE expires_at END,
                max_clicks = CASE WHEN $10 THEN $11 ELSE max_clicks END,
                updated_at = now()
            WHERE id = $1 AND ($2::uuid IS NULL OR user_id = $2)
            RETURNING {SHORT_URL_COLUMNS}"
        ))
        .bind(id)
        .bind(scope.owner())
        .bind(update.original_url.as_deref().map(str::trim))
        .bind(update.title.as_deref())
        .bind(update.is_active)
        .bind(update.category_id.is_some())
        .bind(update.category_id.flatten())
        .bind(update.expires_at.is_some())
        .bind(update.expires_at.flatten())
        .bind(update.max_clicks.is_some())
        .bind(update.max_clicks.flatten())
        .fetch_optional(&self.pg_pool)
        .await?;
        Ok(row)
    }

    /// Returns the deleted row so its cache entry can be evicted.
    pub async fn delete(&self, scope: Scope, id: Uuid) -> anyhow::Result<Option<ShortUrlModel>> {
        let row = sqlx::query_as::<_, ShortUrlModel>(&format!(
            "DELETE FROM short_urls WHERE id = $1 AND ($2::uuid IS NULL OR user_id = $2)
            RETURNING {SHORT_URL_COLUMNS}"
        ))
        .bind(id)
        .bind(scope.owner())
        .fetch_optional(&self.pg_pool)
        .await?;
        Ok(row)
    }

    /// Same contract as the QR scan counter: one click, only while available.
    #[instrument(name = "Recording short URL click", skip(self))]
    pub async fn increment_clicks(&self, id: Uuid) -> anyhow::Result<Option<i32>> {
        let count = sqlx::query_scalar::<_, i32>(
            "UPDATE short_urls SET click_count = click_count + 1
            WHERE id = $1
              AND is_active
              AND (expires_at IS NULL OR expires_at > now())
              AND (max_clicks IS NULL OR click_count < max_clicks)
            RETURNING click_count",
        )
        .bind(id)
        .fetch_optional(&self.pg_pool)
        .await?;
        Ok(count)
    }

    pub async fn count(&self, scope: Scope) -> anyhow::Result<i64> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM short_urls WHERE ($1::uuid IS NULL OR user_id = $1)",
        )
        .bind(scope.owner())
        .fetch_one(&self.pg_pool)
        .await?;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::UserRepository;

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires postgres (DATABASE_URL)"]
    async fn clicks_stop_at_the_limit(pool: Pool<Postgres>) -> anyhow::Result<()> {
        let user_id = UserRepository::new(pool.clone())
            .create_user("owner@example.com", "hash", None)
            .await?;
        let repo = ShortUrlRepository::new(pool);
        let new = NewShortUrl {
            original_url: "https://example.com/launch".into(),
            title: None,
            custom_code: None,
            category_id: None,
            expires_at: None,
            max_clicks: Some(1),
        };
        let short_url = repo.store("launch", user_id, &new).await?;

        assert_eq!(repo.increment_clicks(short_url.id).await?, Some(1));
        assert_eq!(repo.increment_clicks(short_url.id).await?, None);
        assert_eq!(repo.fetch("launch").await?.unwrap().click_count, 1);

        assert!(repo.store("launch", user_id, &new).await.is_err());
        Ok(())
    }
}
