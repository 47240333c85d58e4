use crate::models::{Scope, category::CategoryModel};
use sqlx::{Pool, Postgres};
use uuid::Uuid;

#[derive(Clone, Debug)]
pub struct CategoryRepository {
    pool: Pool<Postgres>,
}

impl CategoryRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    pub async fn create(
        &self,
        user_id: Uuid,
        name: &str,
        color: Option<&str>,
    ) -> anyhow::Result<CategoryModel> {
        let category = sqlx::query_as::<_, CategoryModel>(
            "INSERT INTO categories (id, user_id, name, color) VALUES ($1, $2, $3, $4)
            RETURNING id, user_id, name, color, created_at",
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(name)
        .bind(color)
        .fetch_one(&self.pool)
        .await?;
        Ok(category)
    }

    pub async fn list(&self, scope: Scope) -> anyhow::Result<Vec<CategoryModel>> {
        let categories = sqlx::query_as::<_, CategoryModel>(
            "SELECT id, user_id, name, color, created_at FROM categories
            WHERE ($1::uuid IS NULL OR user_id = $1)
            ORDER BY name",
        )
        .bind(scope.owner())
        .fetch_all(&self.pool)
        .await?;
        Ok(categories)
    }

    pub async fn find(&self, scope: Scope, id: Uuid) -> anyhow::Result<Option<CategoryModel>> {
        let category = sqlx::query_as::<_, CategoryModel>(
            "SELECT id, user_id, name, color, created_at FROM categories
            WHERE id = $1 AND ($2::uuid IS NULL OR user_id = $2)",
        )
        .bind(id)
        .bind(scope.owner())
        .fetch_optional(&self.pool)
        .await?;
        Ok(category)
    }

    pub async fn update(
        &self,
        scope: Scope,
        id: Uuid,
        name: &str,
        color: Option<&str>,
    ) -> anyhow::Result<Option<CategoryModel>> {
        let category = sqlx::query_as::<_, CategoryModel>(
            "UPDATE categories SET name = $3, color = $4
            WHERE id = $1 AND ($2::uuid IS NULL OR user_id = $2)
            RETURNING id, user_id, name, color, created_at",
        )
        .bind(id)
        .bind(scope.owner())
        .bind(name)
        .bind(color)
        .fetch_optional(&self.pool)
        .await?;
        Ok(category)
    }

    /// QR codes and short URLs in the category become uncategorized.
    pub async fn delete(&self, scope: Scope, id: Uuid) -> anyhow::Result<bool> {
        let result =
            sqlx::query("DELETE FROM categories WHERE id = $1 AND ($2::uuid IS NULL OR user_id = $2)")
                .bind(id)
                .bind(scope.owner())
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }
}
