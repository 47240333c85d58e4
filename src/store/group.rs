use crate::models::group::GroupModel;
use sqlx::{Pool, Postgres};
use uuid::Uuid;

#[derive(Clone, Debug)]
pub struct GroupRepository {
    pool: Pool<Postgres>,
}

impl GroupRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    pub async fn create(&self, name: &str, description: Option<&str>) -> anyhow::Result<GroupModel> {
        let group = sqlx::query_as::<_, GroupModel>(
            "INSERT INTO groups (id, name, description) VALUES ($1, $2, $3)
            RETURNING id, name, description, created_at",
        )
        .bind(Uuid::new_v4())
        .bind(name)
        .bind(description)
        .fetch_one(&self.pool)
        .await?;
        Ok(group)
    }

    pub async fn list(&self) -> anyhow::Result<Vec<GroupModel>> {
        let groups = sqlx::query_as::<_, GroupModel>(
            "SELECT id, name, description, created_at FROM groups ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(groups)
    }

    pub async fn find(&self, id: Uuid) -> anyhow::Result<Option<GroupModel>> {
        let group = sqlx::query_as::<_, GroupModel>(
            "SELECT id, name, description, created_at FROM groups WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(group)
    }

    pub async fn update(
        &self,
        id: Uuid,
        name: &str,
        description: Option<&str>,
    ) -> anyhow::Result<Option<GroupModel>> {
        let group = sqlx::query_as::<_, GroupModel>(
            "UPDATE groups SET name = $2, description = $3 WHERE id = $1
            RETURNING id, name, description, created_at",
        )
        .bind(id)
        .bind(name)
        .bind(description)
        .fetch_optional(&self.pool)
        .await?;
        Ok(group)
    }

    /// Members are detached by the `ON DELETE SET NULL` foreign key.
    pub async fn delete(&self, id: Uuid) -> anyhow::Result<bool> {
        let result = sqlx::query("DELETE FROM groups WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
