use serde_json::{Map, Value};
use sqlx::{Pool, Postgres, types::Json};

#[derive(Clone, Debug)]
pub struct SettingsRepository {
    pool: Pool<Postgres>,
}

impl SettingsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    pub async fn all(&self) -> anyhow::Result<Map<String, Value>> {
        let rows = sqlx::query_as::<_, (String, Json<Value>)>("SELECT key, value FROM settings")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows
            .into_iter()
            .map(|(key, Json(value))| (key, value))
            .collect())
    }

    pub async fn upsert(&self, key: &str, value: &Value) -> anyhow::Result<()> {
        sqlx::query(
            "INSERT INTO settings (key, value, updated_at) VALUES ($1, $2, now())
            ON CONFLICT (key) DO UPDATE SET value = EXCLUDED.value, updated_at = now()",
        )
        .bind(key)
        .bind(Json(value))
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
