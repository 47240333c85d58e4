use crate::models::{
    Scope,
    qr_code::{QrCodeDraft, QrCodeFilter, QrCodeModel, UpdateQrCode},
};
use sqlx::{Pool, Postgres};
use tracing::instrument;
use uuid::Uuid;

const QR_COLUMNS: &str = "id, user_id, category_id, name, content, qr_type, is_dynamic, short_key, \
    is_active, expires_at, max_scans, scan_count, foreground_color, background_color, size, \
    created_at, updated_at";

#[derive(Clone, Debug)]
pub struct QrCodeRepository {
    pool: Pool<Postgres>,
}

impl QrCodeRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    #[instrument(name = "Saving new QR code", skip(self, draft))]
    pub async fn store(
        &self,
        user_id: Uuid,
        short_key: &str,
        draft: &QrCodeDraft,
    ) -> anyhow::Result<QrCodeModel> {
        let qr = sqlx::query_as::<_, QrCodeModel>(&format!(
            "INSERT INTO qr_codes (id, user_id, category_id, name, content, qr_type, is_dynamic,
                short_key, expires_at, max_scans, foreground_color, background_color, size)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            RETURNING {QR_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(draft.category_id)
        .bind(&draft.name)
        .bind(&draft.content)
        .bind(draft.qr_type.as_str())
        .bind(draft.is_dynamic)
        .bind(short_key)
        .bind(draft.expires_at)
        .bind(draft.max_scans)
        .bind(&draft.foreground_color)
        .bind(&draft.background_color)
        .bind(draft.size)
        .fetch_one(&self.pool)
        .await?;
        Ok(qr)
    }

    pub async fn list(&self, scope: Scope, filter: &QrCodeFilter) -> anyhow::Result<Vec<QrCodeModel>> {
        let rows = sqlx::query_as::<_, QrCodeModel>(&format!(
            "SELECT {QR_COLUMNS} FROM qr_codes
            WHERE ($1::uuid IS NULL OR user_id = $1)
              AND ($2::uuid IS NULL OR category_id = $2)
              AND ($3::text IS NULL OR name ILIKE '%' || $3 || '%' OR content ILIKE '%' || $3 || '%')
            ORDER BY created_at DESC"
        ))
        .bind(scope.owner())
        .bind(filter.category_id)
        .bind(filter.search.as_deref().filter(|s| !s.trim().is_empty()))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn find(&self, scope: Scope, id: Uuid) -> anyhow::Result<Option<QrCodeModel>> {
        let qr = sqlx::query_as::<_, QrCodeModel>(&format!(
            "SELECT {QR_COLUMNS} FROM qr_codes WHERE id = $1 AND ($2::uuid IS NULL OR user_id = $2)"
        ))
        .bind(id)
        .bind(scope.owner())
        .fetch_optional(&self.pool)
        .await?;
        Ok(qr)
    }

    pub async fn find_by_key(&self, short_key: &str) -> anyhow::Result<Option<QrCodeModel>> {
        let qr = sqlx::query_as::<_, QrCodeModel>(&format!(
            "SELECT {QR_COLUMNS} FROM qr_codes WHERE short_key = $1"
        ))
        .bind(short_key)
        .fetch_optional(&self.pool)
        .await?;
        Ok(qr)
    }

    #[instrument(name = "Updating QR code", skip(self, update))]
    pub async fn update(
        &self,
        scope: Scope,
        id: Uuid,
        update: &UpdateQrCode,
    ) -> anyhow::Result<Option<QrCodeModel>> {
        let qr = sqlx::query_as::<_, QrCodeModel>(&format!(
            "UPDATE qr_codes SET
                name = COALESCE($3, name),
                content = COALESCE($4, content),
                is_active = COALESCE($5, is_active),
                category_id = CASE WHEN $6 THEN $7 ELSE category_id END,
                expires_at = CASE WHEN $8 THEN $9 ELSE expires_at END,
                max_scans = CASE WHEN $10 THEN $11 ELSE max_scans END,
                foreground_color = COALESCE($12, foreground_color),
                background_color = COALESCE($13, background_color),
                size = COALESCE($14, size),
                updated_at = now()
            WHERE id = $1 AND ($2::uuid IS NULL OR user_id = $2)
            RETURNING {QR_COLUMNS}"
        ))
        .bind(id)
        .bind(scope.owner())
        .bind(update.name.as_deref())
        .bind(update.content.as_deref())
        .bind(update.is_active)
        .bind(update.category_id.is_some())
        .bind(update.category_id.flatten())
        .bind(update.expires_at.is_some())
        .bind(update.expires_at.flatten())
        .bind(update.max_scans.is_some())
        .bind(update.max_scans.flatten())
        .bind(update.foreground_color.as_deref())
        .bind(update.background_color.as_deref())
        .bind(update.size)
        .fetch_optional(&self.pool)
        .await?;
        Ok(qr)
    }

    pub async fn delete(&self, scope: Scope, id: Uuid) -> anyhow::Result<bool> {
        let result =
            sqlx::query("DELETE FROM qr_codes WHERE id = $1 AND ($2::uuid IS NULL OR user_id = $2)")
                .bind(id)
                .bind(scope.owner())
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Bumps the scan counter by one unless the code became unavailable in the
    /// meantime. Returns the new count, `None` when nothing was updated.
    #[instrument(name = "Recording QR scan", skip(self))]
    pub async fn increment_scans(&self, id: Uuid) -> anyhow::Result<Option<i32>> {
        let count = sqlx::query_scalar::<_, i32>(
            "UPDATE qr_codes SET scan_count = scan_count + 1
            WHERE id = $1
              AND is_active
              AND (expires_at IS NULL OR expires_at > now())
              AND (max_scans IS NULL OR scan_count < max_scans)
            RETURNING scan_count",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(count)
    }

    pub async fn count(&self, scope: Scope) -> anyhow::Result<i64> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM qr_codes WHERE ($1::uuid IS NULL OR user_id = $1)",
        )
        .bind(scope.owner())
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }
}
