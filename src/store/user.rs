use crate::models::user::{Role, UpdateUser, UserModel};
use sqlx::{Pool, Postgres};
use tracing::instrument;
use uuid::Uuid;

/// Advisory lock key taken by every sign-up.
const SIGNUP_LOCK: i64 = 0x7172_6c69_6e6b;

const USER_COLUMNS: &str = "id, email, password_hash, name, role, group_id, is_active, created_at";

#[derive(Clone, Debug)]
pub struct UserRepository {
    pool: Pool<Postgres>,
}

impl UserRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// The very first account becomes an admin. Sign-ups hold a transaction
    /// advisory lock so two concurrent first registrations cannot both see an
    /// empty table.
    #[instrument(name = "Saving new user to database", skip(self, password_hash))]
    pub async fn create_user(
        &self,
        email: &str,
        password_hash: &str,
        name: Option<&str>,
    ) -> anyhow::Result<Uuid> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("SELECT pg_advisory_xact_lock($1)")
            .bind(SIGNUP_LOCK)
            .execute(&mut *tx)
            .await?;

        let id = sqlx::query_scalar::<_, Uuid>(
            r#"INSERT INTO users (id, email, password_hash, name, role)
            VALUES ($1, $2, $3, $4,
                CASE WHEN EXISTS (SELECT 1 FROM users) THEN 'user' ELSE 'admin' END)
            RETURNING id"#,
        )
        .bind(Uuid::new_v4())
        .bind(email)
        .bind(password_hash)
        .bind(name)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            tracing::error!("Failed to execute query: {:?}", e);
            e
        })?;

        tx.commit().await?;
        Ok(id)
    }

    #[instrument(name = "Fetching user by email from database", skip(self))]
    pub async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<UserModel>> {
        let user = sqlx::query_as::<_, UserModel>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to fetch user: {:?}", e);
            e
        })?;
        Ok(user)
    }

    pub async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<UserModel>> {
        let user = sqlx::query_as::<_, UserModel>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    pub async fn list(&self, group_id: Option<Uuid>) -> anyhow::Result<Vec<UserModel>> {
        let users = sqlx::query_as::<_, UserModel>(&format!(
            "SELECT {USER_COLUMNS} FROM users
            WHERE ($1::uuid IS NULL OR group_id = $1)
            ORDER BY created_at"
        ))
        .bind(group_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(users)
    }

    #[instrument(name = "Updating user", skip(self, update))]
    pub async fn update(&self, id: Uuid, update: &UpdateUser) -> anyhow::Result<Option<UserModel>> {
        let user = sqlx::query_as::<_, UserModel>(&format!(
            "UPDATE users SET
                name = COALESCE($2, name),
                role = COALESCE($3, role),
                group_id = CASE WHEN $4 THEN $5 ELSE group_id END,
                is_active = COALESCE($6, is_active)
            WHERE id = $1
            RETURNING {USER_COLUMNS}"
        ))
        .bind(id)
        .bind(update.name.as_deref())
        .bind(update.role.as_ref().map(Role::as_str))
        .bind(update.group_id.is_some())
        .bind(update.group_id.flatten())
        .bind(update.is_active)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    pub async fn delete(&self, id: Uuid) -> anyhow::Result<bool> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires postgres (DATABASE_URL)"]
    async fn concurrent_first_signups_yield_one_admin(pool: Pool<Postgres>) -> anyhow::Result<()> {
        let repo = UserRepository::new(pool);
        let (a, b, c) = tokio::join!(
            repo.create_user("a@example.com", "hash", None),
            repo.create_user("b@example.com", "hash", None),
            repo.create_user("c@example.com", "hash", None),
        );
        a?;
        b?;
        c?;

        let admins = repo
            .list(None)
            .await?
            .into_iter()
            .filter(|user| user.role == Role::Admin)
            .count();
        assert_eq!(admins, 1);
        Ok(())
    }
}
