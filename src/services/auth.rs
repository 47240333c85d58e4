use crate::{
    errors::AuthError,
    models::{
        Scope,
        user::{Role, UserModel},
    },
    store::user::UserRepository,
};
use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

pub const MIN_PASSWORD_LENGTH: usize = 8;

pub struct Keys {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl Keys {
    pub fn new(secret: &[u8]) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
        }
    }
}

impl std::fmt::Debug for Keys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Keys(..)")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub role: Role,
    pub exp: usize,
}

impl Claims {
    pub fn user_id(&self) -> Result<Uuid, AuthError> {
        Uuid::parse_str(&self.sub).map_err(|_| AuthError::InvalidToken)
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Admins act on every row, everyone else on their own.
    pub fn scope(&self) -> Result<Scope, AuthError> {
        if self.is_admin() {
            Ok(Scope::All)
        } else {
            Ok(Scope::Owner(self.user_id()?))
        }
    }
}

impl Display for Claims {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "User: {} ({})", self.sub, self.role.as_str())
    }
}

#[derive(Clone, Debug)]
pub struct AuthService {
    repo: UserRepository,
    keys: Arc<Keys>,
    token_ttl: chrono::Duration,
}

impl AuthService {
    pub fn new(repo: UserRepository, jwt_secret: &SecretString, token_ttl_hours: i64) -> Self {
        Self {
            repo,
            keys: Arc::new(Keys::new(jwt_secret.expose_secret().as_bytes())),
            token_ttl: chrono::Duration::hours(token_ttl_hours),
        }
    }

    #[instrument(name = "AuthService: Register", skip(self, password), fields(user_email = %email))]
    pub async fn register(
        &self,
        email: &str,
        password: &str,
        name: Option<&str>,
    ) -> Result<Uuid, AuthError> {
        let email = email.trim().to_lowercase();
        if email.is_empty() || password.is_empty() {
            return Err(AuthError::MissingCredentials);
        }
        if password.chars().count() < MIN_PASSWORD_LENGTH {
            return Err(AuthError::WeakPassword);
        }

        let salt = SaltString::generate(&mut OsRng);
        let hash = Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| {
                tracing::error!("Failed to hash password: {:?}", e);
                AuthError::Internal
            })?
            .to_string();

        self.repo
            .create_user(&email, &hash, name)
            .await
            .map_err(|e| match e.downcast_ref::<sqlx::Error>() {
                Some(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                    tracing::warn!("Registration failed: email already taken");
                    AuthError::UserAlreadyExists
                }
                _ => {
                    tracing::error!("Database error during registration: {:?}", e);
                    AuthError::Internal
                }
            })
    }

    #[instrument(
        name = "AuthService: Login attempt",
        skip(self, password),
        fields(user_email = %email)
    )]
    pub async fn login(&self, email: &str, password: &str) -> Result<UserModel, AuthError> {
        if email.trim().is_empty() || password.is_empty() {
            return Err(AuthError::MissingCredentials);
        }

        // 1. Fetch User
        let user = self
            .repo
            .find_by_email(&email.trim().to_lowercase())
            .await
            .map_err(|e| {
                tracing::error!("Database error during login: {:?}", e);
                AuthError::Internal
            })?;

        let user = match user {
            Some(u) => u,
            None => {
                tracing::warn!("Login failed: User not found");
                return Err(AuthError::WrongCredentials);
            }
        };

        // 2. Parse Hash
        let parsed_hash = PasswordHash::new(&user.password_hash).map_err(|e| {
            tracing::error!("Critical: Failed to parse password hash from DB: {:?}", e);
            AuthError::Internal
        })?;

        // 3. Verify Password
        if Argon2::default()
            .verify_password(password.as_bytes(), &parsed_hash)
            .is_err()
        {
            tracing::warn!("Login failed: Invalid password provided");
            return Err(AuthError::WrongCredentials);
        }

        if !user.is_active {
            tracing::warn!("Login failed: account disabled");
            return Err(AuthError::AccountDisabled);
        }

        tracing::info!("User authenticated successfully");
        Ok(user)
    }

    pub fn issue_token(&self, user: &UserModel) -> Result<String, AuthError> {
        let claims = Claims {
            sub: user.id.to_string(),
            role: user.role,
            exp: (chrono::Utc::now() + self.token_ttl).timestamp() as usize,
        };
        encode(&Header::default(), &claims, &self.keys.encoding).map_err(|e| {
            tracing::error!("JWT Encoding failed: {:?}", e);
            AuthError::TokenCreation
        })
    }

    pub fn verify_token(&self, token: &str) -> Result<Claims, AuthError> {
        decode::<Claims>(token, &self.keys.decoding, &Validation::default())
            .map(|data| data.claims)
            .map_err(|e| {
                tracing::warn!("JWT decoding failed: {:?}", e);
                AuthError::InvalidToken
            })
    }

    /// Re-reads the account behind verified `claims`: deleted accounts are
    /// 401, disabled ones 403, and the role always comes from the row.
    #[instrument(name = "AuthService: Refresh claims", skip(self), fields(user = %claims))]
    pub async fn refresh_claims(&self, claims: Claims) -> Result<Claims, AuthError> {
        let user = self
            .repo
            .find_by_id(claims.user_id()?)
            .await
            .map_err(|e| {
                tracing::error!("Database error while loading session user: {:?}", e);
                AuthError::Internal
            })?
            .ok_or_else(|| {
                tracing::warn!("Session refers to a deleted account");
                AuthError::InvalidToken
            })?;

        if !user.is_active {
            tracing::warn!("Session refused: account disabled");
            return Err(AuthError::AccountDisabled);
        }

        Ok(Claims {
            role: user.role,
            ..claims
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::user::UpdateUser;
    use sqlx::postgres::PgPoolOptions;

    pub(crate) fn service() -> AuthService {
        let pool = PgPoolOptions::new().connect_lazy("postgres://localhost/unused").unwrap();
        AuthService::new(
            UserRepository::new(pool),
            &SecretString::from("test-secret"),
            1,
        )
    }

    fn user(role: Role) -> UserModel {
        UserModel {
            id: Uuid::new_v4(),
            email: "ada@example.com".into(),
            password_hash: String::new(),
            name: None,
            role,
            group_id: None,
            is_active: true,
            created_at: chrono::Utc::now(),
        }
    }

    #[tokio::test]
    async fn issued_tokens_verify_and_carry_the_role() {
        let auth = service();
        let admin = user(Role::Admin);
        let token = auth.issue_token(&admin).unwrap();

        let claims = auth.verify_token(&token).unwrap();
        assert_eq!(claims.user_id().unwrap(), admin.id);
        assert!(claims.is_admin());
        assert_eq!(claims.scope().unwrap(), Scope::All);
    }

    #[tokio::test]
    async fn regular_users_are_scoped_to_themselves() {
        let auth = service();
        let member = user(Role::User);
        let claims = auth.verify_token(&auth.issue_token(&member).unwrap()).unwrap();
        assert_eq!(claims.scope().unwrap(), Scope::Owner(member.id));
    }

    #[tokio::test]
    async fn tokens_signed_with_another_secret_are_rejected() {
        let other = AuthService::new(
            UserRepository::new(
                PgPoolOptions::new().connect_lazy("postgres://localhost/unused").unwrap(),
            ),
            &SecretString::from("another-secret"),
            1,
        );
        let token = other.issue_token(&user(Role::User)).unwrap();
        assert!(matches!(
            service().verify_token(&token),
            Err(AuthError::InvalidToken)
        ));
    }

    #[tokio::test]
    async fn registration_validates_before_touching_the_database() {
        let auth = service();
        assert!(matches!(
            auth.register("", "password123", None).await,
            Err(AuthError::MissingCredentials)
        ));
        assert!(matches!(
            auth.register("ada@example.com", "short", None).await,
            Err(AuthError::WeakPassword)
        ));
        assert!(matches!(
            auth.login("ada@example.com", "").await,
            Err(AuthError::MissingCredentials)
        ));
    }

    async fn stored_claims(pool: &sqlx::PgPool, auth: &AuthService, email: &str) -> Claims {
        let repo = UserRepository::new(pool.clone());
        let id = repo.create_user(email, "hash", None).await.unwrap();
        let user = repo.find_by_id(id).await.unwrap().unwrap();
        auth.verify_token(&auth.issue_token(&user).unwrap()).unwrap()
    }

    fn service_over(pool: &sqlx::PgPool) -> AuthService {
        AuthService::new(
            UserRepository::new(pool.clone()),
            &SecretString::from("test-secret"),
            1,
        )
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires postgres (DATABASE_URL)"]
    async fn disabled_accounts_lose_their_sessions(pool: sqlx::PgPool) {
        let auth = service_over(&pool);
        let claims = stored_claims(&pool, &auth, "ada@example.com").await;
        assert!(auth.refresh_claims(claims.clone()).await.is_ok());

        let disable = UpdateUser {
            is_active: Some(false),
            ..UpdateUser::default()
        };
        UserRepository::new(pool.clone())
            .update(claims.user_id().unwrap(), &disable)
            .await
            .unwrap();
        assert!(matches!(
            auth.refresh_claims(claims).await,
            Err(AuthError::AccountDisabled)
        ));
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires postgres (DATABASE_URL)"]
    async fn deleted_accounts_lose_their_sessions(pool: sqlx::PgPool) {
        let auth = service_over(&pool);
        let claims = stored_claims(&pool, &auth, "ada@example.com").await;
        UserRepository::new(pool.clone())
            .delete(claims.user_id().unwrap())
            .await
            .unwrap();
        assert!(matches!(
            auth.refresh_claims(claims).await,
            Err(AuthError::InvalidToken)
        ));
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires postgres (DATABASE_URL)"]
    async fn demoted_admins_get_the_stored_role(pool: sqlx::PgPool) {
        let auth = service_over(&pool);
        // first account is the admin
        let claims = stored_claims(&pool, &auth, "root@example.com").await;
        assert!(claims.is_admin());

        let demote = UpdateUser {
            role: Some(Role::User),
            ..UpdateUser::default()
        };
        UserRepository::new(pool.clone())
            .update(claims.user_id().unwrap(), &demote)
            .await
            .unwrap();
        let refreshed = auth.refresh_claims(claims).await.unwrap();
        assert!(!refreshed.is_admin());
    }
}
