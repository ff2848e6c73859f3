use async_trait::async_trait;
use sqlx::PgPool;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::auth::repo_types::{UserAccount, UserRow};
use crate::error::StoreError;

/// Persistence for user accounts. Every method is a single atomic unit per account.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn find_by_email(&self, email: &str) -> Result<Option<UserAccount>, StoreError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<UserAccount>, StoreError>;

    /// Fails with `StoreError::DuplicateEmail` if the email is taken.
    async fn create(&self, email: &str, password_hash: &str) -> Result<UserAccount, StoreError>;

    /// Write back `password_hash` and the pending-reset fields.
    async fn save(&self, account: &UserAccount) -> Result<(), StoreError>;

    /// Conditionally swap in `new_password_hash` and clear the pending reset,
    /// only if `token_hash` matches and has not expired at `now`.
    /// Returns `None` when nothing matched.
    async fn consume_reset_token(
        &self,
        token_hash: &str,
        new_password_hash: &str,
        now: OffsetDateTime,
    ) -> Result<Option<UserAccount>, StoreError>;
}

#[derive(Clone)]
pub struct PgCredentialStore {
    db: PgPool,
}

impl PgCredentialStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl CredentialStore for PgCredentialStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<UserAccount>, StoreError> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, email, password_hash, reset_token_hash, reset_token_expires_at, created_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.db)
        .await?;
        Ok(row.map(UserAccount::from))
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<UserAccount>, StoreError> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, email, password_hash, reset_token_hash, reset_token_expires_at, created_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        Ok(row.map(UserAccount::from))
    }

    async fn create(&self, email: &str, password_hash: &str) -> Result<UserAccount, StoreError> {
        // Uniqueness is enforced by the index; a violation maps to DuplicateEmail.
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            INSERT INTO users (email, password_hash)
            VALUES ($1, $2)
            RETURNING id, email, password_hash, reset_token_hash, reset_token_expires_at, created_at
            "#,
        )
        .bind(email)
        .bind(password_hash)
        .fetch_one(&self.db)
        .await?;
        Ok(row.into())
    }

    async fn save(&self, account: &UserAccount) -> Result<(), StoreError> {
        let (token_hash, expires_at) = match &account.reset {
            Some(r) => (Some(r.token_hash.as_str()), Some(r.expires_at)),
            None => (None, None),
        };
        sqlx::query(
            r#"
            UPDATE users
               SET password_hash = $2,
                   reset_token_hash = $3,
                   reset_token_expires_at = $4
             WHERE id = $1
            "#,
        )
        .bind(account.id)
        .bind(&account.password_hash)
        .bind(token_hash)
        .bind(expires_at)
        .execute(&self.db)
        .await?;
        Ok(())
    }

    async fn consume_reset_token(
        &self,
        token_hash: &str,
        new_password_hash: &str,
        now: OffsetDateTime,
    ) -> Result<Option<UserAccount>, StoreError> {
        // A concurrent second UPDATE re-checks the WHERE clause after the first
        // commits and matches zero rows.
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            UPDATE users
               SET password_hash = $2,
                   reset_token_hash = NULL,
                   reset_token_expires_at = NULL
             WHERE reset_token_hash = $1
               AND reset_token_expires_at > $3
            RETURNING id, email, password_hash, reset_token_hash, reset_token_expires_at, created_at
            "#,
        )
        .bind(token_hash)
        .bind(new_password_hash)
        .bind(now)
        .fetch_optional(&self.db)
        .await?;
        Ok(row.map(UserAccount::from))
    }
}
