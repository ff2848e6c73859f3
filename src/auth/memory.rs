use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::auth::repo::CredentialStore;
use crate::auth::repo_types::UserAccount;
use crate::auth::reset::constant_time_eq;
use crate::error::StoreError;

/// In-process store for tests. One mutex over the whole map gives the same
/// per-record atomicity as the single-statement Postgres updates.
#[derive(Default)]
pub struct MemoryCredentialStore {
    users: Mutex<HashMap<Uuid, UserAccount>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<Uuid, UserAccount>>, StoreError> {
        self.users
            .lock()
            .map_err(|_| StoreError::Backend(anyhow::anyhow!("memory store poisoned")))
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<UserAccount>, StoreError> {
        Ok(self.lock()?.values().find(|u| u.email == email).cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<UserAccount>, StoreError> {
        Ok(self.lock()?.get(&id).cloned())
    }

    async fn create(&self, email: &str, password_hash: &str) -> Result<UserAccount, StoreError> {
        let mut users = self.lock()?;
        if users.values().any(|u| u.email == email) {
            return Err(StoreError::DuplicateEmail);
        }
        let account = UserAccount {
            id: Uuid::new_v4(),
            email: email.to_string(),
            password_hash: password_hash.to_string(),
            reset: None,
            created_at: OffsetDateTime::now_utc(),
        };
        users.insert(account.id, account.clone());
        Ok(account)
    }

    async fn save(&self, account: &UserAccount) -> Result<(), StoreError> {
        let mut users = self.lock()?;
        if let Some(stored) = users.get_mut(&account.id) {
            stored.password_hash = account.password_hash.clone();
            stored.reset = account.reset.clone();
        }
        Ok(())
    }

    async fn consume_reset_token(
        &self,
        token_hash: &str,
        new_password_hash: &str,
        now: OffsetDateTime,
    ) -> Result<Option<UserAccount>, StoreError> {
        let mut users = self.lock()?;
        let hit = users.values_mut().find(|u| match &u.reset {
            Some(r) => {
                constant_time_eq(r.token_hash.as_bytes(), token_hash.as_bytes())
                    && r.is_live_at(now)
            }
            None => false,
        });
        Ok(hit.map(|u| {
            u.password_hash = new_password_hash.to_string();
            u.reset = None;
            u.clone()
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::repo_types::PendingReset;
    use time::Duration;

    #[tokio::test]
    async fn create_rejects_duplicate_email() {
        let store = MemoryCredentialStore::new();
        store.create("a@x.com", "h1").await.expect("first create");
        let err = store.create("a@x.com", "h2").await.unwrap_err();
        assert!(matches!(err, StoreError::DuplicateEmail));
    }

    #[tokio::test]
    async fn email_lookup_is_case_sensitive() {
        let store = MemoryCredentialStore::new();
        store.create("A@x.com", "h").await.unwrap();
        assert!(store.find_by_email("a@x.com").await.unwrap().is_none());
        store.create("a@x.com", "h").await.expect("different case is a different email");
    }

    #[tokio::test]
    async fn consume_clears_reset_and_swaps_hash_once() {
        let store = MemoryCredentialStore::new();
        let mut account = store.create("a@x.com", "old").await.unwrap();
        let now = OffsetDateTime::now_utc();
        account.reset = Some(PendingReset {
            token_hash: "digest".into(),
            expires_at: now + Duration::hours(1),
        });
        store.save(&account).await.unwrap();

        let updated = store
            .consume_reset_token("digest", "new", now)
            .await
            .unwrap()
            .expect("first consume matches");
        assert_eq!(updated.password_hash, "new");
        assert!(updated.reset.is_none());

        assert!(store
            .consume_reset_token("digest", "newer", now)
            .await
            .unwrap()
            .is_none());
        let stored = store.find_by_id(account.id).await.unwrap().unwrap();
        assert_eq!(stored.password_hash, "new");
    }
}
