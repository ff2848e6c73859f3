//! Password-reset token lifecycle.
//!
//! An account is either idle or has one pending reset. Requesting a reset
//! replaces any previous token; confirming consumes it together with the
//! password change in a single conditional write. Only the SHA-256 digest of
//! a token is stored.

use std::sync::Arc;

use axum::extract::FromRef;
use rand::{rngs::OsRng, RngCore};
use sha2::{Digest, Sha256};
use time::{Duration, OffsetDateTime};
use tracing::{info, instrument, warn};

use crate::{
    auth::{
        password::hash_password,
        repo::CredentialStore,
        repo_types::PendingReset,
        services::validate_new_password,
    },
    config::MAX_TTL_MINUTES,
    error::AuthError,
    notify::{Notifier, ResetEmail},
    state::AppState,
};

const TOKEN_BYTES: usize = 20;

/// 20 random bytes, hex encoded.
pub fn generate_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

pub fn token_digest(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

pub(crate) fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    diff == 0
}

#[derive(Clone)]
pub struct ResetService {
    store: Arc<dyn CredentialStore>,
    notifier: Arc<dyn Notifier>,
    ttl: Duration,
    link_base: String,
}

impl FromRef<AppState> for ResetService {
    fn from_ref(state: &AppState) -> Self {
        Self::new(
            state.store.clone(),
            state.notifier.clone(),
            // from_env already bounds this; the clamp covers hand-built configs.
            Duration::minutes(state.config.reset.ttl_minutes.clamp(1, MAX_TTL_MINUTES)),
            state.config.reset.link_base.clone(),
        )
    }
}

impl ResetService {
    pub fn new(
        store: Arc<dyn CredentialStore>,
        notifier: Arc<dyn Notifier>,
        ttl: Duration,
        link_base: String,
    ) -> Self {
        Self {
            store,
            notifier,
            ttl,
            link_base,
        }
    }

    /// Issue a fresh token for `email`, persist its digest, then send the link.
    /// A failed send leaves the stored token valid.
    #[instrument(skip(self))]
    pub async fn request_reset(&self, email: &str) -> Result<(), AuthError> {
        let mut account = self
            .store
            .find_by_email(email)
            .await?
            .ok_or(AuthError::EmailNotFound)?;

        let token = generate_token();
        account.reset = Some(PendingReset {
            token_hash: token_digest(&token),
            expires_at: OffsetDateTime::now_utc() + self.ttl,
        });
        self.store.save(&account).await?;
        info!(user_id = %account.id, "reset token issued");

        let message = ResetEmail::new(&account.email, format!("{}/{}", self.link_base, token));
        self.notifier.send(&message).await?;
        info!(user_id = %account.id, "reset email handed off");
        Ok(())
    }

    /// Consume `token` and set the new password. Wrong, used and expired
    /// tokens all fail with `InvalidOrExpiredToken`.
    #[instrument(skip_all)]
    pub async fn confirm_reset(&self, token: &str, new_password: &str) -> Result<(), AuthError> {
        validate_new_password(new_password)?;
        // Hash before the lookup so valid and invalid tokens cost the same.
        let new_hash = hash_password(new_password)?;

        match self
            .store
            .consume_reset_token(&token_digest(token), &new_hash, OffsetDateTime::now_utc())
            .await?
        {
            Some(account) => {
                info!(user_id = %account.id, "password reset completed");
                Ok(())
            }
            None => {
                warn!("reset token rejected");
                Err(AuthError::InvalidOrExpiredToken)
            }
        }
    }
}
