use lazy_static::lazy_static;
use regex::Regex;
use tracing::{info, warn};

use crate::{
    auth::{
        jwt::JwtKeys,
        password::{hash_password, verify_password},
        repo::CredentialStore,
        repo_types::UserAccount,
    },
    error::AuthError,
};

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

/// Rules every new password must meet, at signup and at reset.
pub(crate) fn validate_new_password(password: &str) -> Result<(), AuthError> {
    if password.is_empty() {
        return Err(AuthError::InvalidInput("Password is required".into()));
    }
    Ok(())
}

/// Create an account. Emails are stored exactly as given.
pub async fn signup(
    store: &dyn CredentialStore,
    email: &str,
    password: &str,
) -> Result<UserAccount, AuthError> {
    if !is_valid_email(email) {
        warn!(%email, "invalid email");
        return Err(AuthError::InvalidInput("Invalid email".into()));
    }
    validate_new_password(password)?;

    if store.find_by_email(email).await?.is_some() {
        warn!(%email, "email already registered");
        return Err(AuthError::DuplicateEmail);
    }

    let hash = hash_password(password)?;
    // The unique index still catches a concurrent signup that slipped past the check.
    let account = store.create(email, &hash).await?;
    info!(user_id = %account.id, email = %account.email, "user registered");
    Ok(account)
}

/// Check credentials and issue a session token.
pub async fn login(
    store: &dyn CredentialStore,
    keys: &JwtKeys,
    email: &str,
    password: &str,
) -> Result<String, AuthError> {
    let account = match store.find_by_email(email).await? {
        Some(a) => a,
        None => {
            warn!(%email, "login unknown email");
            return Err(AuthError::EmailNotFound);
        }
    };

    if !verify_password(password, &account.password_hash)? {
        warn!(%email, user_id = %account.id, "login invalid password");
        return Err(AuthError::InvalidCredentials);
    }

    let token = keys.issue(account.id)?;
    info!(user_id = %account.id, "user logged in");
    Ok(token)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{auth::memory::MemoryCredentialStore, config::JwtConfig};

    fn keys() -> JwtKeys {
        JwtKeys::from(&JwtConfig {
            secret: "test-secret".into(),
            issuer: "test".into(),
            audience: "test".into(),
            ttl_minutes: 60,
        })
    }

    #[test]
    fn email_shape() {
        assert!(is_valid_email("a@x.com"));
        assert!(is_valid_email("First.Last@Example.org"));
        assert!(!is_valid_email("no-at-sign"));
        assert!(!is_valid_email("a@nodot"));
        assert!(!is_valid_email("a b@x.com"));
    }

    #[test]
    fn new_password_must_not_be_empty() {
        assert!(matches!(
            validate_new_password(""),
            Err(AuthError::InvalidInput(msg)) if msg == "Password is required"
        ));
        assert!(validate_new_password("pw1").is_ok());
    }

    #[tokio::test]
    async fn second_signup_with_same_email_fails() {
        let store = MemoryCredentialStore::new();
        signup(&store, "a@x.com", "pw1").await.expect("first signup");
        let err = signup(&store, "a@x.com", "other").await.unwrap_err();
        assert!(matches!(err, AuthError::DuplicateEmail));
    }

    #[tokio::test]
    async fn signup_never_stores_plaintext() {
        let store = MemoryCredentialStore::new();
        let account = signup(&store, "a@x.com", "pw1").await.unwrap();
        assert_ne!(account.password_hash, "pw1");
        assert!(account.reset.is_none());
    }

    #[tokio::test]
    async fn signup_rejects_bad_input() {
        let store = MemoryCredentialStore::new();
        assert!(matches!(
            signup(&store, "nope", "pw1").await,
            Err(AuthError::InvalidInput(_))
        ));
        assert!(matches!(
            signup(&store, "a@x.com", "").await,
            Err(AuthError::InvalidInput(_))
        ));
    }

    #[tokio::test]
    async fn login_distinguishes_unknown_email_from_bad_password() {
        let store = MemoryCredentialStore::new();
        let keys = keys();
        let account = signup(&store, "a@x.com", "pw1").await.unwrap();

        let token = login(&store, &keys, "a@x.com", "pw1").await.expect("login");
        assert_eq!(keys.verify(&token).unwrap(), account.id);

        assert!(matches!(
            login(&store, &keys, "a@x.com", "wrong").await,
            Err(AuthError::InvalidCredentials)
        ));
        assert!(matches!(
            login(&store, &keys, "b@x.com", "pw1").await,
            Err(AuthError::EmailNotFound)
        ));
    }
}
