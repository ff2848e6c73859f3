use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use rand::rngs::OsRng;
use tracing::error;

/// Argon2id with the crate's default cost parameters and a fresh salt.
/// Output is a self-describing PHC string, so cost changes stay verifiable.
pub fn hash_password(plain: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(plain.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| {
            error!(error = %e, "argon2 hash failed");
            anyhow::anyhow!("hash password: {e}")
        })
}

/// `Ok(false)` on mismatch; `Err` only when the stored hash is unreadable.
pub fn verify_password(plain: &str, stored_hash: &str) -> anyhow::Result<bool> {
    let parsed = PasswordHash::new(stored_hash).map_err(|e| {
        error!(error = %e, "stored password hash unreadable");
        anyhow::anyhow!("parse stored hash: {e}")
    })?;
    // PHC params come from the stored string, not from Argon2::default().
    Ok(Argon2::default()
        .verify_password(plain.as_bytes(), &parsed)
        .is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLES: [&str; 4] = ["pw1", "pw2", "correct horse battery staple", "pässwörd-ü"];

    #[test]
    fn each_password_verifies_against_its_own_hash_only() {
        let hashes: Vec<String> = SAMPLES
            .iter()
            .map(|p| hash_password(p).expect("hash"))
            .collect();
        for (i, hash) in hashes.iter().enumerate() {
            for (j, candidate) in SAMPLES.iter().enumerate() {
                assert_eq!(
                    verify_password(candidate, hash).expect("verify"),
                    i == j,
                    "{candidate:?} vs hash of {:?}",
                    SAMPLES[i]
                );
            }
        }
    }

    #[test]
    fn near_miss_passwords_are_rejected() {
        let hash = hash_password("pw2").unwrap();
        for near in ["pw2 ", "PW2", "pw", "pw22"] {
            assert!(!verify_password(near, &hash).unwrap(), "{near:?} matched");
        }
    }

    #[test]
    fn salts_make_hashes_unique_and_plaintext_free() {
        let a = hash_password("pw1").unwrap();
        let b = hash_password("pw1").unwrap();
        assert_ne!(a, b);
        assert!(a.starts_with("$argon2id$"));
        assert!(!a.contains("pw1"));
    }

    #[test]
    fn unreadable_stored_hash_is_an_error_not_a_mismatch() {
        let err = verify_password("pw1", "not-a-valid-hash").unwrap_err();
        assert!(err.to_string().contains("parse stored hash"));
    }
}
