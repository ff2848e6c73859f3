use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// Raw `users` row. Reset columns are nullable independently at this level;
/// the schema keeps them paired.
#[derive(Debug, FromRow)]
pub struct UserRow {
    pub id: Uuid,
    pub email: String,
    pub password_hash: String,
    pub reset_token_hash: Option<String>,
    pub reset_token_expires_at: Option<OffsetDateTime>,
    pub created_at: OffsetDateTime,
}

/// A reset in flight: SHA-256 of the emailed token plus its deadline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingReset {
    pub token_hash: String,
    pub expires_at: OffsetDateTime,
}

impl PendingReset {
    pub fn is_live_at(&self, now: OffsetDateTime) -> bool {
        self.expires_at > now
    }
}

/// User account. Never sent to clients; handlers answer with `PublicUser`.
#[derive(Debug, Clone)]
pub struct UserAccount {
    pub id: Uuid,                     // unique user ID
    pub email: String,                // case-sensitive, unique
    pub password_hash: String,        // Argon2 hash
    pub reset: Option<PendingReset>,  // present only while a reset is pending
    pub created_at: OffsetDateTime,   // creation timestamp
}

impl From<UserRow> for UserAccount {
    fn from(r: UserRow) -> Self {
        let reset = match (r.reset_token_hash, r.reset_token_expires_at) {
            (Some(token_hash), Some(expires_at)) => Some(PendingReset {
                token_hash,
                expires_at,
            }),
            _ => None,
        };
        Self {
            id: r.id,
            email: r.email,
            password_hash: r.password_hash,
            reset,
            created_at: r.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::Duration;

    fn row(hash: Option<&str>, expires_at: Option<OffsetDateTime>) -> UserRow {
        UserRow {
            id: Uuid::new_v4(),
            email: "a@x.com".into(),
            password_hash: "$argon2id$stub".into(),
            reset_token_hash: hash.map(str::to_string),
            reset_token_expires_at: expires_at,
            created_at: OffsetDateTime::now_utc(),
        }
    }

    #[test]
    fn row_with_both_reset_columns_has_pending_reset() {
        let exp = OffsetDateTime::now_utc() + Duration::hours(1);
        let account = UserAccount::from(row(Some("abc"), Some(exp)));
        let reset = account.reset.expect("pending reset");
        assert_eq!(reset.token_hash, "abc");
        assert_eq!(reset.expires_at, exp);
    }

    #[test]
    fn half_populated_row_has_no_pending_reset() {
        assert!(UserAccount::from(row(Some("abc"), None)).reset.is_none());
        assert!(UserAccount::from(row(None, Some(OffsetDateTime::now_utc()))).reset.is_none());
    }

    #[test]
    fn pending_reset_expiry_is_strict() {
        let now = OffsetDateTime::now_utc();
        let reset = PendingReset {
            token_hash: "h".into(),
            expires_at: now,
        };
        assert!(!reset.is_live_at(now));
        assert!(reset.is_live_at(now - Duration::seconds(1)));
    }
}
