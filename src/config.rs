use anyhow::Context;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResetConfig {
    pub ttl_minutes: i64,
    /// Token is appended as the last path segment.
    pub link_base: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub from: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub jwt: JwtConfig,
    pub reset: ResetConfig,
    pub smtp: Option<SmtpConfig>,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL is not set")?;

        let secret = std::env::var("JWT_SECRET").context("JWT_SECRET is not set")?;
        anyhow::ensure!(!secret.trim().is_empty(), "JWT_SECRET must not be empty");

        let jwt = JwtConfig {
            secret,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "uoem-auth".into()),
            audience: std::env::var("JWT_AUDIENCE").unwrap_or_else(|_| "uoem-users".into()),
            ttl_minutes: ttl_minutes("JWT_TTL_MINUTES", std::env::var("JWT_TTL_MINUTES").ok(), 60)?,
        };

        let reset = ResetConfig {
            ttl_minutes: ttl_minutes(
                "RESET_TOKEN_TTL_MINUTES",
                std::env::var("RESET_TOKEN_TTL_MINUTES").ok(),
                60,
            )?,
            link_base: std::env::var("RESET_LINK_BASE")
                .map(|v| v.trim_end_matches('/').to_string())
                .unwrap_or_else(|_| "http://localhost:3000/reset_password".into()),
        };

        Ok(Self {
            database_url,
            jwt,
            reset,
            smtp: smtp_from_env()?,
        })
    }
}

/// Upper bound for any token lifetime: one week.
pub const MAX_TTL_MINUTES: i64 = 7 * 24 * 60;

/// A set-but-unparseable value is an error, not a silent default.
fn env_parse<T>(key: &str) -> anyhow::Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(v) => v
            .trim()
            .parse::<T>()
            .map(Some)
            .with_context(|| format!("{key} has an invalid value {v:?}")),
        Err(_) => Ok(None),
    }
}

fn ttl_minutes(key: &str, raw: Option<String>, default: i64) -> anyhow::Result<i64> {
    let minutes = match raw {
        Some(v) => v
            .trim()
            .parse::<i64>()
            .with_context(|| format!("{key} must be a whole number of minutes, got {v:?}"))?,
        None => default,
    };
    anyhow::ensure!(
        (1..=MAX_TTL_MINUTES).contains(&minutes),
        "{key} must be between 1 and {MAX_TTL_MINUTES} minutes, got {minutes}"
    );
    Ok(minutes)
}

// SMTP is all-or-nothing: host, username and password must come together.
fn smtp_from_env() -> anyhow::Result<Option<SmtpConfig>> {
    let host = std::env::var("SMTP_HOST").ok();
    let username = std::env::var("SMTP_USERNAME").ok();
    let password = std::env::var("SMTP_PASSWORD").ok();

    match (host, username, password) {
        (None, None, None) => Ok(None),
        (Some(host), Some(username), Some(password)) => Ok(Some(SmtpConfig {
            host,
            port: env_parse("SMTP_PORT")?.unwrap_or(587),
            from: std::env::var("SMTP_FROM").unwrap_or_else(|_| username.clone()),
            username,
            password,
        })),
        _ => anyhow::bail!("SMTP_HOST, SMTP_USERNAME and SMTP_PASSWORD must be set together"),
    }
}
