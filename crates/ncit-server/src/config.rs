use std::env;
use std::fmt::Display;
use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{Context, Result, bail};
use tracing::info;

/// Secrets that ship in sample env files and must never reach production.
const PLACEHOLDER_SECRETS: &[&str] = &["changeme", "change-me", "secret", "dev-secret-change-me"];

const MIN_SECRET_LEN: usize = 16;

pub struct Config {
    pub host: String,
    pub port: u16,
    pub db_path: PathBuf,
    pub jwt_secret: String,
    pub token_ttl_days: i64,
    /// Existing account promoted to admin at startup.
    pub admin_email: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let jwt_secret = lookup("NCIT_JWT_SECRET").context("NCIT_JWT_SECRET must be set")?;
        check_secret(&jwt_secret)?;

        let token_ttl_days: i64 = parse_or(&lookup, "NCIT_TOKEN_TTL_DAYS", 30)?;
        if token_ttl_days < 1 {
            bail!("NCIT_TOKEN_TTL_DAYS must be at least 1");
        }

        Ok(Self {
            host: lookup("NCIT_HOST").unwrap_or_else(|| "0.0.0.0".into()),
            port: parse_or(&lookup, "NCIT_PORT", 3000)?,
            db_path: PathBuf::from(lookup("NCIT_DB_PATH").unwrap_or_else(|| "ncit-hub.db".into())),
            jwt_secret,
            token_ttl_days,
            admin_email: lookup("NCIT_ADMIN_EMAIL")
                .map(|e| e.trim().to_lowercase())
                .filter(|e| !e.is_empty()),
        })
    }
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr + Display,
    T::Err: Display,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| anyhow::anyhow!("Invalid {} value {:?}: {}", key, raw, e)),
        None => {
            info!("{} not set, using default: {}", key, default);
            Ok(default)
        }
    }
}

fn check_secret(secret: &str) -> Result<()> {
    if PLACEHOLDER_SECRETS.contains(&secret.trim().to_lowercase().as_str()) {
        bail!("NCIT_JWT_SECRET is a placeholder value, set a real secret");
    }
    if secret.len() < MIN_SECRET_LEN {
        bail!("NCIT_JWT_SECRET must be at least {} bytes", MIN_SECRET_LEN);
    }
    Ok(())
}
