use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};

use packet_game::scheduler::DEFAULT_SCHEDULE;

/// Process configuration, read from the environment (and `.env` if present).
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub db_path: PathBuf,
    pub public_dir: PathBuf,
    pub app_url: String,
    /// HTTP mail relay; notices are only logged when unset.
    pub mail_webhook_url: Option<String>,
    pub mail_from: String,
    pub schedule: String,
    pub scheduler_enabled: bool,
    pub grant_timeout: Duration,
    pub scheduler_concurrency: usize,
    pub min_grant_interval: Option<chrono::Duration>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            host: var_or("PACKET_HOST", "0.0.0.0"),
            port: parse_or("PACKET_PORT", 3000)?,
            db_path: var_or("PACKET_DB_PATH", "game.db").into(),
            public_dir: var_or("PACKET_PUBLIC_DIR", "public").into(),
            app_url: var_or("PACKET_APP_URL", "http://localhost:3000"),
            mail_webhook_url: std::env::var("PACKET_MAIL_WEBHOOK_URL")
                .ok()
                .filter(|v| !v.trim().is_empty()),
            mail_from: var_or("PACKET_MAIL_FROM", "packets@localhost"),
            schedule: var_or("PACKET_SCHEDULE", DEFAULT_SCHEDULE),
            scheduler_enabled: parse_or("PACKET_SCHEDULER_ENABLED", true)?,
            grant_timeout: Duration::from_secs(parse_or("PACKET_GRANT_TIMEOUT_SECS", 30)?),
            scheduler_concurrency: parse_or("PACKET_SCHEDULER_CONCURRENCY", 8)?,
            min_grant_interval: match std::env::var("PACKET_MIN_GRANT_INTERVAL_HOURS") {
                Ok(v) if !v.trim().is_empty() => {
                    let hours: i64 = v
                        .trim()
                        .parse()
                        .context("PACKET_MIN_GRANT_INTERVAL_HOURS must be an integer")?;
                    Some(chrono::Duration::hours(hours))
                }
                _ => None,
            },
        })
    }
}

fn var_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.into())
}

fn parse_or<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(v) => parse_value(key, &v),
        Err(_) => Ok(default),
    }
}

fn parse_value<T>(key: &str, raw: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    raw.trim()
        .parse()
        .with_context(|| format!("invalid value for {}: {:?}", key, raw))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_typed_values() {
        let port: u16 = parse_value("PORT", " 8080 ").unwrap();
        assert_eq!(port, 8080);
        let enabled: bool = parse_value("ENABLED", "false").unwrap();
        assert!(!enabled);
    }

    #[test]
    fn reports_key_on_bad_value() {
        let err = parse_value::<u16>("PACKET_PORT", "eighty").unwrap_err();
        assert!(err.to_string().contains("PACKET_PORT"));
    }
}
