use std::{env, str::FromStr, time::Duration};

use anyhow::Context;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub database_max_connections: u32,
    pub host: String,
    pub port: u16,
    pub jwt_secret: String,
    pub jwt_ttl_hours: i64,
    pub telegram: TelegramConfig,
    pub notify_queue_capacity: usize,
    pub promo_sweep_interval: Duration,
    pub cors_allowed_origins: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct TelegramConfig {
    /// Bot token; when absent order notifications are only logged.
    pub bot_token: Option<String>,
    pub admin_chat_ids: Vec<i64>,
    pub api_url: String,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = env::var("DATABASE_URL").context("DATABASE_URL is not set")?;
        let jwt_secret = env::var("JWT_SECRET").context("JWT_SECRET is not set")?;
        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = parse_or("APP_PORT", 3000u16)?;

        let telegram = TelegramConfig {
            bot_token: env::var("TELEGRAM_BOT_TOKEN")
                .ok()
                .filter(|token| !token.trim().is_empty()),
            admin_chat_ids: parse_list("TELEGRAM_ADMIN_CHAT_IDS")?,
            api_url: env::var("TELEGRAM_API_URL")
                .unwrap_or_else(|_| "https://api.telegram.org".to_string()),
        };

        Ok(Self {
            database_url,
            database_max_connections: parse_or("DATABASE_MAX_CONNECTIONS", 10u32)?,
            host,
            port,
            jwt_secret,
            jwt_ttl_hours: parse_or("JWT_TTL_HOURS", 24i64)?,
            telegram,
            notify_queue_capacity: parse_or("NOTIFY_QUEUE_CAPACITY", 256usize)?,
            promo_sweep_interval: Duration::from_secs(parse_or(
                "PROMO_SWEEP_INTERVAL_SECS",
                86_400u64,
            )?),
            cors_allowed_origins: parse_list("CORS_ALLOWED_ORIGINS")?,
        })
    }
}

fn parse_or<T>(key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("{key} has an invalid value: {raw}")),
        _ => Ok(default),
    }
}

fn parse_list<T>(key: &str) -> anyhow::Result<Vec<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let raw = env::var(key).unwrap_or_default();
    raw.split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| {
            part.parse::<T>()
                .with_context(|| format!("{key} contains an invalid entry: {part}"))
        })
        .collect()
}
