use std::env;

use anyhow::Context;
use secrecy::SecretString;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub admin: AdminConfig,
    pub orders: OrderPolicy,
    pub contact_webhook_url: Option<String>,
    pub cors_origins: Vec<String>,
    pub request_timeout_secs: u64,
}

/// Credentials and token settings for the single admin account.
#[derive(Debug, Clone)]
pub struct AdminConfig {
    pub email: String,
    pub password: AdminPassword,
    pub jwt_secret: SecretString,
    pub token_ttl_secs: i64,
}

#[derive(Debug, Clone)]
pub enum AdminPassword {
    /// argon2 PHC string, e.g. the output of the `hash_password` binary.
    Hash(String),
    /// Plain password, hashed once when the gate is built.
    Plain(SecretString),
}

#[derive(Debug, Clone, Copy)]
pub struct OrderPolicy {
    pub idempotency_window_secs: i64,
    pub lock_terminal_status: bool,
}

impl Default for OrderPolicy {
    fn default() -> Self {
        Self {
            idempotency_window_secs: 24 * 60 * 60,
            lock_terminal_status: false,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = env::var("DATABASE_URL").context("DATABASE_URL is not set")?;
        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .ok()
            .and_then(|p| p.parse::<u16>().ok())
            .unwrap_or(3000);

        let cors_origins = env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:3000".to_string())
            .split(',')
            .map(|origin| origin.trim().to_string())
            .filter(|origin| !origin.is_empty())
            .collect();

        let defaults = OrderPolicy::default();
        let orders = OrderPolicy {
            idempotency_window_secs: parse_or("ORDER_IDEMPOTENCY_WINDOW_SECS", defaults.idempotency_window_secs)?,
            lock_terminal_status: parse_or("ORDER_LOCK_TERMINAL_STATUS", defaults.lock_terminal_status)?,
        };

        Ok(Self {
            port,
            database_url,
            host,
            admin: AdminConfig::from_env()?,
            orders,
            contact_webhook_url: env::var("CONTACT_WEBHOOK_URL").ok().filter(|u| !u.is_empty()),
            cors_origins,
            request_timeout_secs: parse_or("REQUEST_TIMEOUT_SECS", 15)?,
        })
    }
}

impl AdminConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let email = env::var("ADMIN_EMAIL").context("ADMIN_EMAIL is not set")?;
        let password = match env::var("ADMIN_PASSWORD_HASH") {
            Ok(hash) if !hash.is_empty() => AdminPassword::Hash(hash),
            _ => {
                let plain = env::var("ADMIN_PASSWORD")
                    .context("either ADMIN_PASSWORD_HASH or ADMIN_PASSWORD must be set")?;
                AdminPassword::Plain(SecretString::from(plain))
            }
        };
        let jwt_secret = env::var("JWT_SECRET").context("JWT_SECRET is not set")?;

        Ok(Self {
            email,
            password,
            jwt_secret: SecretString::from(jwt_secret),
            token_ttl_secs: parse_or("ADMIN_TOKEN_TTL_SECS", 3 * 60 * 60)?,
        })
    }
}

fn parse_or<T>(key: &str, default: T) -> anyhow::Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("{key} has an invalid value")),
        _ => Ok(default),
    }
}
