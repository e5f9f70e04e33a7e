use std::{str::FromStr, time::Duration};

use anyhow::{Context, Result};

#[derive(Clone, Debug)]
pub struct AuthSettings {
    pub jwt_secret: String,
    pub token_ttl: chrono::Duration,
    pub reset_token_ttl: chrono::Duration,
    pub expose_reset_token: bool,
    pub rate_limit_max: u32,
    pub rate_limit_window: Duration,
}

#[derive(Clone, Debug)]
pub struct PaystackSettings {
    pub secret_key: Option<String>,
    pub public_key: String,
    pub base_url: String,
    pub callback_url: Option<String>,
}

#[derive(Clone, Debug)]
pub struct WhatsAppSettings {
    pub api_base: String,
    pub phone_number_id: Option<String>,
    pub access_token: Option<String>,
    pub phone_number: Option<String>,
}

#[derive(Clone, Debug)]
pub struct AdminSeed {
    pub email: String,
    pub password: String,
}

#[derive(Clone, Debug)]
pub struct ServiceConfig {
    pub database_url: String,
    pub http_addr: String,
    pub frontend_url: String,
    pub uploads_dir: String,
    pub auth: AuthSettings,
    pub paystack: PaystackSettings,
    pub whatsapp: WhatsAppSettings,
    pub admin: Option<AdminSeed>,
}

#[derive(Clone, Debug)]
pub struct WorkerConfig {
    pub database_url: String,
    pub sweep_interval: Duration,
}

impl ServiceConfig {
    pub fn from_env(default_http_addr: &str) -> Result<Self> {
        Self::from_lookup(default_http_addr, |key| std::env::var(key).ok())
    }

    pub fn from_lookup(
        default_http_addr: &str,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self> {
        let database_url = lookup("DATABASE_URL").context("DATABASE_URL is required")?;
        let jwt_secret = lookup("JWT_SECRET").context("JWT_SECRET is required")?;
        let http_addr = lookup("HTTP_ADDR").unwrap_or_else(|| default_http_addr.to_string());

        let token_ttl_days: i64 = parse_or(&lookup, "TOKEN_TTL_DAYS", 7)?;
        let reset_ttl_minutes: i64 = parse_or(&lookup, "RESET_TOKEN_TTL_MINUTES", 60)?;
        let window_secs: u64 = parse_or(&lookup, "AUTH_RATE_LIMIT_WINDOW_SECS", 900)?;

        let auth = AuthSettings {
            jwt_secret,
            token_ttl: chrono::Duration::days(token_ttl_days),
            reset_token_ttl: chrono::Duration::minutes(reset_ttl_minutes),
            expose_reset_token: parse_or(&lookup, "EXPOSE_RESET_TOKEN", false)?,
            rate_limit_max: parse_or(&lookup, "AUTH_RATE_LIMIT_MAX", 5)?,
            rate_limit_window: Duration::from_secs(window_secs),
        };
        if auth.rate_limit_max == 0 || window_secs == 0 {
            anyhow::bail!("AUTH_RATE_LIMIT_MAX and AUTH_RATE_LIMIT_WINDOW_SECS must be positive");
        }

        let paystack = PaystackSettings {
            secret_key: lookup("PAYSTACK_SECRET_KEY"),
            public_key: lookup("PAYSTACK_PUBLIC_KEY").unwrap_or_default(),
            base_url: lookup("PAYSTACK_BASE_URL")
                .unwrap_or_else(|| "https://api.paystack.co".to_string()),
            callback_url: lookup("PAYSTACK_CALLBACK_URL"),
        };

        let whatsapp = WhatsAppSettings {
            api_base: lookup("WHATSAPP_API_BASE")
                .unwrap_or_else(|| "https://graph.facebook.com/v19.0".to_string()),
            phone_number_id: lookup("WHATSAPP_PHONE_NUMBER_ID"),
            access_token: lookup("WHATSAPP_ACCESS_TOKEN"),
            phone_number: lookup("WHATSAPP_PHONE_NUMBER"),
        };

        let admin = match (lookup("ADMIN_EMAIL"), lookup("ADMIN_PASSWORD")) {
            (Some(email), Some(password)) => Some(AdminSeed { email, password }),
            (None, None) => None,
            _ => anyhow::bail!("ADMIN_EMAIL and ADMIN_PASSWORD must be set together"),
        };

        Ok(Self {
            database_url,
            http_addr,
            frontend_url: lookup("FRONTEND_URL")
                .unwrap_or_else(|| "http://localhost:3000".to_string()),
            uploads_dir: lookup("UPLOADS_DIR").unwrap_or_else(|| "uploads".to_string()),
            auth,
            paystack,
            whatsapp,
            admin,
        })
    }
}

impl WorkerConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let database_url = lookup("DATABASE_URL").context("DATABASE_URL is required")?;
        let interval_secs: u64 = parse_or(&lookup, "OVERDUE_SWEEP_INTERVAL_SECS", 3600)?;
        if interval_secs == 0 {
            anyhow::bail!("OVERDUE_SWEEP_INTERVAL_SECS must be positive");
        }

        Ok(Self {
            database_url,
            sweep_interval: Duration::from_secs(interval_secs),
        })
    }
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{key} has an invalid value: {raw}")),
        None => Ok(default),
    }
}
