use crate::error::{Error, Result};
use dotenvy::dotenv;
use std::env;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    pub server_address: String,
    pub jwt_secret: String,
    pub jwt_ttl_hours: i64,
    pub webhook_secret: String,
    pub scheduling_secret: String,
    pub public_base_url: String,
    pub cors_origin: Option<String>,
    pub public_rps: u32,
    pub staff_rps: u32,
    pub store: StoreConfig,
    pub email: EmailConfig,
    pub status_webhook_url: Option<String>,
    pub vapi: Option<VapiConfig>,
    pub admission_lock_timeout: Duration,
}

#[derive(Debug, Clone)]
pub enum StoreConfig {
    Postgres {
        database_url: String,
    },
    Airtable {
        api_url: String,
        api_key: String,
        base_id: String,
        candidates_table: String,
        users_table: String,
    },
    Memory,
}

#[derive(Debug, Clone)]
pub enum EmailProvider {
    SendGrid { api_key: String },
    Log,
}

#[derive(Debug, Clone)]
pub struct EmailConfig {
    pub provider: EmailProvider,
    pub from: String,
    pub max_attempts: u32,
    pub retry_delay: Duration,
}

#[derive(Debug, Clone)]
pub struct VapiConfig {
    pub public_key: String,
    pub assistant_id: String,
}

impl Config {
    /// Reads the process environment (and `.env` when present) once at startup.
    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        Ok(Self {
            server_address: get_env_or("SERVER_ADDRESS", "0.0.0.0:3000"),
            jwt_secret: get_env("JWT_SECRET")?,
            jwt_ttl_hours: get_env_parse_or("JWT_TTL_HOURS", 8)?,
            webhook_secret: get_env("WEBHOOK_SECRET")?,
            scheduling_secret: get_env("SCHEDULING_SECRET")?,
            public_base_url: get_env_or("PUBLIC_BASE_URL", "http://localhost:3000")
                .trim_end_matches('/')
                .to_string(),
            cors_origin: env::var("FRONTEND_URL").ok().filter(|v| !v.is_empty()),
            public_rps: get_env_parse_or("PUBLIC_RPS", 20)?,
            staff_rps: get_env_parse_or("STAFF_RPS", 50)?,
            store: StoreConfig::from_env()?,
            email: EmailConfig::from_env()?,
            status_webhook_url: env::var("STATUS_WEBHOOK_URL").ok().filter(|v| !v.is_empty()),
            vapi: VapiConfig::from_env(),
            admission_lock_timeout: Duration::from_millis(get_env_parse_or(
                "ADMISSION_LOCK_TIMEOUT_MS",
                5_000u64,
            )?),
        })
    }
}

impl StoreConfig {
    fn from_env() -> Result<Self> {
        let backend = get_env_or("STORE_BACKEND", "postgres").to_lowercase();
        match backend.as_str() {
            "postgres" => Ok(StoreConfig::Postgres {
                database_url: get_env("DATABASE_URL")?,
            }),
            "airtable" => Ok(StoreConfig::Airtable {
                api_url: get_env_or("AIRTABLE_API_URL", "https://api.airtable.com/v0"),
                api_key: get_env("AIRTABLE_API_KEY")?,
                base_id: get_env("AIRTABLE_BASE_ID")?,
                candidates_table: get_env_or("AIRTABLE_TABLE_NAME", "Candidates"),
                users_table: get_env_or("AIRTABLE_USERS_TABLE", "Dashboard Users"),
            }),
            "memory" => Ok(StoreConfig::Memory),
            other => Err(Error::Config(format!(
                "Unknown STORE_BACKEND '{}' (expected postgres, airtable or memory)",
                other
            ))),
        }
    }

    pub fn backend_name(&self) -> &'static str {
        match self {
            StoreConfig::Postgres { .. } => "postgres",
            StoreConfig::Airtable { .. } => "airtable",
            StoreConfig::Memory => "memory",
        }
    }
}

impl EmailConfig {
    fn from_env() -> Result<Self> {
        let provider = match get_env_or("EMAIL_PROVIDER", "log").to_lowercase().as_str() {
            "sendgrid" => EmailProvider::SendGrid {
                api_key: get_env("SENDGRID_API_KEY")?,
            },
            "log" => EmailProvider::Log,
            other => {
                return Err(Error::Config(format!(
                    "Unknown EMAIL_PROVIDER '{}' (expected sendgrid or log)",
                    other
                )))
            }
        };

        Ok(Self {
            provider,
            from: get_env_or("EMAIL_FROM", "Bloom Buddies <no-reply@bloombuddies.com>"),
            max_attempts: get_env_parse_or("EMAIL_MAX_ATTEMPTS", 3u32)?.max(1),
            retry_delay: Duration::from_millis(get_env_parse_or("EMAIL_RETRY_DELAY_MS", 2_000u64)?),
        })
    }
}

impl VapiConfig {
    fn from_env() -> Option<Self> {
        let public_key = env::var("VAPI_PUBLIC_KEY").ok().filter(|v| !v.is_empty())?;
        let assistant_id = env::var("VAPI_ASSISTANT_ID").ok().filter(|v| !v.is_empty())?;
        Some(Self {
            public_key,
            assistant_id,
        })
    }
}

fn get_env(name: &str) -> Result<String> {
    env::var(name).map_err(|_| Error::Config(format!("Missing environment variable: {}", name)))
}

fn get_env_or(name: &str, default: &str) -> String {
    env::var(name)
        .ok()
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn get_env_parse_or<T>(name: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) if !raw.is_empty() => raw
            .parse()
            .map_err(|e| Error::Config(format!("Invalid value for {}: {}", name, e))),
        _ => Ok(default),
    }
}
