use std::env;
use std::str::FromStr;

use anyhow::{Context, Result, anyhow, bail};

const DEFAULT_SYSTEM_PROMPT: &str = "You are a medical prescription analyzer. Read the prescription image \
and answer with a single JSON object describing it. Set isPrescription to false and explain why in \
reason when the image is not a medical prescription. Otherwise extract patientName, patientSurname, \
doctorName, doctorSurname, practiceNumber, issueDate, diagnosis and a medications array whose items \
carry name, dosage, frequency, duration and instructions. Report overallConfidence and scanQuality as \
numbers between 0 and 100 and list anything unreadable or suspicious in aiWarnings.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Postgres,
    Memory,
}

impl FromStr for StorageBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "postgres" => Ok(StorageBackend::Postgres),
            "memory" => Ok(StorageBackend::Memory),
            other => Err(anyhow!("unknown storage backend '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

impl FromStr for Environment {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "development" => Ok(Environment::Development),
            "production" => Ok(Environment::Production),
            other => Err(anyhow!("unknown environment '{other}'")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub audience: String,
    pub cookie_name: String,
}

#[derive(Debug, Clone)]
pub struct VisionConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub system_prompt: String,
}

#[derive(Debug, Clone)]
pub struct BucketConfig {
    pub url: Option<String>,
    pub service_key: Option<String>,
    pub bucket: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub storage: StorageBackend,
    pub database_url: Option<String>,
    pub pool_size: u32,
    pub site_url: Option<String>,
    pub allowed_origins: Vec<String>,
    pub environment: Environment,
    pub auth: AuthConfig,
    pub vision: VisionConfig,
    pub bucket: BucketConfig,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let storage = parsed("PORTAL_STORAGE", StorageBackend::Postgres)?;
        let database_url = optional("DATABASE_URL");
        if storage == StorageBackend::Postgres && database_url.is_none() {
            bail!("DATABASE_URL must be set when PORTAL_STORAGE is postgres");
        }

        Ok(Config {
            host: optional("PORTAL_HOST").unwrap_or_else(|| "127.0.0.1".to_owned()),
            port: parsed("PORTAL_PORT", 4569)?,
            storage,
            database_url,
            pool_size: parsed("DATABASE_POOL_SIZE", 10)?,
            site_url: optional("PORTAL_SITE_URL").map(|url| url.trim_end_matches('/').to_owned()),
            allowed_origins: optional("CSRF_ALLOWED_ORIGINS")
                .map(|raw| split_origins(&raw))
                .unwrap_or_default(),
            environment: parsed("PORTAL_ENV", Environment::Production)?,
            auth: AuthConfig {
                jwt_secret: env::var("AUTH_JWT_SECRET").context("AUTH_JWT_SECRET must be set")?,
                audience: optional("AUTH_JWT_AUDIENCE").unwrap_or_else(|| "authenticated".to_owned()),
                cookie_name: optional("AUTH_COOKIE_NAME").unwrap_or_else(|| "sb-access-token".to_owned()),
            },
            vision: VisionConfig {
                api_key: optional("OPENAI_API_KEY"),
                base_url: optional("OPENAI_BASE_URL")
                    .unwrap_or_else(|| "https://api.openai.com/v1".to_owned()),
                model: optional("VISION_MODEL").unwrap_or_else(|| "gpt-4o".to_owned()),
                temperature: parsed("VISION_TEMPERATURE", 0.1)?,
                max_tokens: parsed("VISION_MAX_TOKENS", 2000)?,
                system_prompt: optional("VISION_SYSTEM_PROMPT")
                    .unwrap_or_else(|| DEFAULT_SYSTEM_PROMPT.to_owned()),
            },
            bucket: BucketConfig {
                url: optional("STORAGE_URL").map(|url| url.trim_end_matches('/').to_owned()),
                service_key: optional("STORAGE_SERVICE_KEY"),
                bucket: optional("PRESCRIPTION_BUCKET").unwrap_or_else(|| "prescription-images".to_owned()),
            },
        })
    }

    /// Origins allowed to issue state-changing requests.
    pub fn trusted_origins(&self) -> Vec<String> {
        let mut origins: Vec<String> = self.site_url.iter().cloned().collect();
        for origin in &self.allowed_origins {
            if !origins.contains(origin) {
                origins.push(origin.clone());
            }
        }
        origins
    }

    /// Base URL the allocation call is sent to.
    pub fn allocation_base_url(&self) -> String {
        match &self.site_url {
            Some(site) => site.clone(),
            None => {
                let own = format!("http://{}:{}", self.host, self.port);
                tracing::warn!(base_url = %own, "PORTAL_SITE_URL not set, allocation calls go to the bind address");
                own
            }
        }
    }
}

fn optional(key: &str) -> Option<String> {
    env::var(key).ok().map(|value| value.trim().to_owned()).filter(|value| !value.is_empty())
}

fn parsed<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match optional(key) {
        None => Ok(default),
        Some(raw) => raw
            .parse()
            .map_err(|err| anyhow!("{key} has an invalid value '{raw}': {err}")),
    }
}

fn split_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|origin| origin.trim().trim_end_matches('/'))
        .filter(|origin| !origin.is_empty())
        .map(str::to_owned)
        .collect()
}
