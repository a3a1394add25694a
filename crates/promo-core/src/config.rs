//! Configuration module
//!
//! Settings are read from the process environment (after loading a `.env`
//! file when present). Numeric settings fall back to their defaults when
//! missing or unparsable; settings without a sensible default are required.

use std::env;
use std::str::FromStr;

const SERVER_PORT: u16 = 4000;
const MAX_FILE_SIZE_MB: u64 = 25;
const EXTRACTION_TIMEOUT_SECS: u64 = 60;
const WORKBOOK_TIMEOUT_SECS: u64 = 30;
const EXPORT_TIMEOUT_SECS: u64 = 60;
const MAX_MANUAL_RETRIES: u32 = 0;

/// Console log output format.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogFormat {
    Compact,
    Json,
}

impl FromStr for LogFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "compact" | "" => Ok(LogFormat::Compact),
            "json" => Ok(LogFormat::Json),
            other => Err(anyhow::anyhow!("Invalid LOG_FORMAT: {}", other)),
        }
    }
}

/// Settings shared by every service binary
#[derive(Clone, Debug)]
pub struct BaseConfig {
    pub server_port: u16,
    pub cors_origins: Vec<String>,
    pub environment: String,
    pub log_format: LogFormat,
}

/// File processor configuration
#[derive(Clone, Debug)]
pub struct ProcessorConfig {
    pub base: BaseConfig,
    pub max_file_size_bytes: u64,
    // Extraction call
    pub extraction_url: String,
    pub extraction_api_key: Option<String>,
    pub extraction_timeout_secs: u64,
    pub workbook_timeout_secs: u64,
    /// Cap on manual retries per file. 0 = unlimited.
    pub max_manual_retries: u32,
    // Reporting export proxy
    pub export_upstream_url: Option<String>,
    pub export_private_key: Option<String>,
    pub export_timeout_secs: u64,
}

/// Application configuration.
#[derive(Clone, Debug)]
pub struct Config(pub Box<ProcessorConfig>);

impl Config {
    fn as_processor(&self) -> &ProcessorConfig {
        &self.0
    }

    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, anyhow::Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let config = ProcessorConfig::from_lookup(lookup)?;
        Ok(Config(Box::new(config)))
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        self.as_processor().validate()
    }

    /// Check if the application is running in production mode
    pub fn is_production(&self) -> bool {
        is_production_name(&self.as_processor().base.environment)
    }

    pub fn server_port(&self) -> u16 {
        self.as_processor().base.server_port
    }

    pub fn cors_origins(&self) -> &[String] {
        &self.as_processor().base.cors_origins
    }

    pub fn environment(&self) -> &str {
        &self.as_processor().base.environment
    }

    pub fn log_format(&self) -> LogFormat {
        self.as_processor().base.log_format
    }

    pub fn max_file_size_bytes(&self) -> u64 {
        self.as_processor().max_file_size_bytes
    }

    pub fn extraction_url(&self) -> &str {
        &self.as_processor().extraction_url
    }

    pub fn extraction_api_key(&self) -> Option<&str> {
        self.as_processor().extraction_api_key.as_deref()
    }

    pub fn extraction_timeout_secs(&self) -> u64 {
        self.as_processor().extraction_timeout_secs
    }

    pub fn workbook_timeout_secs(&self) -> u64 {
        self.as_processor().workbook_timeout_secs
    }

    /// `None` when manual retries are unlimited.
    pub fn max_manual_retries(&self) -> Option<u32> {
        match self.as_processor().max_manual_retries {
            0 => None,
            n => Some(n),
        }
    }

    pub fn export_upstream_url(&self) -> Option<&str> {
        self.as_processor().export_upstream_url.as_deref()
    }

    pub fn export_private_key(&self) -> Option<&str> {
        self.as_processor().export_private_key.as_deref()
    }

    pub fn export_timeout_secs(&self) -> u64 {
        self.as_processor().export_timeout_secs
    }
}

fn is_production_name(environment: &str) -> bool {
    let env = environment.to_lowercase();
    env == "production" || env == "prod"
}

fn parse_or<T: FromStr>(value: Option<String>, default: T) -> T {
    value.and_then(|v| v.trim().parse().ok()).unwrap_or(default)
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl ProcessorConfig {
    fn from_lookup<F>(lookup: F) -> Result<Self, anyhow::Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let environment = lookup("ENVIRONMENT")
            .or_else(|| lookup("APP_ENV"))
            .unwrap_or_else(|| "development".to_string());

        let cors_origins_str = lookup("CORS_ORIGINS").unwrap_or_else(|| "*".to_string());
        if is_production_name(&environment) && cors_origins_str.trim() == "*" {
            return Err(anyhow::anyhow!(
                "CORS_ORIGINS cannot be '*' in production. Please specify explicit origins."
            ));
        }
        let cors_origins = cors_origins_str
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let log_format = match lookup("LOG_FORMAT") {
            Some(value) => value.parse()?,
            None => LogFormat::Compact,
        };

        let server_port = match lookup("PORT") {
            Some(value) => value
                .trim()
                .parse()
                .map_err(|_| anyhow::anyhow!("PORT must be a valid number"))?,
            None => SERVER_PORT,
        };

        let base = BaseConfig {
            server_port,
            cors_origins,
            environment,
            log_format,
        };

        let max_file_size_mb = parse_or(lookup("MAX_FILE_SIZE_MB"), MAX_FILE_SIZE_MB);

        let extraction_url = non_empty(lookup("EXTRACTION_URL")).ok_or_else(|| {
            anyhow::anyhow!("EXTRACTION_URL must be set to the hosted extraction endpoint")
        })?;

        Ok(Self {
            base,
            max_file_size_bytes: max_file_size_mb.saturating_mul(1024 * 1024),
            extraction_url,
            extraction_api_key: non_empty(lookup("EXTRACTION_API_KEY")),
            extraction_timeout_secs: parse_or(
                lookup("EXTRACTION_TIMEOUT_SECS"),
                EXTRACTION_TIMEOUT_SECS,
            ),
            workbook_timeout_secs: parse_or(lookup("WORKBOOK_TIMEOUT_SECS"), WORKBOOK_TIMEOUT_SECS),
            max_manual_retries: parse_or(lookup("MAX_MANUAL_RETRIES"), MAX_MANUAL_RETRIES),
            export_upstream_url: non_empty(lookup("EXPORT_UPSTREAM_URL")),
            export_private_key: non_empty(lookup("CLOUD_RUN_PRIVATE_KEY")),
            export_timeout_secs: parse_or(lookup("EXPORT_TIMEOUT_SECS"), EXPORT_TIMEOUT_SECS),
        })
    }

    fn validate(&self) -> Result<(), anyhow::Error> {
        if !(self.extraction_url.starts_with("http://")
            || self.extraction_url.starts_with("https://"))
        {
            return Err(anyhow::anyhow!(
                "EXTRACTION_URL must be an http(s) URL, got {}",
                self.extraction_url
            ));
        }
        if let Some(url) = &self.export_upstream_url {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(anyhow::anyhow!(
                    "EXPORT_UPSTREAM_URL must be an http(s) URL, got {}",
                    url
                ));
            }
        }
        if self.max_file_size_bytes == 0 {
            return Err(anyhow::anyhow!("MAX_FILE_SIZE_MB must be greater than 0"));
        }
        if self.extraction_timeout_secs == 0 || self.workbook_timeout_secs == 0 {
            return Err(anyhow::anyhow!(
                "EXTRACTION_TIMEOUT_SECS and WORKBOOK_TIMEOUT_SECS must be greater than 0"
            ));
        }
        if self.export_timeout_secs == 0 {
            return Err(anyhow::anyhow!("EXPORT_TIMEOUT_SECS must be greater than 0"));
        }
        Ok(())
    }
}
