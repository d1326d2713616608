use std::env;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use url::Url;

pub const DEFAULT_PLATFORM_URL: &str = "https://app.joinhandshake.com";
const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 \
(KHTML, like Gecko) Chrome/124.0 Safari/537.36";

/// Distinguishes runtime behavior for different stages of the tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub platform: PlatformConfig,
    pub files: FileConfig,
    pub telemetry: TelemetryConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let base_url =
            env::var("APP_PLATFORM_URL").unwrap_or_else(|_| DEFAULT_PLATFORM_URL.to_string());
        Url::parse(&base_url).map_err(|source| ConfigError::InvalidPlatformUrl { source })?;

        let timeout_secs = env::var("APP_REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".to_string())
            .parse::<u64>()
            .ok()
            .filter(|secs| *secs > 0)
            .ok_or(ConfigError::InvalidTimeout)?;

        let user_agent =
            env::var("APP_USER_AGENT").unwrap_or_else(|_| DEFAULT_USER_AGENT.to_string());

        let files = FileConfig {
            profile: path_var("APP_CONFIG_FILE", "conf.json"),
            deferred: path_var("APP_WAIT_FILE", "wait.json"),
            applications: path_var("APP_JOBS_FILE", "jobs.csv"),
        };

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        Ok(Self {
            environment,
            platform: PlatformConfig {
                base_url,
                user_agent,
                request_timeout: Duration::from_secs(timeout_secs),
            },
            files,
            telemetry: TelemetryConfig { log_level },
        })
    }
}

fn path_var(name: &str, default: &str) -> PathBuf {
    env::var(name)
        .ok()
        .filter(|value| !value.trim().is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(default))
}

/// Settings for talking to the recruiting platform.
#[derive(Debug, Clone)]
pub struct PlatformConfig {
    pub base_url: String,
    pub user_agent: String,
    pub request_timeout: Duration,
}

/// Locations of the profile, deferred-job file and application log.
#[derive(Debug, Clone)]
pub struct FileConfig {
    pub profile: PathBuf,
    pub deferred: PathBuf,
    pub applications: PathBuf,
}

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidTimeout,
    InvalidPlatformUrl { source: url::ParseError },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidTimeout => {
                write!(f, "APP_REQUEST_TIMEOUT_SECS must be a positive integer")
            }
            ConfigError::InvalidPlatformUrl { .. } => {
                write!(f, "APP_PLATFORM_URL must be an absolute URL")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidTimeout => None,
            ConfigError::InvalidPlatformUrl { source } => Some(source),
        }
    }
}
