use std::env;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use crate::workflows::documents::{email_domain, DispatchMode, FollowUpCadence, ParseCadenceError};

/// Distinguishes runtime behavior for different stages of the service.
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
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub workspace: WorkspaceConfig,
    pub storage: StorageConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let audit_log_path = env::var("APP_AUDIT_LOG_PATH")
            .ok()
            .filter(|value| !value.trim().is_empty())
            .map(PathBuf::from);
        let listing_store_dir = env::var("APP_LISTING_STORE_DIR")
            .ok()
            .filter(|value| !value.trim().is_empty())
            .map(PathBuf::from);

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            workspace: WorkspaceConfig::from_env()?,
            storage: StorageConfig {
                audit_log_path,
                listing_store_dir,
            },
        })
    }
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }

        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|source| ConfigError::InvalidHost { source })?;

        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Tracing and metrics controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Per-workspace behavior of the document desk and its workers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkspaceConfig {
    pub follow_up_cadence: FollowUpCadence,
    pub track_external_threads_only: bool,
    pub auto_send: bool,
    pub sending_identity: String,
    pub reply_workers: usize,
    pub tick_interval: Duration,
    pub min_document_bytes: u64,
    pub delivery_max_attempts: u32,
}

impl Default for WorkspaceConfig {
    fn default() -> Self {
        Self {
            follow_up_cadence: FollowUpCadence::EveryThreeBusinessDays,
            track_external_threads_only: false,
            auto_send: false,
            sending_identity: "makler@example.com".to_string(),
            reply_workers: 4,
            tick_interval: Duration::from_secs(86_400),
            min_document_bytes: 10 * 1024,
            delivery_max_attempts: 5,
        }
    }
}

impl WorkspaceConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let follow_up_cadence = match env::var("WORKSPACE_FOLLOW_UP_CADENCE") {
            Ok(value) => value
                .parse()
                .map_err(|source| ConfigError::InvalidCadence { source })?,
            Err(_) => defaults.follow_up_cadence,
        };

        let sending_identity = env::var("WORKSPACE_SENDING_IDENTITY")
            .unwrap_or(defaults.sending_identity)
            .trim()
            .to_string();
        if email_domain(&sending_identity).is_none() {
            return Err(ConfigError::InvalidSendingIdentity(sending_identity));
        }

        let reply_workers = parse_number("WORKSPACE_REPLY_WORKERS", defaults.reply_workers)?;
        if reply_workers == 0 {
            return Err(ConfigError::InvalidNumber {
                name: "WORKSPACE_REPLY_WORKERS",
                value: "0".to_string(),
            });
        }

        let tick_seconds = parse_number(
            "WORKSPACE_TICK_SECONDS",
            defaults.tick_interval.as_secs(),
        )?;

        Ok(Self {
            follow_up_cadence,
            track_external_threads_only: parse_flag(
                "WORKSPACE_TRACK_EXTERNAL_THREADS_ONLY",
                defaults.track_external_threads_only,
            )?,
            auto_send: parse_flag("WORKSPACE_AUTO_SEND", defaults.auto_send)?,
            sending_identity,
            reply_workers,
            tick_interval: Duration::from_secs(tick_seconds.max(1)),
            min_document_bytes: parse_number(
                "WORKSPACE_MIN_DOCUMENT_BYTES",
                defaults.min_document_bytes,
            )?,
            delivery_max_attempts: parse_number(
                "WORKSPACE_DELIVERY_MAX_ATTEMPTS",
                defaults.delivery_max_attempts,
            )?
            .max(1),
        })
    }

    pub fn dispatch_mode(&self) -> DispatchMode {
        if self.auto_send {
            DispatchMode::AutoSend
        } else {
            DispatchMode::Draft
        }
    }

    /// Domain of the sending identity, used to spot internal threads.
    pub fn own_domain(&self) -> Option<String> {
        email_domain(&self.sending_identity)
    }
}

/// Where durable state lives.
#[derive(Debug, Clone, Default)]
pub struct StorageConfig {
    /// JSON-lines audit file; in-memory when unset.
    pub audit_log_path: Option<PathBuf>,
    /// Directory of per-listing JSON snapshots; in-memory when unset.
    pub listing_store_dir: Option<PathBuf>,
}

fn parse_flag(name: &'static str, default: bool) -> Result<bool, ConfigError> {
    match env::var(name) {
        Ok(value) => match value.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(ConfigError::InvalidFlag { name, value }),
        },
        Err(_) => Ok(default),
    }
}

fn parse_number<T: std::str::FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidNumber { name, value }),
        Err(_) => Ok(default),
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("APP_PORT must be a valid u16")]
    InvalidPort,
    #[error("APP_HOST must parse to an IPv4 or IPv6 address")]
    InvalidHost {
        #[source]
        source: std::net::AddrParseError,
    },
    #[error("WORKSPACE_FOLLOW_UP_CADENCE: {source}")]
    InvalidCadence {
        #[source]
        source: ParseCadenceError,
    },
    #[error("{name} must be true or false, got '{value}'")]
    InvalidFlag { name: &'static str, value: String },
    #[error("{name} must be a positive number, got '{value}'")]
    InvalidNumber { name: &'static str, value: String },
    #[error("WORKSPACE_SENDING_IDENTITY must be an email address, got '{0}'")]
    InvalidSendingIdentity(String),
}
