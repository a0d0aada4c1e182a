use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use url::Url;

use crate::ads::RetryPolicy;

const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8080";
const DEFAULT_GOOGLE_PROFILE_URL: &str = "https://www.googleapis.com/userinfo/v2/me";
const DEFAULT_FACEBOOK_PROFILE_URL: &str =
    "https://graph.facebook.com/me?fields=id,name,email,picture";

/// Distinguishes runtime behavior for different stages of the client.
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

/// Top-level configuration for the client and its command-line front end.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub environment: AppEnvironment,
    pub api: ApiConfig,
    pub session: SessionConfig,
    pub ads: AdConfig,
    pub stub: StubServerConfig,
    pub telemetry: TelemetryConfig,
}

impl ClientConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("ESTATE_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let base_url = parse_url("ESTATE_API_BASE_URL", DEFAULT_BASE_URL)?;
        let google_profile_url =
            parse_url("ESTATE_GOOGLE_PROFILE_URL", DEFAULT_GOOGLE_PROFILE_URL)?;
        let facebook_profile_url =
            parse_url("ESTATE_FACEBOOK_PROFILE_URL", DEFAULT_FACEBOOK_PROFILE_URL)?;
        let request_timeout = parse_seconds("ESTATE_REQUEST_TIMEOUT_SECS", 30)?;
        let signup_timeout = parse_seconds("ESTATE_SIGNUP_TIMEOUT_SECS", 10)?;

        let session_path = env::var("ESTATE_SESSION_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(".estate").join("session.json"));

        let reopen_interval = parse_seconds("ESTATE_AD_REOPEN_INTERVAL_SECS", 60)?;
        let reopen_jitter = parse_seconds("ESTATE_AD_REOPEN_JITTER_SECS", 15)?;

        let stub_host = env::var("ESTATE_STUB_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let stub_port = env::var("ESTATE_STUB_PORT")
            .unwrap_or_else(|_| "8080".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("ESTATE_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        Ok(Self {
            environment,
            api: ApiConfig {
                base_url,
                request_timeout,
                signup_timeout,
                google_profile_url,
                facebook_profile_url,
            },
            session: SessionConfig { path: session_path },
            ads: AdConfig {
                reopen_interval,
                reopen_jitter,
            },
            stub: StubServerConfig {
                host: stub_host,
                port: stub_port,
            },
            telemetry: TelemetryConfig { log_level },
        })
    }
}

/// Endpoints and timeouts used by the API client.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub base_url: Url,
    pub request_timeout: Duration,
    pub signup_timeout: Duration,
    pub google_profile_url: Url,
    pub facebook_profile_url: Url,
}

impl ApiConfig {
    /// Configuration pointing every endpoint at `base_url`, with the default timeouts.
    pub fn for_base_url(base_url: Url) -> Self {
        let google_profile_url = base_url
            .join("identity/google/me")
            .unwrap_or_else(|_| base_url.clone());
        let facebook_profile_url = base_url
            .join("identity/facebook/me")
            .unwrap_or_else(|_| base_url.clone());
        Self {
            base_url,
            request_timeout: Duration::from_secs(30),
            signup_timeout: Duration::from_secs(10),
            google_profile_url,
            facebook_profile_url,
        }
    }
}

/// Where the session record lives on disk.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub path: PathBuf,
}

/// Reopen schedule for timed ad placements.
#[derive(Debug, Clone, Copy)]
pub struct AdConfig {
    pub reopen_interval: Duration,
    pub reopen_jitter: Duration,
}

impl AdConfig {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.reopen_interval, self.reopen_jitter)
    }
}

/// Settings controlling the local stub backend binding.
#[derive(Debug, Clone)]
pub struct StubServerConfig {
    pub host: String,
    pub port: u16,
}

impl StubServerConfig {
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

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

fn parse_url(variable: &'static str, default: &str) -> Result<Url, ConfigError> {
    let raw = env::var(variable).unwrap_or_else(|_| default.to_string());
    let url = Url::parse(raw.trim()).map_err(|source| ConfigError::InvalidUrl { variable, source })?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::UnsupportedScheme {
            variable,
            scheme: url.scheme().to_string(),
        });
    }
    Ok(url)
}

fn parse_seconds(variable: &'static str, default: u64) -> Result<Duration, ConfigError> {
    match env::var(variable) {
        Ok(raw) => raw
            .trim()
            .parse::<u64>()
            .map(Duration::from_secs)
            .map_err(|_| ConfigError::InvalidDuration { variable }),
        Err(_) => Ok(Duration::from_secs(default)),
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost {
        source: std::net::AddrParseError,
    },
    InvalidUrl {
        variable: &'static str,
        source: url::ParseError,
    },
    UnsupportedScheme {
        variable: &'static str,
        scheme: String,
    },
    InvalidDuration {
        variable: &'static str,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "ESTATE_STUB_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "ESTATE_STUB_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidUrl { variable, .. } => {
                write!(f, "{variable} must be an absolute URL")
            }
            ConfigError::UnsupportedScheme { variable, scheme } => {
                write!(f, "{variable} must use http or https, found '{scheme}'")
            }
            ConfigError::InvalidDuration { variable } => {
                write!(f, "{variable} must be a whole number of seconds")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            ConfigError::InvalidUrl { source, .. } => Some(source),
            ConfigError::InvalidPort
            | ConfigError::UnsupportedScheme { .. }
            | ConfigError::InvalidDuration { .. } => None,
        }
    }
}
