use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

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

/// Top-level configuration for the case desk service.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub automation: AutomationConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(&var_or("APP_ENV", "development"));

        let host = var_or("APP_HOST", "127.0.0.1");
        let port = var_or("APP_PORT", "3000")
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = var_or("APP_LOG_LEVEL", "info");

        let interval_secs = var_or("APP_SWEEP_INTERVAL_SECS", "60")
            .parse::<u64>()
            .map_err(|_| ConfigError::InvalidSweepInterval)?;
        let automation = AutomationConfig {
            sweep_interval: AutomationConfig::interval_from_secs(interval_secs)?,
            case_prefix: var_or("APP_CASE_PREFIX", "EXP"),
            org_code: var_or("APP_ORG_CODE", "GEN"),
            alert_recipient: var_or("APP_ALERT_RECIPIENT", "case-desk"),
        };

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            automation,
        })
    }
}

fn var_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
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

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Knobs for identifier generation and the background sweep.
#[derive(Debug, Clone)]
pub struct AutomationConfig {
    pub sweep_interval: Duration,
    pub case_prefix: String,
    pub org_code: String,
    /// Staff mailbox receiving deadline alerts.
    pub alert_recipient: String,
}

impl AutomationConfig {
    pub fn interval_from_secs(secs: u64) -> Result<Duration, ConfigError> {
        if secs == 0 {
            return Err(ConfigError::InvalidSweepInterval);
        }
        Ok(Duration::from_secs(secs))
    }
}

impl Default for AutomationConfig {
    fn default() -> Self {
        Self {
            sweep_interval: Duration::from_secs(60),
            case_prefix: "EXP".to_string(),
            org_code: "GEN".to_string(),
            alert_recipient: "case-desk".to_string(),
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidSweepInterval,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidSweepInterval => {
                write!(f, "APP_SWEEP_INTERVAL_SECS must be a whole number of seconds >= 1")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidPort | ConfigError::InvalidSweepInterval => None,
            ConfigError::InvalidHost { source } => Some(source),
        }
    }
}
