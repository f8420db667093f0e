use std::env;
use std::net::{IpAddr, SocketAddr};

use thiserror::Error;

const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 8400;

/// Deployment stage the sales desk believes it is running in. Only logging
/// defaults depend on it; the pipeline behaves identically everywhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuntimeEnv {
    Development,
    Staging,
    Production,
}

impl RuntimeEnv {
    fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "stage" | "staging" => Self::Staging,
            _ => Self::Development,
        }
    }

    pub fn is_production(self) -> bool {
        matches!(self, Self::Production)
    }
}

/// Runtime configuration for the salesdesk service, read once at startup.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: RuntimeEnv,
    pub listen: ListenConfig,
    pub telemetry: TelemetryConfig,
}

impl AppConfig {
    /// Reads the `SALESDESK_*` variables, falling back to development
    /// defaults. A `.env` file in the working directory is honored when
    /// present; sales-floor installs typically carry one.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = RuntimeEnv::parse(
            &env::var("SALESDESK_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("SALESDESK_HOST").unwrap_or_else(|_| DEFAULT_HOST.to_string());
        let port = match env::var("SALESDESK_PORT") {
            Ok(raw) => raw
                .parse::<u16>()
                .map_err(|_| ConfigError::InvalidPort { found: raw })?,
            Err(_) => DEFAULT_PORT,
        };

        // Development installs default to debug so call dispositions and
        // hand-overs show up without extra flags; production stays at info.
        let log_level = env::var("SALESDESK_LOG_LEVEL").unwrap_or_else(|_| {
            if environment.is_production() {
                "info".to_string()
            } else {
                "debug".to_string()
            }
        });

        Ok(Self {
            environment,
            listen: ListenConfig { host, port },
            telemetry: TelemetryConfig {
                log_level,
                ansi: !environment.is_production(),
            },
        })
    }
}

/// Where the HTTP server binds.
#[derive(Debug, Clone)]
pub struct ListenConfig {
    pub host: String,
    pub port: u16,
}

impl ListenConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        let ip: IpAddr = if self.host.eq_ignore_ascii_case("localhost") {
            IpAddr::from([127, 0, 0, 1])
        } else {
            self.host.parse().map_err(|source| ConfigError::InvalidHost {
                found: self.host.clone(),
                source,
            })?
        };

        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Tracing controls handed to `telemetry::init`.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
    pub ansi: bool,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("SALESDESK_PORT must be a u16, found '{found}'")]
    InvalidPort { found: String },
    #[error("SALESDESK_HOST '{found}' is not an IP address or 'localhost'")]
    InvalidHost {
        found: String,
        source: std::net::AddrParseError,
    },
}
