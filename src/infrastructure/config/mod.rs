use serde::{Deserialize, Serialize};
use std::{net::SocketAddr, time::Duration};
use thiserror::Error;

use crate::domain::value_objects::{LocaleError, SupportedLocales};

/// Runtime mode for the application
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuntimeMode {
    Local,
    Production,
}

impl std::fmt::Display for RuntimeMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Local => write!(f, "local"),
            Self::Production => write!(f, "production"),
        }
    }
}

impl std::str::FromStr for RuntimeMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "local" => Ok(Self::Local),
            "production" | "prod" => Ok(Self::Production),
            _ => Err(format!("Invalid runtime mode: {s}. Valid values: local, production")),
        }
    }
}

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub mode: RuntimeMode,
    pub server: ServerConfig,
    pub edge: EdgeConfig,
    pub session: SessionConfig,
    pub logging: LoggingConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Edge request pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EdgeConfig {
    /// Production deployment: HTTPS is enforced unless `is_local_host` is set
    pub is_production: bool,
    /// Local or CI deployment that must never be upgraded to HTTPS
    pub is_local_host: bool,
    /// Ordered list of locale codes served by the application
    pub supported_locales: Vec<String>,
    pub default_locale: String,
    pub locale_cookie_name: String,
    pub rate_limit_window_secs: u64,
    pub rate_limit_threshold: u32,
    /// Bucket count above which expired buckets are swept immediately
    pub rate_limit_max_buckets: usize,
    pub rate_limit_sweep_interval_secs: u64,
    /// Origin used for the canonical `Link` header, e.g. `https://example.com`
    pub public_origin: Option<String>,
    pub hsts_max_age_secs: u64,
    pub csp: CspConfig,
}

/// Third-party hosts allowed by the Content-Security-Policy
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CspConfig {
    pub script_hosts: Vec<String>,
    pub image_hosts: Vec<String>,
    pub connect_hosts: Vec<String>,
}

/// Session provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// HS256 secret; sessions are disabled when absent
    pub jwt_secret: Option<String>,
    pub cookie_name: String,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub filter: Option<String>,
    pub format: LogFormat,
    pub log_user_agent: bool,
    pub max_user_agent_length: usize,
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Json,
    Compact,
}

/// Errors raised while loading or validating configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] ::config::ConfigError),

    #[error("Invalid locale configuration: {0}")]
    Locale(#[from] LocaleError),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

impl AppConfig {
    /// Load configuration based on runtime mode
    ///
    /// # Errors
    /// Returns an error if environment values cannot be parsed or fail validation
    pub fn load() -> Result<Self, ConfigError> {
        // Detect runtime mode from environment (default: local)
        let mode = std::env::var("RUN_MODE")
            .unwrap_or_else(|_| "local".to_string())
            .parse::<RuntimeMode>()
            .map_err(ConfigError::Invalid)?;

        Self::load_for_mode(mode)
    }

    /// Load configuration for a specific runtime mode
    ///
    /// # Errors
    /// Returns an error if environment values cannot be parsed or fail validation
    pub fn load_for_mode(mode: RuntimeMode) -> Result<Self, ConfigError> {
        let mut builder = ::config::Config::builder();

        if mode == RuntimeMode::Local {
            builder = builder.add_source(::config::File::with_name(".env.local").required(false));
        }

        builder = builder.add_source(
            ::config::Environment::with_prefix("EDGE_GATEWAY")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("edge.supported_locales")
                .with_list_parse_key("edge.csp.script_hosts")
                .with_list_parse_key("edge.csp.image_hosts")
                .with_list_parse_key("edge.csp.connect_hosts"),
        );

        let (is_production, log_format) = match mode {
            RuntimeMode::Local => (false, "pretty"),
            RuntimeMode::Production => (true, "json"),
        };

        let settings = builder
            .set_default("mode", mode.to_string())?
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 3000)?
            .set_default("edge.is_production", is_production)?
            .set_default("edge.is_local_host", false)?
            .set_default("edge.supported_locales", vec!["en", "ru", "uz"])?
            .set_default("edge.default_locale", "en")?
            .set_default("edge.locale_cookie_name", "locale")?
            .set_default("edge.rate_limit_window_secs", 60)?
            .set_default("edge.rate_limit_threshold", 120)?
            .set_default("edge.rate_limit_max_buckets", 10_000)?
            .set_default("edge.rate_limit_sweep_interval_secs", 300)?
            .set_default("edge.public_origin", None::<String>)?
            .set_default("edge.hsts_max_age_secs", 63_072_000)? // 2 years
            .set_default(
                "edge.csp.script_hosts",
                vec!["https://www.googletagmanager.com", "https://www.google-analytics.com"],
            )?
            .set_default(
                "edge.csp.image_hosts",
                vec!["https://www.googletagmanager.com", "https://www.google-analytics.com"],
            )?
            .set_default(
                "edge.csp.connect_hosts",
                vec![
                    "https://www.google-analytics.com",
                    "https://region1.google-analytics.com",
                ],
            )?
            .set_default("session.jwt_secret", None::<String>)?
            .set_default("session.cookie_name", "session")?
            .set_default("logging.level", "info")?
            .set_default("logging.filter", None::<String>)?
            .set_default("logging.format", log_format)?
            .set_default("logging.log_user_agent", true)?
            .set_default("logging.max_user_agent_length", 256)?
            .build()?;

        let config: Self = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Check cross-field invariants that deserialization cannot express
    ///
    /// # Errors
    /// Returns the first violated invariant
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.edge.supported_locales()?;

        if self.edge.rate_limit_window_secs == 0 {
            return Err(ConfigError::Invalid("rate_limit_window_secs must be positive".into()));
        }
        if self.edge.rate_limit_threshold == 0 {
            return Err(ConfigError::Invalid("rate_limit_threshold must be positive".into()));
        }
        if self.edge.locale_cookie_name.is_empty() {
            return Err(ConfigError::Invalid("locale_cookie_name must not be empty".into()));
        }
        if let Some(origin) = &self.edge.public_origin {
            if !(origin.starts_with("https://") || origin.starts_with("http://")) {
                return Err(ConfigError::Invalid(format!(
                    "public_origin must be an absolute http(s) origin, got {origin}"
                )));
            }
        }
        Ok(())
    }
}

impl ServerConfig {
    /// Get the socket address for binding
    ///
    /// # Errors
    /// Returns an error if the host/port pair is not a valid socket address
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        format!("{}:{}", self.host, self.port).parse().map_err(|_| {
            ConfigError::Invalid(format!("Invalid bind address {}:{}", self.host, self.port))
        })
    }
}

impl EdgeConfig {
    /// Build the validated locale table
    ///
    /// # Errors
    /// Returns an error if the locale list or default locale is invalid
    pub fn supported_locales(&self) -> Result<SupportedLocales, ConfigError> {
        Ok(SupportedLocales::new(&self.supported_locales, &self.default_locale)?)
    }

    #[must_use]
    pub fn rate_limit_window(&self) -> Duration {
        Duration::from_secs(self.rate_limit_window_secs)
    }

    #[must_use]
    pub fn rate_limit_sweep_interval(&self) -> Duration {
        Duration::from_secs(self.rate_limit_sweep_interval_secs)
    }
}

impl Default for EdgeConfig {
    fn default() -> Self {
        Self {
            is_production: false,
            is_local_host: false,
            supported_locales: vec!["en".to_string(), "ru".to_string(), "uz".to_string()],
            default_locale: "en".to_string(),
            locale_cookie_name: "locale".to_string(),
            rate_limit_window_secs: 60,
            rate_limit_threshold: 120,
            rate_limit_max_buckets: 10_000,
            rate_limit_sweep_interval_secs: 300,
            public_origin: None,
            hsts_max_age_secs: 63_072_000,
            csp: CspConfig::default(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            filter: None,
            format: LogFormat::Pretty,
            log_user_agent: true,
            max_user_agent_length: 256,
        }
    }
}
