//! Application configuration, read from the process environment.

use std::fmt;

/// Deployment environment, taken from `NODE_ENV`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
    Test,
}

impl Environment {
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "production" | "prod" => Environment::Production,
            "test" => Environment::Test,
            _ => Environment::Development,
        }
    }

    pub fn is_production(self) -> bool {
        self == Environment::Production
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Production => write!(f, "production"),
            Environment::Test => write!(f, "test"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: Environment,
    pub host: String,
    pub port: u16,
    pub mongodb_uri: Option<String>,
    pub mongodb_db: String,
    pub db_pool_max: u32,
    pub payload_secret: Option<String>,
    pub public_api_url: Option<String>,
    pub site_pipeline_url: Option<String>,
    pub allowed_origins: Vec<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            environment: Environment::Development,
            host: "127.0.0.1".to_string(),
            port: 3001,
            mongodb_uri: None,
            mongodb_db: "portfolio_cms".to_string(),
            db_pool_max: 10,
            payload_secret: None,
            public_api_url: None,
            site_pipeline_url: None,
            allowed_origins: vec![
                "http://localhost:3000".to_string(),
                "http://127.0.0.1:3000".to_string(),
            ],
        }
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("PAYLOAD_SECRET must be set in production")]
    MissingPayloadSecret,
}

fn non_empty(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl AppConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let allowed_origins = non_empty("ALLOWED_ORIGINS")
            .map(|s| {
                s.split(',')
                    .map(|origin| origin.trim().to_string())
                    .filter(|origin| !origin.is_empty())
                    .collect::<Vec<_>>()
            })
            .filter(|origins| !origins.is_empty())
            .unwrap_or(defaults.allowed_origins);

        Self {
            environment: non_empty("NODE_ENV")
                .map(|v| Environment::parse(&v))
                .unwrap_or(defaults.environment),
            host: non_empty("HOST").unwrap_or(defaults.host),
            port: non_empty("PORT")
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.port),
            mongodb_uri: non_empty("MONGODB_URI"),
            mongodb_db: non_empty("MONGODB_DB").unwrap_or(defaults.mongodb_db),
            db_pool_max: non_empty("DB_POOL_MAX")
                .and_then(|s| s.parse().ok())
                .filter(|n| *n > 0)
                .unwrap_or(defaults.db_pool_max),
            payload_secret: non_empty("PAYLOAD_SECRET"),
            public_api_url: non_empty("NEXT_PUBLIC_API_URL"),
            site_pipeline_url: non_empty("SITE_PIPELINE_URL")
                .map(|url| url.trim_end_matches('/').to_string()),
            allowed_origins,
        }
    }

    /// Start-up checks that must hold before the server binds.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.environment.is_production() && self.payload_secret.is_none() {
            return Err(ConfigError::MissingPayloadSecret);
        }
        Ok(())
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
