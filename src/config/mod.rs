use serde::{Deserialize, Serialize};
use std::env;
use thiserror::Error;

const DEFAULT_PORT: u16 = 5000;
const DEFAULT_DB_HOST: &str = "cluster0.ffkzbfb.mongodb.net";
const DEFAULT_DB_NAME: &str = "vixCarrer";
const DEFAULT_SESSION_EXPIRY_DAYS: i64 = 30;
const MAX_SESSION_EXPIRY_DAYS: i64 = 36500;
const DEFAULT_CORS_ORIGINS: &[&str] = &["http://localhost:5173", "http://localhost:5174"];

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing configuration: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {name}: {value}")]
    Invalid { name: &'static str, value: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub api: ApiConfig,
    pub database: DatabaseConfig,
    pub security: SecurityConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub port: u16,
    pub cors_origins: Vec<String>,
}

#[derive(Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub user: Option<String>,
    pub password: Option<String>,
    pub host: String,
    pub name: String,
    /// Full connection string; takes precedence over user/password/host.
    pub uri: Option<String>,
}

#[derive(Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    pub session_secret: String,
    pub session_expiry_days: i64,
}

// Credentials stay out of logs.
impl std::fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .field("host", &self.host)
            .field("name", &self.name)
            .field("uri", &self.uri.as_ref().map(|_| "***"))
            .finish()
    }
}

impl std::fmt::Debug for SecurityConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecurityConfig")
            .field("session_secret", &"***")
            .field("session_expiry_days", &self.session_expiry_days)
            .finish()
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Builds the configuration from any variable source, validating required values.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let environment = match var("APP_ENV").or_else(|| var("NODE_ENV")).as_deref() {
            Some("production") | Some("prod") => Environment::Production,
            _ => Environment::Development,
        };

        let port = match var("PORT") {
            Some(v) => v.parse().map_err(|_| ConfigError::Invalid { name: "PORT", value: v })?,
            None => DEFAULT_PORT,
        };

        let cors_origins: Vec<String> = match var("CORS_ORIGINS") {
            Some(v) => v
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            None => DEFAULT_CORS_ORIGINS.iter().map(|s| s.to_string()).collect(),
        };
        // Credentialed CORS needs explicit origins.
        if let Some(wildcard) = cors_origins.iter().find(|origin| origin.contains('*')) {
            return Err(ConfigError::Invalid {
                name: "CORS_ORIGINS",
                value: wildcard.clone(),
            });
        }

        let session_secret = var("ACCESS_TOKEN_SECRET").ok_or(ConfigError::Missing("ACCESS_TOKEN_SECRET"))?;

        let session_expiry_days = match var("SESSION_EXPIRY_DAYS") {
            Some(v) => match v.parse::<i64>() {
                Ok(days) if (1..=MAX_SESSION_EXPIRY_DAYS).contains(&days) => days,
                _ => return Err(ConfigError::Invalid { name: "SESSION_EXPIRY_DAYS", value: v }),
            },
            None => DEFAULT_SESSION_EXPIRY_DAYS,
        };

        Ok(Self {
            environment,
            api: ApiConfig { port, cors_origins },
            database: DatabaseConfig {
                user: var("DB_USER"),
                password: var("DB_PASS"),
                host: var("DB_HOST").unwrap_or_else(|| DEFAULT_DB_HOST.to_string()),
                name: var("DB_NAME").unwrap_or_else(|| DEFAULT_DB_NAME.to_string()),
                uri: var("MONGODB_URI"),
            },
            security: SecurityConfig {
                session_secret,
                session_expiry_days,
            },
        })
    }

    pub fn is_production(&self) -> bool {
        self.environment == Environment::Production
    }
}

impl DatabaseConfig {
    /// Connection string for the store, built from credentials unless `MONGODB_URI` is set.
    pub fn connection_uri(&self) -> Result<String, ConfigError> {
        if let Some(uri) = &self.uri {
            return Ok(uri.clone());
        }

        let user = self.user.as_deref().ok_or(ConfigError::Missing("DB_USER"))?;
        let password = self.password.as_deref().ok_or(ConfigError::Missing("DB_PASS"))?;

        let invalid_host = || ConfigError::Invalid {
            name: "DB_HOST",
            value: self.host.clone(),
        };
        let mut url = url::Url::parse(&format!("mongodb+srv://{}/", self.host)).map_err(|_| invalid_host())?;
        url.set_username(user).map_err(|_| invalid_host())?;
        url.set_password(Some(password)).map_err(|_| invalid_host())?;
        url.set_query(Some("retryWrites=true&w=majority&appName=Cluster0"));

        Ok(url.into())
    }
}
