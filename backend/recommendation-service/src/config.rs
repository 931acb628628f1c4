use std::env;
use std::fmt;
use std::str::FromStr;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

/// Deployment environment selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Development,
    Production,
}

impl FromStr for Environment {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "development" => Ok(Self::Development),
            "production" => Ok(Self::Production),
            other => bail!("unknown environment: {other}"),
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Development => write!(f, "development"),
            Self::Production => write!(f, "production"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub app: AppConfig,
    pub upstream: UpstreamConfig,
    pub auth: AuthConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub env: Environment,
    pub port: u16,
    pub log_level: String,
    pub secret_key: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamConfig {
    pub graph_service_url: String,
    pub content_service_url: String,
    pub user_service_url: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    pub enabled: bool,
    pub issuer: String,
    pub audience: String,
    pub jwks_url: String,
}

impl Config {
    /// Load configuration from environment variables. Called once at startup;
    /// the resulting value is immutable for the process lifetime.
    pub fn from_env() -> Result<Self> {
        let env_selector = match env::var("APP_ENV") {
            Ok(v) => v.parse()?,
            Err(_) => Environment::Production,
        };

        // POST_API_URL covers deployments where the graph and content
        // endpoints are served from one combined upstream.
        let shared_base = env::var("POST_API_URL").ok();
        let graph_service_url = env::var("GRAPH_SERVICE_URL")
            .ok()
            .or_else(|| shared_base.clone())
            .context("GRAPH_SERVICE_URL or POST_API_URL must be set")?;
        let content_service_url = env::var("CONTENT_SERVICE_URL")
            .ok()
            .or(shared_base)
            .context("CONTENT_SERVICE_URL or POST_API_URL must be set")?;

        let enabled: bool = env::var("AUTH_ENABLED")
            .unwrap_or_else(|_| "false".to_string())
            .parse()
            .context("Invalid AUTH_ENABLED")?;
        let audience = match env::var("OIDC_AUDIENCE") {
            Ok(v) => v,
            Err(_) if !enabled => String::new(),
            Err(_) => bail!("OIDC_AUDIENCE must be set when AUTH_ENABLED is true"),
        };

        Ok(Config {
            app: AppConfig {
                env: env_selector,
                port: env::var("APP_PORT")
                    .unwrap_or_else(|_| "8082".to_string())
                    .parse()
                    .context("Invalid APP_PORT")?,
                log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
                secret_key: env::var("RECOMMENDATION_SERVICE_SECRET_KEY")
                    .context("RECOMMENDATION_SERVICE_SECRET_KEY must be set")?,
            },
            upstream: UpstreamConfig {
                graph_service_url,
                content_service_url,
                user_service_url: env::var("USER_SERVICE_URL")
                    .unwrap_or_else(|_| "http://127.0.0.1:8081".to_string()),
                timeout_secs: env::var("UPSTREAM_TIMEOUT_SECS")
                    .unwrap_or_else(|_| "10".to_string())
                    .parse()
                    .context("Invalid UPSTREAM_TIMEOUT_SECS")?,
            },
            auth: AuthConfig {
                enabled,
                issuer: env::var("OIDC_ISSUER")
                    .unwrap_or_else(|_| "https://accounts.google.com".to_string()),
                audience,
                jwks_url: env::var("OIDC_JWKS_URL")
                    .unwrap_or_else(|_| "https://www.googleapis.com/oauth2/v3/certs".to_string()),
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn environment_parses_known_values() {
        assert_eq!(
            "development".parse::<Environment>().unwrap(),
            Environment::Development
        );
        assert_eq!(
            "production".parse::<Environment>().unwrap(),
            Environment::Production
        );
    }

    #[test]
    fn environment_rejects_unknown_values() {
        assert!("staging".parse::<Environment>().is_err());
    }

    #[test]
    fn environment_displays_lowercase() {
        assert_eq!(Environment::Development.to_string(), "development");
        assert_eq!(Environment::Production.to_string(), "production");
    }
}
