/// Configuration management for StreamHub
use crate::error::{ApiError, ApiResult};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

/// Main server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub service: ServiceConfig,
    pub storage: StorageConfig,
    pub auth: AuthConfig,
}

/// Service-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    pub hostname: String,
    pub port: u16,
    /// Exact origin allowed for credentialed CORS requests; any origin if unset
    pub cors_origin: Option<String>,
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub data_directory: PathBuf,
    pub database: PathBuf,
    pub media_directory: PathBuf,
}

/// Authentication configuration
///
/// Access and refresh tokens are signed with separate secrets so a refresh
/// token can never be presented where an access token is expected.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    pub access_token_secret: String,
    pub refresh_token_secret: String,
    pub access_token_ttl_secs: i64,
    pub refresh_token_ttl_days: i64,
}

impl ServerConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> ApiResult<Self> {
        dotenv::dotenv().ok();

        let hostname = env::var("HUB_HOSTNAME").unwrap_or_else(|_| "localhost".to_string());
        let port = env::var("HUB_PORT")
            .unwrap_or_else(|_| "8000".to_string())
            .parse()
            .map_err(|_| ApiError::Validation("Invalid port number".to_string()))?;
        let cors_origin = env::var("CORS_ORIGIN").ok();

        let data_directory =
            PathBuf::from(env::var("HUB_DATA_DIR").unwrap_or_else(|_| "./data".to_string()));
        let database = env::var("HUB_DATABASE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| data_directory.join("streamhub.db"));
        let media_directory = env::var("HUB_MEDIA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| data_directory.join("media"));

        let access_token_secret = env::var("ACCESS_TOKEN_SECRET")
            .map_err(|_| ApiError::Validation("ACCESS_TOKEN_SECRET must be set".to_string()))?;
        let refresh_token_secret = env::var("REFRESH_TOKEN_SECRET")
            .map_err(|_| ApiError::Validation("REFRESH_TOKEN_SECRET must be set".to_string()))?;
        let access_token_ttl_secs = env::var("ACCESS_TOKEN_TTL_SECS")
            .unwrap_or_else(|_| "900".to_string())
            .parse()
            .map_err(|_| ApiError::Validation("Invalid access token TTL".to_string()))?;
        let refresh_token_ttl_days = env::var("REFRESH_TOKEN_TTL_DAYS")
            .unwrap_or_else(|_| "10".to_string())
            .parse()
            .map_err(|_| ApiError::Validation("Invalid refresh token TTL".to_string()))?;

        Ok(Self {
            service: ServiceConfig {
                hostname,
                port,
                cors_origin,
            },
            storage: StorageConfig {
                data_directory,
                database,
                media_directory,
            },
            auth: AuthConfig {
                access_token_secret,
                refresh_token_secret,
                access_token_ttl_secs,
                refresh_token_ttl_days,
            },
        })
    }

    /// Validate configuration before the context is built
    pub fn validate(&self) -> ApiResult<()> {
        if self.auth.access_token_secret.is_empty() || self.auth.refresh_token_secret.is_empty() {
            return Err(ApiError::Validation(
                "Token secrets cannot be empty".to_string(),
            ));
        }

        if self.auth.access_token_secret == self.auth.refresh_token_secret {
            return Err(ApiError::Validation(
                "Access and refresh token secrets must differ".to_string(),
            ));
        }

        if self.auth.refresh_token_ttl_days <= 0 {
            return Err(ApiError::Validation(
                "Refresh token TTL must be positive".to_string(),
            ));
        }

        Ok(())
    }
}
