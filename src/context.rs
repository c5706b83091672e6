/// Application context and dependency injection
use crate::{
    account::AccountManager,
    config::ServerConfig,
    content::{ContentStore, SqliteContentStore},
    db,
    error::ApiResult,
    media::{DiskMediaStore, MediaStore},
    subscription::{queries::GraphQueryEngine, SubscriptionStore},
    token::{TokenConfig, TokenService},
};
use sqlx::SqlitePool;
use std::sync::Arc;

/// Application context holding all shared services
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<ServerConfig>,
    pub db: SqlitePool,
    pub accounts: Arc<AccountManager>,
    pub tokens: Arc<TokenService>,
    pub subscriptions: Arc<SubscriptionStore>,
    pub graph: Arc<GraphQueryEngine>,
    pub media: Arc<dyn MediaStore>,
}

impl AppContext {
    /// Create a new application context from configuration
    pub async fn new(config: ServerConfig) -> ApiResult<Self> {
        // Validate configuration
        config.validate()?;

        // Create data directories if they don't exist
        Self::ensure_directories(&config).await?;

        // Initialize database
        let db = db::create_pool(&config.storage.database, db::DatabaseOptions::default()).await?;

        // Run migrations
        db::run_migrations(&db).await?;

        // Test connection
        db::test_connection(&db).await?;

        let accounts = Arc::new(AccountManager::new(db.clone()));

        let tokens = Arc::new(TokenService::new(
            db.clone(),
            TokenConfig {
                access_secret: config.auth.access_token_secret.clone(),
                refresh_secret: config.auth.refresh_token_secret.clone(),
                access_ttl_secs: config.auth.access_token_ttl_secs,
                refresh_ttl_days: config.auth.refresh_token_ttl_days,
            },
        ));

        let subscriptions = Arc::new(SubscriptionStore::new(db.clone()));

        let content: Arc<dyn ContentStore> = Arc::new(SqliteContentStore::new(db.clone()));
        let graph = Arc::new(GraphQueryEngine::new(db.clone(), content));

        let media: Arc<dyn MediaStore> =
            Arc::new(DiskMediaStore::new(config.storage.media_directory.clone()));

        Ok(Self {
            config: Arc::new(config),
            db,
            accounts,
            tokens,
            subscriptions,
            graph,
            media,
        })
    }

    /// Ensure required directories exist
    async fn ensure_directories(config: &ServerConfig) -> ApiResult<()> {
        for dir in [&config.storage.data_directory, &config.storage.media_directory] {
            if !dir.exists() {
                tokio::fs::create_dir_all(dir).await?;
            }
        }

        Ok(())
    }

    /// Get service URL
    pub fn service_url(&self) -> String {
        format!(
            "http://{}:{}",
            self.config.service.hostname, self.config.service.port
        )
    }
}
