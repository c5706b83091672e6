/// Account manager implementation using runtime queries
use crate::{
    account::PublicProfile,
    db::models::Account,
    error::{ApiError, ApiResult},
};
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::Utc;
use sqlx::SqlitePool;
use uuid::Uuid;

const ACCOUNT_COLUMNS: &str = "id, username, email, full_name, password_hash, \
                               avatar_url, cover_url, refresh_token, created_at, updated_at";

/// Account manager service (credential store)
pub struct AccountManager {
    db: SqlitePool,
}

impl AccountManager {
    /// Create a new account manager
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Register a new account
    ///
    /// Usernames are stored lowercase. Fails with `Conflict` when the
    /// username or email is already taken.
    pub async fn register(
        &self,
        username: &str,
        email: &str,
        full_name: &str,
        password: &str,
    ) -> ApiResult<Account> {
        let username = username.trim().to_lowercase();
        let email = email.trim().to_string();
        let full_name = full_name.trim().to_string();

        if username.is_empty() || email.is_empty() || full_name.is_empty() || password.is_empty() {
            return Err(ApiError::Validation("all fields are required".to_string()));
        }

        let taken: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM account WHERE username = ?1 OR email = ?2")
                .bind(&username)
                .bind(&email)
                .fetch_one(&self.db)
                .await?;

        if taken > 0 {
            return Err(ApiError::Conflict(
                "user with email or username already exists".to_string(),
            ));
        }

        let password_hash = hash_password(password)?;
        let id = Uuid::new_v4().to_string();
        let now = Utc::now();

        sqlx::query(
            "INSERT INTO account (id, username, email, full_name, password_hash, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        )
        .bind(&id)
        .bind(&username)
        .bind(&email)
        .bind(&full_name)
        .bind(&password_hash)
        .bind(now)
        .bind(now)
        .execute(&self.db)
        .await?;

        tracing::info!(account = %id, %username, "account registered");

        Ok(Account {
            id,
            username,
            email,
            full_name,
            password_hash,
            avatar_url: None,
            cover_url: None,
            refresh_token: None,
            created_at: now,
            updated_at: now,
        })
    }

    /// Authenticate by username or email plus password
    pub async fn login(&self, identifier: &str, password: &str) -> ApiResult<Account> {
        let account = self
            .get_by_identifier(identifier)
            .await
            .map_err(|e| match e {
                ApiError::NotFound(_) => ApiError::NotFound("user does not exist".to_string()),
                other => other,
            })?;

        if !verify_password(password, &account.password_hash)? {
            return Err(ApiError::Authentication(
                "invalid user credentials".to_string(),
            ));
        }

        Ok(account)
    }

    /// Get account by id
    pub async fn get(&self, id: &str) -> ApiResult<Account> {
        sqlx::query_as::<_, Account>(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM account WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| ApiError::NotFound("account not found".to_string()))
    }

    /// Get account by username (case-insensitive)
    pub async fn get_by_username(&self, username: &str) -> ApiResult<Account> {
        sqlx::query_as::<_, Account>(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM account WHERE username = ?1"
        ))
        .bind(username.trim().to_lowercase())
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| ApiError::NotFound("account not found".to_string()))
    }

    /// Find account by username or email
    pub async fn get_by_identifier(&self, identifier: &str) -> ApiResult<Account> {
        // Try username first
        if let Ok(account) = self.get_by_username(identifier).await {
            return Ok(account);
        }

        sqlx::query_as::<_, Account>(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM account WHERE email = ?1"
        ))
        .bind(identifier.trim())
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| ApiError::NotFound("account not found".to_string()))
    }

    /// Public view of an account, for attaching as the request principal
    pub async fn public_profile(&self, id: &str) -> ApiResult<PublicProfile> {
        self.get(id).await.map(PublicProfile::from)
    }

    /// Change password after verifying the current one
    pub async fn change_password(&self, id: &str, old: &str, new: &str) -> ApiResult<()> {
        let account = self.get(id).await?;

        if !verify_password(old, &account.password_hash)? {
            return Err(ApiError::Validation("invalid old password".to_string()));
        }

        if new.is_empty() {
            return Err(ApiError::Validation(
                "new password cannot be empty".to_string(),
            ));
        }

        let password_hash = hash_password(new)?;
        sqlx::query("UPDATE account SET password_hash = ?1, updated_at = ?2 WHERE id = ?3")
            .bind(&password_hash)
            .bind(Utc::now())
            .bind(id)
            .execute(&self.db)
            .await?;

        Ok(())
    }

    /// Update display name and email
    pub async fn update_profile(
        &self,
        id: &str,
        full_name: &str,
        email: &str,
    ) -> ApiResult<Account> {
        if full_name.trim().is_empty() || email.trim().is_empty() {
            return Err(ApiError::Validation("all fields are required".to_string()));
        }

        let in_use: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM account WHERE email = ?1 AND id != ?2")
                .bind(email.trim())
                .bind(id)
                .fetch_one(&self.db)
                .await?;

        if in_use > 0 {
            return Err(ApiError::Conflict("email already registered".to_string()));
        }

        let updated = sqlx::query(
            "UPDATE account SET full_name = ?1, email = ?2, updated_at = ?3 WHERE id = ?4",
        )
        .bind(full_name.trim())
        .bind(email.trim())
        .bind(Utc::now())
        .bind(id)
        .execute(&self.db)
        .await?
        .rows_affected();

        if updated == 0 {
            return Err(ApiError::NotFound("account not found".to_string()));
        }

        self.get(id).await
    }

    /// Store an already-uploaded avatar URL
    pub async fn set_avatar(&self, id: &str, url: &str) -> ApiResult<()> {
        self.set_media_url(id, "avatar_url", url).await
    }

    /// Store an already-uploaded cover image URL
    pub async fn set_cover(&self, id: &str, url: &str) -> ApiResult<()> {
        self.set_media_url(id, "cover_url", url).await
    }

    async fn set_media_url(&self, id: &str, column: &str, url: &str) -> ApiResult<()> {
        let updated = sqlx::query(&format!(
            "UPDATE account SET {column} = ?1, updated_at = ?2 WHERE id = ?3"
        ))
        .bind(url)
        .bind(Utc::now())
        .bind(id)
        .execute(&self.db)
        .await?
        .rows_affected();

        if updated == 0 {
            return Err(ApiError::NotFound("account not found".to_string()));
        }

        Ok(())
    }

    /// Record a watched content item, most-recent-first
    ///
    /// Re-watching refreshes the item's position instead of appending a
    /// duplicate.
    pub async fn record_watch(&self, user_id: &str, content_id: &str) -> ApiResult<()> {
        if Uuid::parse_str(content_id).is_err() {
            return Err(ApiError::Validation("invalid content id".to_string()));
        }

        sqlx::query(
            "INSERT INTO watch_history (user_id, content_id, watched_at) VALUES (?1, ?2, ?3)
             ON CONFLICT (user_id, content_id) DO UPDATE SET watched_at = excluded.watched_at",
        )
        .bind(user_id)
        .bind(content_id)
        .bind(Utc::now())
        .execute(&self.db)
        .await?;

        Ok(())
    }
}

fn hash_password(password: &str) -> ApiResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| ApiError::Internal(format!("Password hashing failed: {}", e)))
}

fn verify_password(password: &str, hash: &str) -> ApiResult<bool> {
    let parsed = PasswordHash::new(hash)
        .map_err(|e| ApiError::Internal(format!("Stored password hash is invalid: {}", e)))?;

    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}
