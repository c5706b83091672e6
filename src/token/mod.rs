/// Token service: the dual-token session lifecycle
///
/// Access tokens are stateless and verified by signature and expiry alone;
/// the refresh token is the only revocable credential. Its current value is
/// mirrored in `account.refresh_token` and replaced on every issuance, so at
/// most one refresh token is valid per account at any instant. Rotation is a
/// compare-and-swap against that stored value, which is what turns a reused
/// (stolen or stale) refresh token into a hard failure.
use crate::error::{ApiError, ApiResult};
use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String,
    jti: String,
    iat: i64,
    exp: i64,
}

/// Freshly issued access/refresh token pair
#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// Signing configuration for both token kinds
#[derive(Debug, Clone)]
pub struct TokenConfig {
    pub access_secret: String,
    pub refresh_secret: String,
    pub access_ttl_secs: i64,
    pub refresh_ttl_days: i64,
}

/// Token service
pub struct TokenService {
    db: SqlitePool,
    config: TokenConfig,
}

impl TokenService {
    /// Create a new token service
    pub fn new(db: SqlitePool, config: TokenConfig) -> Self {
        Self { db, config }
    }

    /// Issue a fresh token pair, replacing any stored refresh token
    ///
    /// Callers must not hand out cookies or headers when this fails.
    pub async fn issue(&self, account_id: &str) -> ApiResult<TokenPair> {
        let pair = self.generate_pair(account_id)?;

        let updated =
            sqlx::query("UPDATE account SET refresh_token = ?1, updated_at = ?2 WHERE id = ?3")
                .bind(&pair.refresh_token)
                .bind(Utc::now())
                .bind(account_id)
                .execute(&self.db)
                .await?
                .rows_affected();

        if updated == 0 {
            return Err(ApiError::Internal(format!(
                "failed to persist refresh token for account {}",
                account_id
            )));
        }

        Ok(pair)
    }

    /// Rotate a presented refresh token for a fresh pair, invalidating it
    ///
    /// Exactly one of any number of concurrent rotations presenting the same
    /// token succeeds; the rest fail as reuse.
    pub async fn rotate(&self, presented: &str) -> ApiResult<TokenPair> {
        let claims = self.decode(presented, &self.config.refresh_secret)?;

        let known: Option<String> = sqlx::query_scalar("SELECT id FROM account WHERE id = ?1")
            .bind(&claims.sub)
            .fetch_optional(&self.db)
            .await?;

        if known.is_none() {
            return Err(ApiError::Authentication(
                "invalid refresh token".to_string(),
            ));
        }

        let pair = self.generate_pair(&claims.sub)?;

        // Compare-and-swap: only the holder of the current stored value may
        // rotate. A token that was already rotated away or revoked no longer
        // matches, whatever its signature says.
        let swapped = sqlx::query(
            "UPDATE account SET refresh_token = ?1, updated_at = ?2
             WHERE id = ?3 AND refresh_token = ?4",
        )
        .bind(&pair.refresh_token)
        .bind(Utc::now())
        .bind(&claims.sub)
        .bind(presented)
        .execute(&self.db)
        .await?
        .rows_affected();

        if swapped == 0 {
            tracing::warn!(account = %claims.sub, "refresh token reuse detected");
            return Err(ApiError::Authentication(
                "refresh token is expired or used".to_string(),
            ));
        }

        Ok(pair)
    }

    /// Clear the stored refresh token (logout). Idempotent.
    pub async fn revoke(&self, account_id: &str) -> ApiResult<()> {
        sqlx::query("UPDATE account SET refresh_token = NULL, updated_at = ?1 WHERE id = ?2")
            .bind(Utc::now())
            .bind(account_id)
            .execute(&self.db)
            .await?;

        Ok(())
    }

    /// Verify an access token and return the subject account id
    ///
    /// Pure signature+expiry check; never touches storage.
    pub fn verify_access(&self, token: &str) -> ApiResult<String> {
        self.decode(token, &self.config.access_secret)
            .map(|claims| claims.sub)
    }

    fn generate_pair(&self, account_id: &str) -> ApiResult<TokenPair> {
        let now = Utc::now().timestamp();

        let access_token = self.sign(
            account_id,
            now,
            now + self.config.access_ttl_secs,
            &self.config.access_secret,
        )?;
        let refresh_token = self.sign(
            account_id,
            now,
            now + self.config.refresh_ttl_days * 24 * 3600,
            &self.config.refresh_secret,
        )?;

        Ok(TokenPair {
            access_token,
            refresh_token,
        })
    }

    fn sign(&self, sub: &str, iat: i64, exp: i64, secret: &str) -> ApiResult<String> {
        let claims = Claims {
            sub: sub.to_string(),
            jti: Uuid::new_v4().to_string(),
            iat,
            exp,
        };

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .map_err(|e| ApiError::Internal(format!("failed to sign token: {}", e)))
    }

    fn decode(&self, token: &str, secret: &str) -> ApiResult<Claims> {
        let mut validation = Validation::new(Algorithm::HS256);
        // Strict expiry, no clock skew allowance
        validation.leeway = 0;

        decode::<Claims>(token, &DecodingKey::from_secret(secret.as_bytes()), &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
                    ApiError::Authentication("token has expired".to_string())
                }
                jsonwebtoken::errors::ErrorKind::InvalidSignature => {
                    ApiError::Authentication("invalid token signature".to_string())
                }
                _ => ApiError::Authentication(format!("invalid token: {}", e)),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_util::memory_pool;
    use chrono::Utc;
    use std::sync::Arc;

    fn test_config() -> TokenConfig {
        TokenConfig {
            access_secret: "access-secret".to_string(),
            refresh_secret: "refresh-secret".to_string(),
            access_ttl_secs: 900,
            refresh_ttl_days: 10,
        }
    }

    async fn setup(config: TokenConfig) -> (TokenService, String) {
        let pool = memory_pool().await;
        let id = Uuid::new_v4().to_string();
        let now = Utc::now();

        sqlx::query(
            "INSERT INTO account (id, username, email, full_name, password_hash, created_at, updated_at)
             VALUES (?1, 'alice', 'alice@example.com', 'Alice Doe', 'x', ?2, ?3)",
        )
        .bind(&id)
        .bind(now)
        .bind(now)
        .execute(&pool)
        .await
        .unwrap();

        (TokenService::new(pool, config), id)
    }

    async fn stored_refresh_token(service: &TokenService, id: &str) -> Option<String> {
        sqlx::query_scalar("SELECT refresh_token FROM account WHERE id = ?1")
            .bind(id)
            .fetch_one(&service.db)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn issue_persists_refresh_token() {
        let (service, id) = setup(test_config()).await;

        let pair = service.issue(&id).await.unwrap();

        assert_eq!(service.verify_access(&pair.access_token).unwrap(), id);
        assert_eq!(
            stored_refresh_token(&service, &id).await.as_deref(),
            Some(pair.refresh_token.as_str())
        );
    }

    #[tokio::test]
    async fn issue_replaces_prior_refresh_token() {
        let (service, id) = setup(test_config()).await;

        let first = service.issue(&id).await.unwrap();
        let second = service.issue(&id).await.unwrap();

        assert_ne!(first.refresh_token, second.refresh_token);
        // A second login invalidates the first session's refresh token
        assert!(service.rotate(&first.refresh_token).await.is_err());
        assert!(service.rotate(&second.refresh_token).await.is_ok());
    }

    #[tokio::test]
    async fn issue_fails_for_unknown_account() {
        let (service, _) = setup(test_config()).await;

        let result = service.issue("no-such-account").await;
        assert!(matches!(result, Err(ApiError::Internal(_))));
    }

    #[tokio::test]
    async fn rotation_invalidates_presented_token() {
        let (service, id) = setup(test_config()).await;

        let pair = service.issue(&id).await.unwrap();
        let rotated = service.rotate(&pair.refresh_token).await.unwrap();

        assert_ne!(rotated.refresh_token, pair.refresh_token);

        // Reuse of the old token must keep failing
        let reuse = service.rotate(&pair.refresh_token).await;
        match reuse {
            Err(ApiError::Authentication(msg)) => assert!(msg.contains("expired or used")),
            other => panic!("expected Authentication error, got {:?}", other),
        }

        // The rotated token is still good
        assert!(service.rotate(&rotated.refresh_token).await.is_ok());
    }

    #[tokio::test]
    async fn concurrent_rotations_admit_exactly_one() {
        let (service, id) = setup(test_config()).await;
        let service = Arc::new(service);

        let pair = service.issue(&id).await.unwrap();

        let mut handles = Vec::new();
        for _ in 0..2 {
            let service = Arc::clone(&service);
            let token = pair.refresh_token.clone();
            handles.push(tokio::spawn(async move { service.rotate(&token).await }));
        }

        let mut ok = 0;
        let mut unauthorized = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => ok += 1,
                Err(ApiError::Authentication(_)) => unauthorized += 1,
                Err(other) => panic!("unexpected error: {:?}", other),
            }
        }

        assert_eq!(ok, 1);
        assert_eq!(unauthorized, 1);
    }

    #[tokio::test]
    async fn revoke_clears_stored_token() {
        let (service, id) = setup(test_config()).await;

        let pair = service.issue(&id).await.unwrap();
        service.revoke(&id).await.unwrap();
        // Idempotent
        service.revoke(&id).await.unwrap();

        assert_eq!(stored_refresh_token(&service, &id).await, None);

        let rotate = service.rotate(&pair.refresh_token).await;
        assert!(matches!(rotate, Err(ApiError::Authentication(_))));
    }

    #[tokio::test]
    async fn expired_access_token_rejected() {
        let mut config = test_config();
        // Already past expiry at issue time
        config.access_ttl_secs = -1;
        let (service, id) = setup(config).await;

        let pair = service.issue(&id).await.unwrap();

        let result = service.verify_access(&pair.access_token);
        match result {
            Err(ApiError::Authentication(msg)) => assert!(msg.contains("expired")),
            other => panic!("expected Authentication error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn cross_kind_tokens_rejected() {
        let (service, id) = setup(test_config()).await;

        let pair = service.issue(&id).await.unwrap();

        // A refresh token is not an access token, and vice versa
        assert!(service.verify_access(&pair.refresh_token).is_err());
        assert!(service.rotate(&pair.access_token).await.is_err());
        assert!(service.verify_access("not-a-token").is_err());
    }
}
