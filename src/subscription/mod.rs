/// Relationship graph store: subscriber -> channel edges
pub mod queries;

use crate::error::{ApiError, ApiResult};
use chrono::Utc;
use sqlx::SqlitePool;
use uuid::Uuid;

/// Subscription edge store
pub struct SubscriptionStore {
    db: SqlitePool,
}

impl SubscriptionStore {
    /// Create a new subscription store
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Flip the (subscriber, channel) edge; returns the resulting state
    ///
    /// The delete/insert pair runs in one write transaction, so concurrent
    /// toggles of the same pair serialize and the unique index on
    /// (subscriber_id, channel_id) can never see a duplicate edge.
    pub async fn toggle(&self, subscriber_id: &str, channel_id: &str) -> ApiResult<bool> {
        if Uuid::parse_str(channel_id).is_err() {
            return Err(ApiError::Validation("invalid channel id".to_string()));
        }

        if subscriber_id == channel_id {
            return Err(ApiError::Validation(
                "cannot subscribe to own channel".to_string(),
            ));
        }

        let mut tx = self.db.begin().await?;

        let deleted =
            sqlx::query("DELETE FROM subscription WHERE subscriber_id = ?1 AND channel_id = ?2")
                .bind(subscriber_id)
                .bind(channel_id)
                .execute(&mut *tx)
                .await?
                .rows_affected();

        let subscribed = if deleted == 0 {
            sqlx::query(
                "INSERT INTO subscription (subscriber_id, channel_id, created_at)
                 VALUES (?1, ?2, ?3)",
            )
            .bind(subscriber_id)
            .bind(channel_id)
            .bind(Utc::now())
            .execute(&mut *tx)
            .await?;
            true
        } else {
            false
        };

        tx.commit().await?;

        tracing::debug!(%subscriber_id, %channel_id, subscribed, "subscription toggled");

        Ok(subscribed)
    }

    /// Membership probe for a single edge
    pub async fn exists(&self, subscriber_id: &str, channel_id: &str) -> ApiResult<bool> {
        let found: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM subscription WHERE subscriber_id = ?1 AND channel_id = ?2",
        )
        .bind(subscriber_id)
        .bind(channel_id)
        .fetch_one(&self.db)
        .await?;

        Ok(found > 0)
    }
}
