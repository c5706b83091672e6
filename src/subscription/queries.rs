/// Derived read views over the relationship graph
///
/// Every view is a pure aggregation over a storage snapshot: counts and
/// membership flags are computed from the live edge set on every call, never
/// cached, so they stay exact under concurrent toggles.
use crate::{
    content::ContentStore,
    db::models::ContentItem,
    error::{ApiError, ApiResult},
};
use futures::future::try_join_all;
use serde::Serialize;
use sqlx::{Row, SqlitePool};
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

/// One subscriber of a channel, with the reciprocity flag and that
/// subscriber's own audience size
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelSubscriber {
    pub id: String,
    pub username: String,
    pub full_name: String,
    pub avatar_url: Option<String>,
    /// Whether the channel being listed subscribes back to this subscriber
    pub subscribed_to_subscriber: bool,
    pub subscribers_count: i64,
}

/// One channel a user subscribes to, with its latest content item
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscribedChannel {
    pub id: String,
    pub username: String,
    pub full_name: String,
    pub avatar_url: Option<String>,
    pub latest_item: Option<ContentItem>,
}

/// Aggregate channel view resolved by username
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelProfile {
    pub id: String,
    pub username: String,
    pub full_name: String,
    pub email: String,
    pub avatar_url: Option<String>,
    pub cover_url: Option<String>,
    pub subscriber_count: i64,
    pub subscribed_to_count: i64,
    pub is_subscribed: bool,
}

/// A watched content item with its owning channel resolved
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WatchHistoryEntry {
    pub item: ContentItem,
    pub owner: Option<PublicOwner>,
}

/// Minimal owner projection used inside watch history entries
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicOwner {
    pub id: String,
    pub username: String,
    pub full_name: String,
    pub avatar_url: Option<String>,
}

/// Read-only query engine over accounts, edges, and content
pub struct GraphQueryEngine {
    db: SqlitePool,
    content: Arc<dyn ContentStore>,
}

impl GraphQueryEngine {
    /// Create a new query engine
    pub fn new(db: SqlitePool, content: Arc<dyn ContentStore>) -> Self {
        Self { db, content }
    }

    /// All subscribers of a channel, newest first
    ///
    /// For each subscriber, `subscribed_to_subscriber` answers "does the
    /// root channel subscribe back", and `subscribers_count` is the size of
    /// that subscriber's own audience. One statement, one snapshot.
    pub async fn channel_subscribers(&self, channel_id: &str) -> ApiResult<Vec<ChannelSubscriber>> {
        if Uuid::parse_str(channel_id).is_err() {
            return Err(ApiError::Validation("invalid channel id".to_string()));
        }

        let rows = sqlx::query(
            r#"
            SELECT a.id, a.username, a.full_name, a.avatar_url,
                   EXISTS(
                       SELECT 1 FROM subscription r
                       WHERE r.subscriber_id = ?1 AND r.channel_id = a.id
                   ) AS subscribed_to_subscriber,
                   (SELECT COUNT(*) FROM subscription c WHERE c.channel_id = a.id)
                       AS subscribers_count
            FROM subscription s
            JOIN account a ON a.id = s.subscriber_id
            WHERE s.channel_id = ?1
            ORDER BY s.created_at DESC
            "#,
        )
        .bind(channel_id)
        .fetch_all(&self.db)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| ChannelSubscriber {
                id: row.get("id"),
                username: row.get("username"),
                full_name: row.get("full_name"),
                avatar_url: row.get("avatar_url"),
                subscribed_to_subscriber: row.get("subscribed_to_subscriber"),
                subscribers_count: row.get("subscribers_count"),
            })
            .collect())
    }

    /// All channels a user subscribes to, newest first, each with its most
    /// recent content item
    pub async fn subscribed_channels(&self, subscriber_id: &str) -> ApiResult<Vec<SubscribedChannel>> {
        let rows = sqlx::query(
            r#"
            SELECT a.id, a.username, a.full_name, a.avatar_url
            FROM subscription s
            JOIN account a ON a.id = s.channel_id
            WHERE s.subscriber_id = ?1
            ORDER BY s.created_at DESC
            "#,
        )
        .bind(subscriber_id)
        .fetch_all(&self.db)
        .await?;

        let channels: Vec<(String, String, String, Option<String>)> = rows
            .into_iter()
            .map(|row| {
                (
                    row.get("id"),
                    row.get("username"),
                    row.get("full_name"),
                    row.get("avatar_url"),
                )
            })
            .collect();

        let latest = try_join_all(
            channels
                .iter()
                .map(|(id, _, _, _)| self.content.find_latest_by_owner(id)),
        )
        .await?;

        Ok(channels
            .into_iter()
            .zip(latest)
            .map(
                |((id, username, full_name, avatar_url), latest_item)| SubscribedChannel {
                    id,
                    username,
                    full_name,
                    avatar_url,
                    latest_item,
                },
            )
            .collect())
    }

    /// Aggregate profile for a channel, resolved by username
    ///
    /// `is_subscribed` is the viewer's own membership in the channel's
    /// subscriber set; false when unauthenticated.
    pub async fn channel_profile(
        &self,
        username: &str,
        viewer_id: Option<&str>,
    ) -> ApiResult<ChannelProfile> {
        let username = username.trim().to_lowercase();
        if username.is_empty() {
            return Err(ApiError::Validation("username is missing".to_string()));
        }

        let row = sqlx::query(
            r#"
            SELECT a.id, a.username, a.full_name, a.email, a.avatar_url, a.cover_url,
                   (SELECT COUNT(*) FROM subscription s WHERE s.channel_id = a.id)
                       AS subscriber_count,
                   (SELECT COUNT(*) FROM subscription s WHERE s.subscriber_id = a.id)
                       AS subscribed_to_count,
                   EXISTS(
                       SELECT 1 FROM subscription s
                       WHERE s.channel_id = a.id AND s.subscriber_id = ?2
                   ) AS is_subscribed
            FROM account a
            WHERE a.username = ?1
            "#,
        )
        .bind(&username)
        .bind(viewer_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| ApiError::NotFound("channel does not exist".to_string()))?;

        Ok(ChannelProfile {
            id: row.get("id"),
            username: row.get("username"),
            full_name: row.get("full_name"),
            email: row.get("email"),
            avatar_url: row.get("avatar_url"),
            cover_url: row.get("cover_url"),
            subscriber_count: row.get("subscriber_count"),
            subscribed_to_count: row.get("subscribed_to_count"),
            is_subscribed: row.get("is_subscribed"),
        })
    }

    /// A user's watch history, most recently watched first
    pub async fn watch_history(&self, user_id: &str) -> ApiResult<Vec<WatchHistoryEntry>> {
        let ids: Vec<String> = sqlx::query_scalar(
            "SELECT content_id FROM watch_history WHERE user_id = ?1 ORDER BY watched_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.db)
        .await?;

        let items = self.content.find_many(&ids).await?;

        // Resolve each distinct owner once
        let mut owners: HashMap<String, Option<PublicOwner>> = HashMap::new();
        for item in &items {
            if !owners.contains_key(&item.owner_id) {
                let owner = sqlx::query(
                    "SELECT id, username, full_name, avatar_url FROM account WHERE id = ?1",
                )
                .bind(&item.owner_id)
                .fetch_optional(&self.db)
                .await?
                .map(|row| PublicOwner {
                    id: row.get("id"),
                    username: row.get("username"),
                    full_name: row.get("full_name"),
                    avatar_url: row.get("avatar_url"),
                });
                owners.insert(item.owner_id.clone(), owner);
            }
        }

        Ok(items
            .into_iter()
            .map(|item| {
                let owner = owners.get(&item.owner_id).cloned().flatten();
                WatchHistoryEntry { item, owner }
            })
            .collect())
    }
}
