/// Database row models
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Account record in the database
///
/// `refresh_token` holds the single currently-valid refresh token for the
/// account (or NULL when logged out); it is written only by the token
/// service. Never serialized; responses go through `PublicProfile`.
#[derive(Debug, Clone, FromRow)]
pub struct Account {
    pub id: String,
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub password_hash: String,
    pub avatar_url: Option<String>,
    pub cover_url: Option<String>,
    pub refresh_token: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One directed subscriber -> channel edge
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionEdge {
    pub subscriber_id: String,
    pub channel_id: String,
    pub created_at: DateTime<Utc>,
}

/// Content item record (videos and other media published by a channel)
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentItem {
    pub id: String,
    pub owner_id: String,
    pub title: String,
    pub description: String,
    pub media_url: String,
    pub thumbnail_url: Option<String>,
    pub duration_secs: f64,
    pub views: i64,
    pub created_at: DateTime<Utc>,
}
