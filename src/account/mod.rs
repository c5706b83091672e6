/// Account management
mod manager;

pub use manager::AccountManager;

use crate::db::models::Account;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Public view of an account: everything except the password hash and the
/// refresh token
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicProfile {
    pub id: String,
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub avatar_url: Option<String>,
    pub cover_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<Account> for PublicProfile {
    fn from(account: Account) -> Self {
        Self {
            id: account.id,
            username: account.username,
            email: account.email,
            full_name: account.full_name,
            avatar_url: account.avatar_url,
            cover_url: account.cover_url,
            created_at: account.created_at,
        }
    }
}
