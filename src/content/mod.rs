/// Content store collaborator
///
/// The graph read views join against published content (a channel's latest
/// item, watch-history resolution). The store is a trait so deployments can
/// back it with whatever owns the content catalog; the default
/// implementation reads the local `content` table.
use crate::db::models::ContentItem;
use crate::error::ApiResult;
use async_trait::async_trait;
use sqlx::SqlitePool;

const CONTENT_COLUMNS: &str = "id, owner_id, title, description, media_url, \
                               thumbnail_url, duration_secs, views, created_at";

#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Most recently created item owned by `owner_id`, if any
    async fn find_latest_by_owner(&self, owner_id: &str) -> ApiResult<Option<ContentItem>>;

    /// All items owned by `owner_id`, newest first
    async fn find_by_owner(&self, owner_id: &str) -> ApiResult<Vec<ContentItem>>;

    /// Resolve items by id, preserving the input order; unknown ids are
    /// skipped
    async fn find_many(&self, ids: &[String]) -> ApiResult<Vec<ContentItem>>;
}

/// SQLite-backed content store
pub struct SqliteContentStore {
    db: SqlitePool,
}

impl SqliteContentStore {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ContentStore for SqliteContentStore {
    async fn find_latest_by_owner(&self, owner_id: &str) -> ApiResult<Option<ContentItem>> {
        let item = sqlx::query_as::<_, ContentItem>(&format!(
            "SELECT {CONTENT_COLUMNS} FROM content
             WHERE owner_id = ?1 ORDER BY created_at DESC LIMIT 1"
        ))
        .bind(owner_id)
        .fetch_optional(&self.db)
        .await?;

        Ok(item)
    }

    async fn find_by_owner(&self, owner_id: &str) -> ApiResult<Vec<ContentItem>> {
        let items = sqlx::query_as::<_, ContentItem>(&format!(
            "SELECT {CONTENT_COLUMNS} FROM content
             WHERE owner_id = ?1 ORDER BY created_at DESC"
        ))
        .bind(owner_id)
        .fetch_all(&self.db)
        .await?;

        Ok(items)
    }

    async fn find_many(&self, ids: &[String]) -> ApiResult<Vec<ContentItem>> {
        let mut items = Vec::with_capacity(ids.len());

        for id in ids {
            let item = sqlx::query_as::<_, ContentItem>(&format!(
                "SELECT {CONTENT_COLUMNS} FROM content WHERE id = ?1"
            ))
            .bind(id)
            .fetch_optional(&self.db)
            .await?;

            if let Some(item) = item {
                items.push(item);
            }
        }

        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_util::memory_pool;
    use chrono::{Duration, Utc};
    use uuid::Uuid;

    async fn insert_item(db: &SqlitePool, owner: &str, title: &str, age_secs: i64) -> String {
        let id = Uuid::new_v4().to_string();
        sqlx::query(
            "INSERT INTO content (id, owner_id, title, description, media_url, created_at)
             VALUES (?1, ?2, ?3, '', '/media/item.mp4', ?4)",
        )
        .bind(&id)
        .bind(owner)
        .bind(title)
        .bind(Utc::now() - Duration::seconds(age_secs))
        .execute(db)
        .await
        .unwrap();
        id
    }

    #[tokio::test]
    async fn latest_by_owner_picks_newest() {
        let pool = memory_pool().await;
        let store = SqliteContentStore::new(pool.clone());
        let owner = Uuid::new_v4().to_string();

        assert!(store.find_latest_by_owner(&owner).await.unwrap().is_none());

        insert_item(&pool, &owner, "older", 120).await;
        insert_item(&pool, &owner, "newest", 10).await;
        insert_item(&pool, &owner, "middle", 60).await;

        let latest = store.find_latest_by_owner(&owner).await.unwrap().unwrap();
        assert_eq!(latest.title, "newest");

        let all = store.find_by_owner(&owner).await.unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(all[0].title, "newest");
        assert_eq!(all[2].title, "older");
    }

    #[tokio::test]
    async fn find_many_preserves_order_and_skips_missing() {
        let pool = memory_pool().await;
        let store = SqliteContentStore::new(pool.clone());
        let owner = Uuid::new_v4().to_string();

        let a = insert_item(&pool, &owner, "a", 30).await;
        let b = insert_item(&pool, &owner, "b", 20).await;

        let ids = vec![b.clone(), "missing".to_string(), a.clone()];
        let items = store.find_many(&ids).await.unwrap();

        assert_eq!(items.len(), 2);
        assert_eq!(items[0].id, b);
        assert_eq!(items[1].id, a);
    }
}
