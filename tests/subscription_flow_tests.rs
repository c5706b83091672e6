//! End-to-end flows across the account, token, and subscription services
//! sharing one database.

use std::sync::Arc;

use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use streamhub::{
    account::AccountManager,
    content::{ContentStore, SqliteContentStore},
    db,
    error::ApiError,
    subscription::{queries::GraphQueryEngine, SubscriptionStore},
    token::{TokenConfig, TokenService},
};

struct TestApp {
    accounts: AccountManager,
    tokens: TokenService,
    subscriptions: SubscriptionStore,
    graph: GraphQueryEngine,
}

async fn test_app() -> TestApp {
    // One connection: each :memory: connection is its own database
    let pool: SqlitePool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect(":memory:")
        .await
        .unwrap();

    db::run_migrations(&pool).await.unwrap();

    let content: Arc<dyn ContentStore> = Arc::new(SqliteContentStore::new(pool.clone()));

    TestApp {
        accounts: AccountManager::new(pool.clone()),
        tokens: TokenService::new(
            pool.clone(),
            TokenConfig {
                access_secret: "access-secret".to_string(),
                refresh_secret: "refresh-secret".to_string(),
                access_ttl_secs: 900,
                refresh_ttl_days: 10,
            },
        ),
        subscriptions: SubscriptionStore::new(pool.clone()),
        graph: GraphQueryEngine::new(pool, content),
    }
}

#[tokio::test]
async fn subscribe_toggle_round_trip() {
    let app = test_app().await;

    let u1 = app
        .accounts
        .register("viewer", "viewer@example.com", "Viewer One", "password123")
        .await
        .unwrap();
    let u2 = app
        .accounts
        .register("creator", "creator@example.com", "Creator Two", "password123")
        .await
        .unwrap();

    // U1 subscribes to U2
    assert!(app.subscriptions.toggle(&u1.id, &u2.id).await.unwrap());

    let profile = app
        .graph
        .channel_profile("creator", Some(&u1.id))
        .await
        .unwrap();
    assert_eq!(profile.subscriber_count, 1);
    assert_eq!(profile.subscribed_to_count, 0);
    assert!(profile.is_subscribed);

    // Toggling again unsubscribes
    assert!(!app.subscriptions.toggle(&u1.id, &u2.id).await.unwrap());

    let profile = app
        .graph
        .channel_profile("creator", Some(&u1.id))
        .await
        .unwrap();
    assert_eq!(profile.subscriber_count, 0);
    assert!(!profile.is_subscribed);
}

#[tokio::test]
async fn session_lifecycle_with_rotation() {
    let app = test_app().await;

    let account = app
        .accounts
        .register("alice", "alice@example.com", "Alice Doe", "password123")
        .await
        .unwrap();

    // Login issues a pair whose access token resolves back to the account
    let logged_in = app.accounts.login("alice", "password123").await.unwrap();
    let pair = app.tokens.issue(&logged_in.id).await.unwrap();
    assert_eq!(app.tokens.verify_access(&pair.access_token).unwrap(), account.id);

    // Rotation returns a new refresh token and burns the old one
    let rotated = app.tokens.rotate(&pair.refresh_token).await.unwrap();
    assert_ne!(rotated.refresh_token, pair.refresh_token);

    let reuse = app.tokens.rotate(&pair.refresh_token).await;
    assert!(matches!(reuse, Err(ApiError::Authentication(_))));

    // Logout revokes; even the fresh token is now useless
    app.tokens.revoke(&account.id).await.unwrap();
    let after_logout = app.tokens.rotate(&rotated.refresh_token).await;
    assert!(matches!(after_logout, Err(ApiError::Authentication(_))));

    // Stateless access verification is unaffected by revocation
    assert!(app.tokens.verify_access(&rotated.access_token).is_ok());
}

#[tokio::test]
async fn reciprocity_visible_across_services() {
    let app = test_app().await;

    let a = app
        .accounts
        .register("alpha", "alpha@example.com", "Alpha", "password123")
        .await
        .unwrap();
    let b = app
        .accounts
        .register("beta", "beta@example.com", "Beta", "password123")
        .await
        .unwrap();

    app.subscriptions.toggle(&a.id, &b.id).await.unwrap();
    app.subscriptions.toggle(&b.id, &a.id).await.unwrap();

    let subscribers_of_b = app.graph.channel_subscribers(&b.id).await.unwrap();
    assert_eq!(subscribers_of_b.len(), 1);
    assert!(subscribers_of_b[0].subscribed_to_subscriber);

    // Removing A -> B flips A's entry out of B's subscriber list, and B's
    // own subscription survives untouched
    app.subscriptions.toggle(&a.id, &b.id).await.unwrap();
    assert!(app.graph.channel_subscribers(&b.id).await.unwrap().is_empty());

    let channels_of_b = app.graph.subscribed_channels(&b.id).await.unwrap();
    assert_eq!(channels_of_b.len(), 1);
    assert_eq!(channels_of_b[0].id, a.id);
}
