/// API routes and handlers
pub mod subscriptions;
pub mod users;

use crate::context::AppContext;
use axum::Router;

/// Build API routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .nest("/api/v1/users", users::routes())
        .nest("/api/v1/subscriptions", subscriptions::routes())
}
