/// Subscription endpoints
use crate::{
    auth::AuthContext,
    context::AppContext,
    error::ApiResult,
    response::ApiResponse,
    subscription::queries::{ChannelSubscriber, SubscribedChannel},
};
use axum::{
    extract::{Path, State},
    routing::{get, post},
    Router,
};
use serde::Serialize;

/// Build subscription routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .route(
            "/c/:channel_id",
            post(toggle_subscription).get(channel_subscribers),
        )
        .route("/u/:subscriber_id", get(subscribed_channels))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ToggleData {
    subscribed: bool,
}

/// Toggle subscription endpoint: one atomic flip per call
async fn toggle_subscription(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    Path(channel_id): Path<String>,
) -> ApiResult<ApiResponse<ToggleData>> {
    let subscribed = ctx
        .subscriptions
        .toggle(&auth.account.id, &channel_id)
        .await?;

    let message = if subscribed {
        "subscribed successfully"
    } else {
        "unsubscribed successfully"
    };

    Ok(ApiResponse::ok(ToggleData { subscribed }, message))
}

/// Subscribers-of-channel endpoint
async fn channel_subscribers(
    State(ctx): State<AppContext>,
    _auth: AuthContext,
    Path(channel_id): Path<String>,
) -> ApiResult<ApiResponse<Vec<ChannelSubscriber>>> {
    let subscribers = ctx.graph.channel_subscribers(&channel_id).await?;

    Ok(ApiResponse::ok(
        subscribers,
        "subscribers fetched successfully",
    ))
}

/// Subscriptions-of-user endpoint
async fn subscribed_channels(
    State(ctx): State<AppContext>,
    _auth: AuthContext,
    Path(subscriber_id): Path<String>,
) -> ApiResult<ApiResponse<Vec<SubscribedChannel>>> {
    let channels = ctx.graph.subscribed_channels(&subscriber_id).await?;

    Ok(ApiResponse::ok(
        channels,
        "subscribed channels fetched successfully",
    ))
}
