/// Account and session endpoints
use crate::{
    account::PublicProfile,
    auth::{AuthContext, OptionalAuthContext, ACCESS_COOKIE, REFRESH_COOKIE},
    context::AppContext,
    error::{ApiError, ApiResult},
    response::ApiResponse,
    subscription::queries::{ChannelProfile, WatchHistoryEntry},
    token::TokenPair,
};
use axum::{
    extract::{Path, State},
    routing::{get, patch, post},
    Json, Router,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Build user routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/refresh-token", post(refresh_token))
        .route("/change-password", post(change_password))
        .route("/current-user", get(current_user))
        .route("/update-account", patch(update_account))
        .route("/avatar", patch(update_avatar))
        .route("/cover-image", patch(update_cover))
        .route("/c/:username", get(channel_profile))
        .route("/watch-history", get(watch_history).post(record_watch))
}

fn session_cookie(name: &'static str, value: String) -> Cookie<'static> {
    Cookie::build((name, value))
        .path("/")
        .http_only(true)
        .secure(true)
        .same_site(SameSite::Strict)
        .build()
}

fn set_session_cookies(jar: CookieJar, pair: &TokenPair) -> CookieJar {
    jar.add(session_cookie(ACCESS_COOKIE, pair.access_token.clone()))
        .add(session_cookie(REFRESH_COOKIE, pair.refresh_token.clone()))
}

fn clear_session_cookies(jar: CookieJar) -> CookieJar {
    jar.remove(Cookie::build(ACCESS_COOKIE).path("/").build())
        .remove(Cookie::build(REFRESH_COOKIE).path("/").build())
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
struct RegisterRequest {
    #[validate(length(min = 3, max = 32))]
    username: String,
    #[validate(email)]
    email: String,
    #[validate(length(min = 1))]
    full_name: String,
    #[validate(length(min = 8))]
    password: String,
    /// Staged upload paths, already written by the upload middleware
    avatar_path: Option<String>,
    cover_path: Option<String>,
}

/// Register endpoint
async fn register(
    State(ctx): State<AppContext>,
    Json(req): Json<RegisterRequest>,
) -> ApiResult<ApiResponse<PublicProfile>> {
    req.validate()
        .map_err(|e| ApiError::Validation(e.to_string()))?;

    let account = ctx
        .accounts
        .register(&req.username, &req.email, &req.full_name, &req.password)
        .await?;

    // Media is uploaded only once the account row exists, so a failed
    // registration never orphans files in the media store
    if let Some(path) = &req.avatar_path {
        let object = ctx.media.upload(std::path::Path::new(path)).await?;
        ctx.accounts.set_avatar(&account.id, &object.url).await?;
    }
    if let Some(path) = &req.cover_path {
        let object = ctx.media.upload(std::path::Path::new(path)).await?;
        ctx.accounts.set_cover(&account.id, &object.url).await?;
    }

    let profile = ctx.accounts.public_profile(&account.id).await?;

    Ok(ApiResponse::ok(profile, "user registered successfully"))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LoginRequest {
    username: Option<String>,
    email: Option<String>,
    password: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SessionData {
    user: PublicProfile,
    access_token: String,
    refresh_token: String,
}

/// Login endpoint: issues the token pair as cookies and in the body
async fn login(
    State(ctx): State<AppContext>,
    jar: CookieJar,
    Json(req): Json<LoginRequest>,
) -> ApiResult<(CookieJar, ApiResponse<SessionData>)> {
    let identifier = req
        .username
        .as_deref()
        .or(req.email.as_deref())
        .ok_or_else(|| ApiError::Validation("username or email is required".to_string()))?;

    let account = ctx.accounts.login(identifier, &req.password).await?;
    let pair = ctx.tokens.issue(&account.id).await?;

    let jar = set_session_cookies(jar, &pair);
    let data = SessionData {
        user: account.into(),
        access_token: pair.access_token,
        refresh_token: pair.refresh_token,
    };

    Ok((jar, ApiResponse::ok(data, "user logged in successfully")))
}

/// Logout endpoint: revokes the refresh token and expires both cookies
async fn logout(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    jar: CookieJar,
) -> ApiResult<(CookieJar, ApiResponse<serde_json::Value>)> {
    ctx.tokens.revoke(&auth.account.id).await?;

    Ok((
        clear_session_cookies(jar),
        ApiResponse::ok(serde_json::json!({}), "user logged out"),
    ))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RefreshRequest {
    refresh_token: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RefreshData {
    access_token: String,
    refresh_token: String,
}

/// Refresh endpoint: rotates the presented refresh token
async fn refresh_token(
    State(ctx): State<AppContext>,
    jar: CookieJar,
    body: Option<Json<RefreshRequest>>,
) -> ApiResult<(CookieJar, ApiResponse<RefreshData>)> {
    let presented = jar
        .get(REFRESH_COOKIE)
        .map(|c| c.value().to_string())
        .or_else(|| body.and_then(|Json(req)| req.refresh_token))
        .ok_or_else(|| ApiError::Authentication("unauthorized request".to_string()))?;

    let pair = ctx.tokens.rotate(&presented).await?;

    let jar = set_session_cookies(jar, &pair);
    let data = RefreshData {
        access_token: pair.access_token,
        refresh_token: pair.refresh_token,
    };

    Ok((jar, ApiResponse::ok(data, "access token refreshed")))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChangePasswordRequest {
    old_password: String,
    new_password: String,
}

/// Change password endpoint
async fn change_password(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    Json(req): Json<ChangePasswordRequest>,
) -> ApiResult<ApiResponse<serde_json::Value>> {
    ctx.accounts
        .change_password(&auth.account.id, &req.old_password, &req.new_password)
        .await?;

    Ok(ApiResponse::ok(
        serde_json::json!({}),
        "password changed successfully",
    ))
}

/// Current user endpoint
async fn current_user(auth: AuthContext) -> ApiResponse<PublicProfile> {
    ApiResponse::ok(auth.account, "current user fetched successfully")
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
struct UpdateAccountRequest {
    #[validate(length(min = 1))]
    full_name: String,
    #[validate(email)]
    email: String,
}

/// Update account details endpoint
async fn update_account(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    Json(req): Json<UpdateAccountRequest>,
) -> ApiResult<ApiResponse<PublicProfile>> {
    req.validate()
        .map_err(|e| ApiError::Validation(e.to_string()))?;

    let account = ctx
        .accounts
        .update_profile(&auth.account.id, &req.full_name, &req.email)
        .await?;

    Ok(ApiResponse::ok(
        account.into(),
        "account details updated successfully",
    ))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MediaUpdateRequest {
    /// Staged upload path, already written by the upload middleware
    file_path: String,
}

/// Update avatar endpoint
async fn update_avatar(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    Json(req): Json<MediaUpdateRequest>,
) -> ApiResult<ApiResponse<PublicProfile>> {
    if req.file_path.trim().is_empty() {
        return Err(ApiError::Validation("avatar file is missing".to_string()));
    }

    let object = ctx.media.upload(std::path::Path::new(&req.file_path)).await?;
    ctx.accounts.set_avatar(&auth.account.id, &object.url).await?;

    let profile = ctx.accounts.public_profile(&auth.account.id).await?;

    Ok(ApiResponse::ok(profile, "avatar updated successfully"))
}

/// Update cover image endpoint
async fn update_cover(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    Json(req): Json<MediaUpdateRequest>,
) -> ApiResult<ApiResponse<PublicProfile>> {
    if req.file_path.trim().is_empty() {
        return Err(ApiError::Validation(
            "cover image file is missing".to_string(),
        ));
    }

    let object = ctx.media.upload(std::path::Path::new(&req.file_path)).await?;
    ctx.accounts.set_cover(&auth.account.id, &object.url).await?;

    let profile = ctx.accounts.public_profile(&auth.account.id).await?;

    Ok(ApiResponse::ok(profile, "cover image updated successfully"))
}

/// Channel profile endpoint; the viewer flag works unauthenticated
async fn channel_profile(
    State(ctx): State<AppContext>,
    viewer: OptionalAuthContext,
    Path(username): Path<String>,
) -> ApiResult<ApiResponse<ChannelProfile>> {
    let viewer_id = viewer.auth.as_ref().map(|a| a.account.id.as_str());
    let profile = ctx.graph.channel_profile(&username, viewer_id).await?;

    Ok(ApiResponse::ok(profile, "user channel fetched successfully"))
}

/// Watch history endpoint
async fn watch_history(
    State(ctx): State<AppContext>,
    auth: AuthContext,
) -> ApiResult<ApiResponse<Vec<WatchHistoryEntry>>> {
    let history = ctx.graph.watch_history(&auth.account.id).await?;

    Ok(ApiResponse::ok(
        history,
        "watch history fetched successfully",
    ))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RecordWatchRequest {
    content_id: String,
}

/// Record a watched item
async fn record_watch(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    Json(req): Json<RecordWatchRequest>,
) -> ApiResult<ApiResponse<serde_json::Value>> {
    ctx.accounts
        .record_watch(&auth.account.id, &req.content_id)
        .await?;

    Ok(ApiResponse::ok(serde_json::json!({}), "watch recorded"))
}
