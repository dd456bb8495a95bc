use axum::{
    debug_handler,
    extract::{Path, State},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use sqlx::SqlitePool;
use time::{Duration, OffsetDateTime, Time};
use tower_sessions::Session;

use crate::messages::store;
use crate::session::DashboardGate;
use crate::{profiles, AppError, AppResult};

async fn require_authorized(session: Session, username: &str) -> AppResult<()> {
    if !DashboardGate::new(session).is_authorized(username).await? {
        return Err(AppError::Unauthorized);
    }
    Ok(())
}

#[debug_handler]
pub(crate) async fn dashboard(
    Path(username): Path<String>,
    State(db_pool): State<SqlitePool>,
    session: Session,
) -> AppResult<Response> {
    let username = profiles::normalize_username(&username);
    require_authorized(session, &username).await?;
    let profile = profiles::lookup(&db_pool, &username).await?;

    let messages = store::list_for(&db_pool, &profile.username).await?;
    let total = messages.len();

    let now = OffsetDateTime::now_utc();
    let midnight = now.replace_time(Time::MIDNIGHT).unix_timestamp();
    let week_ago = (now - Duration::days(7)).unix_timestamp();
    let today = store::count_since(&db_pool, &profile.username, midnight).await?;
    let week = store::count_since(&db_pool, &profile.username, week_ago).await?;

    // viewing the dashboard is what marks messages read
    store::mark_all_read(&db_pool, &profile.username).await?;

    Ok(Json(json!({
        "username": profile.username,
        "messages": messages,
        "total": total,
        "today": today,
        "week": week,
        "profile_url": format!("/u/{}", profile.username),
    }))
    .into_response())
}

#[debug_handler]
pub(crate) async fn delete_message(
    Path((username, id)): Path<(String, String)>,
    State(db_pool): State<SqlitePool>,
    session: Session,
) -> AppResult<Response> {
    let username = profiles::normalize_username(&username);
    require_authorized(session, &username).await?;

    store::delete(&db_pool, &id, &username).await?;
    Ok(Json(json!({ "success": true, "message": "Message deleted" })).into_response())
}

#[debug_handler]
pub(crate) async fn delete_all_messages(
    Path(username): Path<String>,
    State(db_pool): State<SqlitePool>,
    session: Session,
) -> AppResult<Response> {
    let username = profiles::normalize_username(&username);
    require_authorized(session, &username).await?;

    let deleted = store::delete_all(&db_pool, &username).await?;
    Ok(Json(json!({
        "success": true,
        "deleted": deleted,
        "message": format!("{deleted} messages deleted"),
    }))
    .into_response())
}
