use std::net::SocketAddr;

use axum::{
    debug_handler,
    extract::{ConnectInfo, Path, State},
    http::HeaderMap,
    response::{IntoResponse, Response},
    Form, Json,
};
use serde::Deserialize;
use serde_json::json;
use sqlx::SqlitePool;

use crate::guard::{AbuseGuard, Admission};
use crate::messages::store;
use crate::{profiles, AppError, AppResult};

#[derive(Deserialize)]
pub(crate) struct SubmitForm {
    text: String,
}

/// First hop of X-Forwarded-For when present, socket peer otherwise.
fn client_addr(headers: &HeaderMap, peer: &SocketAddr) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(|addr| addr.trim().to_owned())
        .unwrap_or_else(|| peer.ip().to_string())
}

#[debug_handler(state = crate::AppState)]
pub(crate) async fn submit(
    Path(username): Path<String>,
    State(db_pool): State<SqlitePool>,
    State(guard): State<AbuseGuard>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Form(SubmitForm { text }): Form<SubmitForm>,
) -> AppResult<Response> {
    let username = profiles::normalize_username(&username);
    let raw_addr = client_addr(&headers, &peer);

    // the guard runs first so probing for usernames still burns the
    // sender's rate window
    match guard.admit(&db_pool, &raw_addr, &text).await? {
        Admission::Accept { token, text } => {
            let recipient = profiles::lookup(&db_pool, &username).await?;
            store::create(&db_pool, &recipient.username, &text, &token).await?;
            tracing::info!(recipient = %recipient.username, "message accepted");
            Ok(Json(json!({
                "success": true,
                "message": "Your anonymous message has been sent!",
            }))
            .into_response())
        }
        Admission::RateLimited => Err(AppError::RateLimited),
        Admission::Blocked => Err(AppError::Blocked),
        Admission::RejectedContent(reason) => Err(AppError::RejectedContent(reason)),
    }
}
