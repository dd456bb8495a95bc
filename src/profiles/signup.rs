use axum::{debug_handler, extract::State, response::{IntoResponse, Response}, Form, Json};
use serde::Deserialize;
use serde_json::json;
use sqlx::SqlitePool;

use crate::{profiles::store, AppResult};

#[derive(Deserialize)]
pub(crate) struct SignupForm {
    username: String,
}

#[debug_handler]
pub(crate) async fn signup(
    State(db_pool): State<SqlitePool>,
    Form(SignupForm { username }): Form<SignupForm>,
) -> AppResult<Response> {
    let profile = store::create_profile(&db_pool, &username).await?;

    // the PIN is surfaced here once and never again
    Ok(Json(json!({
        "success": true,
        "username": profile.username,
        "pin": profile.pin,
        "profile_url": format!("/u/{}", profile.username),
    }))
    .into_response())
}
