use axum::{debug_handler, extract::{Path, State}, response::{IntoResponse, Response}, Form, Json};
use serde::Deserialize;
use serde_json::json;
use sqlx::SqlitePool;
use tower_sessions::Session;

use crate::{profiles::store, session::DashboardGate, AppError, AppResult};

#[derive(Deserialize)]
pub(crate) struct LoginForm {
    username: String,
    pin: String,
}

fn validate_pin_format(pin: &str) -> AppResult<()> {
    if pin.len() != 4 || !pin.chars().all(|c| c.is_ascii_digit()) {
        return Err(AppError::Validation("PIN must be 4 digits.".to_owned()));
    }
    Ok(())
}

#[debug_handler]
pub(crate) async fn login(
    State(db_pool): State<SqlitePool>,
    session: Session,
    Form(LoginForm { username, pin }): Form<LoginForm>,
) -> AppResult<Response> {
    let username = store::normalize_username(&username);
    validate_pin_format(&pin)?;

    if !store::verify_pin(&db_pool, &username, &pin).await? {
        tracing::info!(%username, "failed PIN attempt");
        return Err(AppError::Unauthorized);
    }

    DashboardGate::new(session).authorize(&username).await?;
    tracing::info!(%username, "dashboard authenticated");

    Ok(Json(json!({
        "success": true,
        "dashboard_url": format!("/dashboard/{username}"),
    }))
    .into_response())
}

#[debug_handler]
pub(crate) async fn logout(
    Path(username): Path<String>,
    session: Session,
) -> AppResult<Response> {
    let username = store::normalize_username(&username);
    DashboardGate::new(session).revoke(&username).await?;
    Ok(Json(json!({ "success": true })).into_response())
}
