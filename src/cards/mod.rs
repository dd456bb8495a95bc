pub mod font;
pub mod render;

use std::sync::Arc;

use axum::{
    debug_handler,
    extract::{Path, State},
    http::header,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use sqlx::SqlitePool;
use tower_sessions::Session;

use crate::cards::font::Typeface;
use crate::session::DashboardGate;
use crate::{messages, profiles, AppError, AppResult, AppState};

pub fn router() -> Router<AppState> {
    Router::new().route("/dashboard/{username}/card/{id}", get(card))
}

#[debug_handler(state = AppState)]
pub(crate) async fn card(
    Path((username, id)): Path<(String, String)>,
    State(db_pool): State<SqlitePool>,
    State(typeface): State<Arc<dyn Typeface + Send + Sync>>,
    session: Session,
) -> AppResult<Response> {
    let username = profiles::normalize_username(&username);
    if !DashboardGate::new(session).is_authorized(&username).await? {
        return Err(AppError::Unauthorized);
    }

    let message = messages::store::lookup(&db_pool, &id, &username).await?;
    let png = render::render(&message.body, &username, typeface.as_ref())?;

    Ok((
        [
            (header::CONTENT_TYPE, "image/png".to_owned()),
            (
                header::CONTENT_DISPOSITION,
                format!("inline; filename=\"message_{id}.png\""),
            ),
        ],
        png,
    )
        .into_response())
}
