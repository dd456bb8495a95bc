mod dashboard;
pub mod store;
mod submit;

use axum::{routing::{get, post}, Router};

use crate::AppState;

pub use store::{Message, Status};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/u/{username}", post(submit::submit))
        .route("/dashboard/{username}", get(dashboard::dashboard))
        .route("/dashboard/{username}/delete/{id}", post(dashboard::delete_message))
        .route("/dashboard/{username}/delete_all", post(dashboard::delete_all_messages))
}
