mod login;
mod signup;
pub mod store;

use axum::{routing::{get, post}, Router};

use crate::AppState;

pub use store::{create_profile, lookup, normalize_username, verify_pin, Profile};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/signup", post(signup::signup))
        .route("/login", post(login::login))
        .route("/logout/{username}", get(login::logout))
}
