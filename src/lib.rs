pub mod cards;
pub mod db;
pub mod error;
pub mod guard;
pub mod ip;
pub mod messages;
pub mod profiles;
pub mod session;

use std::sync::Arc;

use axum::extract::FromRef;
use sqlx::SqlitePool;

pub use error::{AppError, AppResult};

use cards::font::Typeface;
use guard::AbuseGuard;

#[derive(Clone, FromRef)]
pub struct AppState {
    pub db_pool: SqlitePool,
    pub guard: AbuseGuard,
    pub typeface: Arc<dyn Typeface + Send + Sync>,
}

impl AppState {
    pub fn new(db_pool: SqlitePool) -> Self {
        Self {
            db_pool,
            guard: AbuseGuard::new(),
            typeface: cards::font::load_typeface(),
        }
    }
}
