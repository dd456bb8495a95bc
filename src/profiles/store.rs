use rand::Rng;
use sqlx::SqlitePool;
use time::OffsetDateTime;

use crate::{AppError, AppResult};

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Profile {
    pub username: String,
    pub pin: String,
    pub created_at: i64,
}

pub fn normalize_username(raw: &str) -> String {
    raw.trim().to_lowercase()
}

fn validate_username(username: &str) -> AppResult<()> {
    let len = username.chars().count();
    if !(3..=50).contains(&len) {
        return Err(AppError::Validation(
            "Username must be between 3 and 50 characters.".to_owned(),
        ));
    }
    if !username
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
    {
        return Err(AppError::Validation(
            "Username can only contain letters, numbers, and underscores.".to_owned(),
        ));
    }
    Ok(())
}

/// Uniform draw over 1000..=9999, so always four digits with no leading zero.
pub fn generate_pin() -> String {
    rand::rng().random_range(1000..=9999).to_string()
}

/// The returned profile carries the PIN; this is the one time it is shown.
/// Uniqueness rides on the primary key rather than a racy pre-check.
pub async fn create_profile(db_pool: &SqlitePool, raw_username: &str) -> AppResult<Profile> {
    let username = normalize_username(raw_username);
    validate_username(&username)?;

    let profile = Profile {
        username,
        pin: generate_pin(),
        created_at: OffsetDateTime::now_utc().unix_timestamp(),
    };

    let inserted = sqlx::query("INSERT INTO profiles (username,pin,created_at) VALUES (?,?,?)")
        .bind(&profile.username)
        .bind(&profile.pin)
        .bind(profile.created_at)
        .execute(db_pool)
        .await;

    match inserted {
        Ok(_) => {
            tracing::info!(username = %profile.username, "profile created");
            Ok(profile)
        }
        Err(sqlx::Error::Database(err)) if err.is_unique_violation() => {
            Err(AppError::UsernameTaken)
        }
        Err(err) => Err(err.into()),
    }
}

pub async fn lookup(db_pool: &SqlitePool, username: &str) -> AppResult<Profile> {
    sqlx::query_as::<_, Profile>("SELECT username,pin,created_at FROM profiles WHERE username=?")
        .bind(username)
        .fetch_optional(db_pool)
        .await?
        .ok_or(AppError::NotFound)
}

/// Exact string comparison; attempt throttling is the caller's concern.
pub async fn verify_pin(
    db_pool: &SqlitePool,
    username: &str,
    candidate_pin: &str,
) -> AppResult<bool> {
    let profile = lookup(db_pool, username).await?;
    Ok(profile.pin == candidate_pin)
}
