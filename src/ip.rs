use sha2::{Digest, Sha256};
use sqlx::SqlitePool;
use time::OffsetDateTime;

use crate::AppResult;

/// One-way transform of a sender's network address. The raw address never
/// leaves the request handler; everything downstream (rate limiting, the
/// blocklist, the stored message row) sees only this token.
///
/// Deliberately not `Display`: the token is not a display-ready value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SenderToken(String);

impl SenderToken {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

pub fn tokenize(raw_addr: &str) -> SenderToken {
    let digest = Sha256::digest(raw_addr.as_bytes());
    let mut hex = String::with_capacity(64);
    for byte in digest {
        hex.push_str(&format!("{byte:02x}"));
    }
    SenderToken(hex)
}

pub async fn is_blocked(db_pool: &SqlitePool, token: &SenderToken) -> AppResult<bool> {
    let hit: Option<(i64,)> = sqlx::query_as("SELECT 1 FROM blocked_ips WHERE ip_token=?")
        .bind(token.as_str())
        .fetch_optional(db_pool)
        .await?;
    Ok(hit.is_some())
}

/// Administrative. There is no HTTP surface for this; blocks are placed
/// out-of-band and only ever consulted by the abuse guard.
pub async fn block(db_pool: &SqlitePool, token: &SenderToken, reason: &str) -> AppResult<()> {
    sqlx::query("INSERT OR IGNORE INTO blocked_ips (ip_token,reason,blocked_at) VALUES (?,?,?)")
        .bind(token.as_str())
        .bind(reason)
        .bind(OffsetDateTime::now_utc().unix_timestamp())
        .execute(db_pool)
        .await?;
    tracing::info!(token = &token.as_str()[..8], "blocked sender token");
    Ok(())
}
