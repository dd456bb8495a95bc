use serde::Serialize;
use sqlx::SqlitePool;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::ip::SenderToken;
use crate::{AppError, AppResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, sqlx::Type)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Unread,
    Read,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Message {
    pub id: String,
    pub recipient: String,
    pub body: String,
    #[serde(skip)]
    pub sender_token: Option<String>,
    pub status: Status,
    pub created_at: i64,
}

/// Text must already have passed the abuse guard.
pub async fn create(
    db_pool: &SqlitePool,
    recipient: &str,
    text: &str,
    sender_token: &SenderToken,
) -> AppResult<Message> {
    let message = Message {
        id: Uuid::now_v7().to_string(),
        recipient: recipient.to_owned(),
        body: text.to_owned(),
        sender_token: Some(sender_token.as_str().to_owned()),
        status: Status::Unread,
        created_at: OffsetDateTime::now_utc().unix_timestamp(),
    };

    sqlx::query(
        "INSERT INTO messages (id,recipient,body,sender_token,status,created_at)
         VALUES (?,?,?,?,?,?)",
    )
    .bind(&message.id)
    .bind(&message.recipient)
    .bind(&message.body)
    .bind(&message.sender_token)
    .bind(message.status)
    .bind(message.created_at)
    .execute(db_pool)
    .await?;

    Ok(message)
}

/// Most-recent-first; v7 ids break ties within one second.
pub async fn list_for(db_pool: &SqlitePool, recipient: &str) -> AppResult<Vec<Message>> {
    Ok(sqlx::query_as::<_, Message>(
        "SELECT id,recipient,body,sender_token,status,created_at FROM messages
         WHERE recipient=? ORDER BY created_at DESC, id DESC",
    )
    .bind(recipient)
    .fetch_all(db_pool)
    .await?)
}

pub async fn mark_all_read(db_pool: &SqlitePool, recipient: &str) -> AppResult<()> {
    sqlx::query("UPDATE messages SET status=? WHERE recipient=? AND status=?")
        .bind(Status::Read)
        .bind(recipient)
        .bind(Status::Unread)
        .execute(db_pool)
        .await?;
    Ok(())
}

/// Owner-scoped: a message id belonging to someone else is simply not found.
pub async fn delete(db_pool: &SqlitePool, id: &str, recipient: &str) -> AppResult<()> {
    let result = sqlx::query("DELETE FROM messages WHERE id=? AND recipient=?")
        .bind(id)
        .bind(recipient)
        .execute(db_pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound);
    }
    Ok(())
}

pub async fn delete_all(db_pool: &SqlitePool, recipient: &str) -> AppResult<u64> {
    let result = sqlx::query("DELETE FROM messages WHERE recipient=?")
        .bind(recipient)
        .execute(db_pool)
        .await?;
    Ok(result.rows_affected())
}

pub async fn count_since(db_pool: &SqlitePool, recipient: &str, since: i64) -> AppResult<i64> {
    Ok(sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM messages WHERE recipient=? AND created_at>=?",
    )
    .bind(recipient)
    .bind(since)
    .fetch_one(db_pool)
    .await?)
}

pub async fn lookup(db_pool: &SqlitePool, id: &str, recipient: &str) -> AppResult<Message> {
    sqlx::query_as::<_, Message>(
        "SELECT id,recipient,body,sender_token,status,created_at FROM messages
         WHERE id=? AND recipient=?",
    )
    .bind(id)
    .bind(recipient)
    .fetch_optional(db_pool)
    .await?
    .ok_or(AppError::NotFound)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{db, ip, profiles};

    async fn pool_with(usernames: &[&str]) -> SqlitePool {
        let pool = db::connect_in_memory().await.unwrap();
        for username in usernames {
            profiles::create_profile(&pool, username).await.unwrap();
        }
        pool
    }

    #[tokio::test]
    async fn list_is_most_recent_first() {
        let pool = pool_with(&["alice"]).await;
        let token = ip::tokenize("203.0.113.1");

        create(&pool, "alice", "first", &token).await.unwrap();
        create(&pool, "alice", "second", &token).await.unwrap();
        create(&pool, "alice", "third", &token).await.unwrap();

        let bodies: Vec<_> = list_for(&pool, "alice")
            .await
            .unwrap()
            .into_iter()
            .map(|m| m.body)
            .collect();
        assert_eq!(bodies, ["third", "second", "first"]);
    }

    #[tokio::test]
    async fn mark_all_read_is_idempotent() {
        let pool = pool_with(&["alice"]).await;
        let token = ip::tokenize("203.0.113.1");
        create(&pool, "alice", "hello", &token).await.unwrap();

        assert_eq!(list_for(&pool, "alice").await.unwrap()[0].status, Status::Unread);

        mark_all_read(&pool, "alice").await.unwrap();
        mark_all_read(&pool, "alice").await.unwrap();
        assert_eq!(list_for(&pool, "alice").await.unwrap()[0].status, Status::Read);
    }

    #[tokio::test]
    async fn cross_recipient_delete_fails() {
        let pool = pool_with(&["alice", "bob"]).await;
        let token = ip::tokenize("203.0.113.1");
        let message = create(&pool, "alice", "for alice", &token).await.unwrap();

        let err = delete(&pool, &message.id, "bob").await.unwrap_err();
        assert!(matches!(err, crate::AppError::NotFound));
        assert_eq!(list_for(&pool, "alice").await.unwrap().len(), 1);

        delete(&pool, &message.id, "alice").await.unwrap();
        assert!(list_for(&pool, "alice").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn delete_all_reports_count() {
        let pool = pool_with(&["alice"]).await;
        let token = ip::tokenize("203.0.113.1");

        assert_eq!(delete_all(&pool, "alice").await.unwrap(), 0);

        create(&pool, "alice", "one", &token).await.unwrap();
        create(&pool, "alice", "two", &token).await.unwrap();
        assert_eq!(delete_all(&pool, "alice").await.unwrap(), 2);
    }

    #[tokio::test]
    async fn count_since_filters_on_timestamp() {
        let pool = pool_with(&["alice"]).await;
        let token = ip::tokenize("203.0.113.1");
        let message = create(&pool, "alice", "hello", &token).await.unwrap();

        assert_eq!(count_since(&pool, "alice", message.created_at - 10).await.unwrap(), 1);
        assert_eq!(count_since(&pool, "alice", message.created_at + 10).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn deleting_profile_cascades_to_messages() {
        let pool = pool_with(&["alice"]).await;
        let token = ip::tokenize("203.0.113.1");
        create(&pool, "alice", "hello", &token).await.unwrap();

        sqlx::query("DELETE FROM profiles WHERE username=?")
            .bind("alice")
            .execute(&pool)
            .await
            .unwrap();

        assert!(list_for(&pool, "alice").await.unwrap().is_empty());
    }
}
