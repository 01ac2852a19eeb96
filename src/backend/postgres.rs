//! PostgreSQL backend: pooled reads/writes plus a `LISTEN`-based change feed.
//!
//! The schema migration installs a row trigger that `pg_notify`s a JSON
//! payload for every insert/update/delete on `messages`; [`subscribe`]
//! turns that channel into a [`ChangeStream`].
//!
//! [`subscribe`]: ChatBackend::subscribe

use async_trait::async_trait;
use sqlx::postgres::{PgListener, PgPoolOptions};
use sqlx::{PgPool, Row};
use tracing::{error, warn};

use crate::backend::{ChangeStream, ChatBackend};
use crate::error::{ChatError, Result};
use crate::message::{ChangeEvent, FeedEvent, Message, MessageId, NewMessage, SortKey};

/// Connection handle for the `messages` table.
#[derive(Debug)]
pub struct PostgresBackend {
    pool: PgPool,
    channel: String,
}

impl PostgresBackend {
    /// Connect, run migrations, and return the shared handle.
    pub async fn connect(
        database_url: &str,
        max_connections: u32,
        channel: impl Into<String>,
    ) -> anyhow::Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;

        sqlx::migrate!("./migrations").run(&pool).await?;

        Ok(Self {
            pool,
            channel: channel.into(),
        })
    }

    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn row_to_message(row: &sqlx::postgres::PgRow) -> std::result::Result<Message, sqlx::Error> {
    Ok(Message {
        id: row.try_get("id")?,
        author: row.try_get("author")?,
        body: row.try_get("body")?,
        created_at: row.try_get("created_at")?,
    })
}

/// Decode one NOTIFY payload. Undecodable payloads (trimmed by the 8000-byte
/// NOTIFY cap, or from a schema the client doesn't know) degrade to a full
/// resync instead of being dropped silently.
fn decode_payload(payload: &str) -> FeedEvent {
    match serde_json::from_str::<ChangeEvent>(payload) {
        Ok(event) => FeedEvent::Change(event),
        Err(err) => {
            warn!(
                name: "subscription.payload.undecodable",
                error = %err,
                "change payload not decodable, requesting full reload"
            );
            FeedEvent::Resync
        }
    }
}

#[async_trait]
impl ChatBackend for PostgresBackend {
    async fn fetch_all(&self, sort: SortKey) -> Result<Vec<Message>> {
        let sql = match sort {
            SortKey::Id => {
                "SELECT id, author, body, created_at FROM messages ORDER BY id ASC"
            }
            SortKey::CreatedAt => {
                "SELECT id, author, body, created_at FROM messages ORDER BY created_at ASC, id ASC"
            }
        };

        let rows = sqlx::query(sql)
            .fetch_all(&self.pool)
            .await
            .map_err(ChatError::read)?;

        rows.iter()
            .map(|row| row_to_message(row).map_err(ChatError::read))
            .collect()
    }

    async fn insert(&self, message: &NewMessage) -> Result<()> {
        sqlx::query("INSERT INTO messages (author, body) VALUES ($1, $2)")
            .bind(&message.author)
            .bind(&message.body)
            .execute(&self.pool)
            .await
            .map_err(ChatError::write)?;
        Ok(())
    }

    async fn delete(&self, id: MessageId) -> Result<()> {
        sqlx::query("DELETE FROM messages WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(ChatError::write)?;
        Ok(())
    }

    async fn subscribe(&self) -> Result<ChangeStream> {
        let mut listener = PgListener::connect_with(&self.pool)
            .await
            .map_err(ChatError::subscription)?;
        listener
            .listen(&self.channel)
            .await
            .map_err(ChatError::subscription)?;

        let stream = async_stream::stream! {
            loop {
                match listener.recv().await {
                    Ok(notification) => yield decode_payload(notification.payload()),
                    Err(err) => {
                        error!(
                            name: "subscription.recv.failed",
                            error = %err,
                            "change stream broke"
                        );
                        yield FeedEvent::Closed;
                        break;
                    }
                }
            }
        };

        Ok(Box::pin(stream))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_insert_payload() {
        let payload = r#"{
            "op": "INSERT",
            "new": {"id": 1, "author": "A", "body": "hi", "created_at": "2026-08-29T10:00:00+00:00"}
        }"#;
        assert!(matches!(
            decode_payload(payload),
            FeedEvent::Change(ChangeEvent::Insert { .. })
        ));
    }

    #[test]
    fn test_undecodable_payload_degrades_to_resync() {
        assert_eq!(decode_payload("not json"), FeedEvent::Resync);
        assert_eq!(decode_payload(r#"{"op":"INSERT"}"#), FeedEvent::Resync);
    }
}
