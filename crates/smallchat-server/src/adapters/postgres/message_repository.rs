//! PostgreSQL implementation of MessageRepository

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use smallchat::{ChatMessage, DomainError, MessageRepository, MessageType};

/// Rows deleted per statement during cleanup
const DELETE_BATCH_SIZE: usize = 100;

/// PostgreSQL implementation of MessageRepository
///
/// All rows of one deployment share a partition key; the row key is the
/// zero-padded epoch millis followed by the message id, so it sorts by time.
pub struct PgMessageRepository {
    pool: PgPool,
    partition: String,
}

impl PgMessageRepository {
    pub fn new(pool: PgPool, partition: impl Into<String>) -> Self {
        Self {
            pool,
            partition: partition.into(),
        }
    }
}

/// Time-ordered row key for a message
pub fn row_key(message: &ChatMessage) -> String {
    format!("{:013}_{}", message.timestamp.timestamp_millis(), message.id)
}

/// Internal row type for sqlx mapping
#[derive(sqlx::FromRow)]
struct MessageRow {
    id: String,
    sender: String,
    content: String,
    message_type: String,
    reply_to_id: Option<String>,
    reply_to_sender: Option<String>,
    reply_to_content: Option<String>,
    created_at: DateTime<Utc>,
}

impl TryFrom<MessageRow> for ChatMessage {
    type Error = DomainError;

    fn try_from(row: MessageRow) -> Result<Self, Self::Error> {
        let message_type = row
            .message_type
            .parse::<MessageType>()
            .map_err(DomainError::Repository)?;

        Ok(Self {
            id: row.id,
            sender: row.sender,
            content: row.content,
            message_type,
            timestamp: row.created_at,
            reply_to_id: row.reply_to_id,
            reply_to_sender: row.reply_to_sender,
            reply_to_content: row.reply_to_content,
        })
    }
}

#[async_trait]
impl MessageRepository for PgMessageRepository {
    async fn save(&self, message: &ChatMessage) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO chat_messages (
                partition_key, row_key, id, sender, content, message_type,
                reply_to_id, reply_to_sender, reply_to_content, ts_epoch, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            ON CONFLICT (partition_key, row_key) DO UPDATE
            SET id = EXCLUDED.id,
                sender = EXCLUDED.sender,
                content = EXCLUDED.content,
                message_type = EXCLUDED.message_type,
                reply_to_id = EXCLUDED.reply_to_id,
                reply_to_sender = EXCLUDED.reply_to_sender,
                reply_to_content = EXCLUDED.reply_to_content,
                ts_epoch = EXCLUDED.ts_epoch,
                created_at = EXCLUDED.created_at
            "#,
        )
        .bind(&self.partition)
        .bind(row_key(message))
        .bind(&message.id)
        .bind(&message.sender)
        .bind(&message.content)
        .bind(message.message_type.as_str())
        .bind(&message.reply_to_id)
        .bind(&message.reply_to_sender)
        .bind(&message.reply_to_content)
        .bind(message.timestamp.timestamp_millis())
        .bind(message.timestamp)
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::Repository(e.to_string()))?;

        Ok(())
    }

    async fn load_since(&self, cutoff: DateTime<Utc>) -> Result<Vec<ChatMessage>, DomainError> {
        let rows = sqlx::query_as::<_, MessageRow>(
            r#"
            SELECT id, sender, content, message_type,
                   reply_to_id, reply_to_sender, reply_to_content, created_at
            FROM chat_messages
            WHERE partition_key = $1 AND ts_epoch >= $2
            "#,
        )
        .bind(&self.partition)
        .bind(cutoff.timestamp_millis())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| DomainError::Repository(e.to_string()))?;

        let messages = rows
            .into_iter()
            .filter_map(|row| {
                let id = row.id.clone();
                match ChatMessage::try_from(row) {
                    Ok(message) => Some(message),
                    Err(e) => {
                        tracing::warn!("Failed to parse stored message {}: {}", id, e);
                        None
                    }
                }
            })
            .collect();

        Ok(messages)
    }

    async fn delete_before(&self, cutoff: DateTime<Utc>) -> Result<usize, DomainError> {
        let row_keys = sqlx::query_scalar::<_, String>(
            "SELECT row_key FROM chat_messages WHERE partition_key = $1 AND ts_epoch < $2",
        )
        .bind(&self.partition)
        .bind(cutoff.timestamp_millis())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| DomainError::Repository(e.to_string()))?;

        let mut deleted = 0;
        for batch in row_keys.chunks(DELETE_BATCH_SIZE) {
            let result = sqlx::query(
                "DELETE FROM chat_messages WHERE partition_key = $1 AND row_key = ANY($2)",
            )
            .bind(&self.partition)
            .bind(batch.to_vec())
            .execute(&self.pool)
            .await;

            match result {
                Ok(done) => deleted += done.rows_affected() as usize,
                Err(e) => tracing::warn!(
                    "Failed deleting {} messages starting at {}: {}",
                    batch.len(),
                    batch[0],
                    e
                ),
            }
        }

        Ok(deleted)
    }

    fn is_enabled(&self) -> bool {
        true
    }
}
