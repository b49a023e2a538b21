//! Message repository for database operations

use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};

use crate::error::ApiResult;
use crate::models::{Message, NewMessage};

const MESSAGE_COLUMNS: &str = "id, product_id, sender_id, recipient_id, body, sent_at, read";

pub(crate) fn message_from_row(row: &PgRow) -> Message {
    Message {
        id: row.get("id"),
        product_id: row.get("product_id"),
        sender_id: row.get("sender_id"),
        recipient_id: row.get("recipient_id"),
        body: row.get("body"),
        sent_at: row.get("sent_at"),
        read: row.get("read"),
    }
}

/// Message repository
#[derive(Clone)]
pub struct MessageRepository {
    pool: PgPool,
}

impl MessageRepository {
    /// Create a new message repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Persist a new message, unread
    pub async fn create(&self, new_message: &NewMessage) -> ApiResult<Message> {
        let row = sqlx::query(&format!(
            "INSERT INTO messages (product_id, sender_id, recipient_id, body, sent_at) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING {MESSAGE_COLUMNS}"
        ))
        .bind(new_message.product_id)
        .bind(new_message.sender_id)
        .bind(new_message.recipient_id)
        .bind(&new_message.body)
        .bind(new_message.sent_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(message_from_row(&row))
    }

    /// Both directions of a two-person thread about a product, in send
    /// order.
    pub async fn chat_thread(
        &self,
        product_id: i32,
        user1_id: i32,
        user2_id: i32,
    ) -> ApiResult<Vec<Message>> {
        let rows = sqlx::query(&format!(
            "SELECT {MESSAGE_COLUMNS} FROM messages \
             WHERE product_id = $1 \
               AND ((sender_id = $2 AND recipient_id = $3) \
                 OR (sender_id = $3 AND recipient_id = $2)) \
             ORDER BY sent_at, id"
        ))
        .bind(product_id)
        .bind(user1_id)
        .bind(user2_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(message_from_row).collect())
    }

    /// Every message a user sent or received
    pub async fn list_for_user(&self, user_id: i32) -> ApiResult<Vec<Message>> {
        let rows = sqlx::query(&format!(
            "SELECT {MESSAGE_COLUMNS} FROM messages \
             WHERE sender_id = $1 OR recipient_id = $1 \
             ORDER BY sent_at, id"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(message_from_row).collect())
    }

    /// Mark a two-person thread as read. The flag only transitions
    /// false -> true; already-read messages are untouched.
    pub async fn mark_read(&self, product_id: i32, user1_id: i32, user2_id: i32) -> ApiResult<u64> {
        let result = sqlx::query(
            "UPDATE messages SET read = TRUE \
             WHERE product_id = $1 AND read = FALSE \
               AND ((sender_id = $2 AND recipient_id = $3) \
                 OR (sender_id = $3 AND recipient_id = $2))",
        )
        .bind(product_id)
        .bind(user1_id)
        .bind(user2_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }
}
