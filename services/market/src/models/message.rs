//! Chat message models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Persisted chat message. Immutable once created except for the read
/// flag, which only transitions false -> true.
#[derive(Debug, Clone, Serialize)]
pub struct Message {
    #[serde(rename = "mensaje_id")]
    pub id: i32,
    #[serde(rename = "producto_id")]
    pub product_id: i32,
    #[serde(rename = "id_usuario_envia")]
    pub sender_id: i32,
    #[serde(rename = "id_usuario_recibe")]
    pub recipient_id: i32,
    #[serde(rename = "contenido")]
    pub body: String,
    #[serde(rename = "fecha_envio")]
    pub sent_at: DateTime<Utc>,
    #[serde(rename = "leido")]
    pub read: bool,
}

/// Inbound message payload, shared by POST /messages and the live chat
/// channel frames.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewMessage {
    #[serde(rename = "producto_id")]
    pub product_id: i32,
    #[serde(rename = "id_usuario_envia")]
    pub sender_id: i32,
    #[serde(rename = "id_usuario_recibe")]
    pub recipient_id: i32,
    #[serde(rename = "contenido")]
    pub body: String,
    #[serde(rename = "fecha_envio")]
    pub sent_at: DateTime<Utc>,
}
