//! User review models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Append-only review one user leaves for another
#[derive(Debug, Clone, Serialize)]
pub struct Review {
    #[serde(rename = "resena_id")]
    pub id: i32,
    #[serde(rename = "autor_id")]
    pub author_id: i32,
    #[serde(rename = "usuario_id")]
    pub subject_id: i32,
    #[serde(rename = "puntuacion")]
    pub score: i32,
    #[serde(rename = "comentario")]
    pub comment: Option<String>,
    #[serde(rename = "fecha")]
    pub created_at: DateTime<Utc>,
}

/// Review creation payload; the author is the authenticated caller.
#[derive(Debug, Clone, Deserialize)]
pub struct NewReview {
    #[serde(rename = "usuario_id")]
    pub subject_id: i32,
    #[serde(rename = "puntuacion")]
    pub score: i32,
    #[serde(rename = "comentario", default)]
    pub comment: Option<String>,
}
