//! Review repository for database operations

use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};

use crate::error::{ApiError, ApiResult};
use crate::models::{NewReview, Review};

fn review_from_row(row: &PgRow) -> Review {
    Review {
        id: row.get("id"),
        author_id: row.get("author_id"),
        subject_id: row.get("subject_id"),
        score: row.get("score"),
        comment: row.get("comment"),
        created_at: row.get("created_at"),
    }
}

/// Review repository; reviews are append-only.
#[derive(Clone)]
pub struct ReviewRepository {
    pool: PgPool,
}

impl ReviewRepository {
    /// Create a new review repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Record a review from an author about a subject
    pub async fn create(&self, author_id: i32, new_review: &NewReview) -> ApiResult<Review> {
        if !(1..=5).contains(&new_review.score) {
            return Err(ApiError::Validation(
                "Score must be between 1 and 5".to_string(),
            ));
        }

        let row = sqlx::query(
            "INSERT INTO reviews (author_id, subject_id, score, comment) \
             VALUES ($1, $2, $3, $4) \
             RETURNING id, author_id, subject_id, score, comment, created_at",
        )
        .bind(author_id)
        .bind(new_review.subject_id)
        .bind(new_review.score)
        .bind(&new_review.comment)
        .fetch_one(&self.pool)
        .await?;

        Ok(review_from_row(&row))
    }

    /// Every review received by a user
    pub async fn list_for_subject(&self, subject_id: i32) -> ApiResult<Vec<Review>> {
        let rows = sqlx::query(
            "SELECT id, author_id, subject_id, score, comment, created_at FROM reviews \
             WHERE subject_id = $1 \
             ORDER BY created_at DESC",
        )
        .bind(subject_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(review_from_row).collect())
    }
}
