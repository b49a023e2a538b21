//! User repository for database operations

use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use tracing::info;

use crate::credentials;
use crate::error::{ApiError, ApiResult};
use crate::models::{NewUser, UpdateUser, User};

const USER_COLUMNS: &str = "id, username, first_name, last_name, second_last_name, email, \
                            password_hash, registered_at, location";

pub(crate) fn user_from_row(row: &PgRow) -> User {
    User {
        id: row.get("id"),
        username: row.get("username"),
        first_name: row.get("first_name"),
        last_name: row.get("last_name"),
        second_last_name: row.get("second_last_name"),
        email: row.get("email"),
        password_hash: row.get("password_hash"),
        registered_at: row.get("registered_at"),
        location: row.get("location"),
    }
}

/// User repository
#[derive(Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    /// Create a new user repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Register a new user; the password is hashed here and the email
    /// must be previously unseen.
    pub async fn create(&self, new_user: &NewUser) -> ApiResult<User> {
        info!("Registering new user: {}", new_user.username);

        let existing = sqlx::query("SELECT id FROM users WHERE email = $1")
            .bind(&new_user.email)
            .fetch_optional(&self.pool)
            .await?;

        if existing.is_some() {
            return Err(ApiError::BusinessRule(
                "Email already registered".to_string(),
            ));
        }

        let password_hash = credentials::hash_password(&new_user.password)?;

        let row = sqlx::query(&format!(
            "INSERT INTO users (username, first_name, last_name, second_last_name, email, \
             password_hash, location) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             RETURNING {USER_COLUMNS}"
        ))
        .bind(&new_user.username)
        .bind(&new_user.first_name)
        .bind(&new_user.last_name)
        .bind(&new_user.second_last_name)
        .bind(&new_user.email)
        .bind(&password_hash)
        .bind(&new_user.location)
        .fetch_one(&self.pool)
        .await?;

        Ok(user_from_row(&row))
    }

    /// Find a user by email
    pub async fn find_by_email(&self, email: &str) -> ApiResult<Option<User>> {
        let row = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1"))
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().map(user_from_row))
    }

    /// Find a user by ID
    pub async fn find_by_id(&self, id: i32) -> ApiResult<Option<User>> {
        let row = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().map(user_from_row))
    }

    /// Apply a profile patch. Fields absent from the payload keep their
    /// current value; present fields are applied even when falsy.
    pub async fn update(&self, id: i32, patch: &UpdateUser) -> ApiResult<User> {
        let row = sqlx::query(&format!(
            "UPDATE users SET \
             username = COALESCE($2, username), \
             first_name = COALESCE($3, first_name), \
             last_name = COALESCE($4, last_name), \
             second_last_name = COALESCE($5, second_last_name), \
             email = COALESCE($6, email), \
             location = COALESCE($7, location) \
             WHERE id = $1 \
             RETURNING {USER_COLUMNS}"
        ))
        .bind(id)
        .bind(&patch.username)
        .bind(&patch.first_name)
        .bind(&patch.last_name)
        .bind(&patch.second_last_name)
        .bind(&patch.email)
        .bind(&patch.location)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(user_from_row(&row)),
            None => Err(ApiError::NotFound("User not found".to_string())),
        }
    }
}
