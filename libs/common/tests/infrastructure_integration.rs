//! Integration tests for the infrastructure components
//!
//! These tests verify that the PostgreSQL database is properly configured
//! and accessible from the application. They need a running Postgres with
//! `DATABASE_URL` pointing at it, so they are ignored by default.

use common::database::{health_check, init_pool, DatabaseConfig};
use sqlx::Row;

#[tokio::test]
#[ignore = "requires a running Postgres instance"]
async fn test_database_connectivity() -> Result<(), Box<dyn std::error::Error>> {
    let db_config = DatabaseConfig::from_env()?;
    let pool = init_pool(&db_config).await?;

    assert!(health_check(&pool).await?, "Database health check failed");

    let row = sqlx::query("SELECT 1 as result").fetch_one(&pool).await?;

    let result: i32 = row.get("result");
    assert_eq!(result, 1, "PostgreSQL simple query test failed");

    Ok(())
}
