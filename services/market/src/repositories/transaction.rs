//! Transaction and shipment repository for database operations
//!
//! Transaction rows are inserted by the purchase workflow inside its own
//! unit of work; this repository only reads them. Shipments are the one
//! post-purchase record that stays mutable through explicit status
//! updates.

use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};

use crate::error::{ApiError, ApiResult};
use crate::models::{NewShipment, Shipment, Transaction, UpdateShipment};

const TRANSACTION_COLUMNS: &str =
    "id, buyer_id, seller_id, product_id, amount, created_at, payment_ref";

pub(crate) fn transaction_from_row(row: &PgRow) -> Transaction {
    Transaction {
        id: row.get("id"),
        buyer_id: row.get("buyer_id"),
        seller_id: row.get("seller_id"),
        product_id: row.get("product_id"),
        amount: row.get("amount"),
        created_at: row.get("created_at"),
        payment_ref: row.get("payment_ref"),
    }
}

fn shipment_from_row(row: &PgRow) -> Shipment {
    Shipment {
        id: row.get("id"),
        transaction_id: row.get("transaction_id"),
        status: row.get("status"),
        updated_at: row.get("updated_at"),
    }
}

/// Transaction and shipment repository
#[derive(Clone)]
pub struct TransactionRepository {
    pool: PgPool,
}

impl TransactionRepository {
    /// Create a new transaction repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// List every recorded transaction
    pub async fn list(&self) -> ApiResult<Vec<Transaction>> {
        let rows = sqlx::query(&format!(
            "SELECT {TRANSACTION_COLUMNS} FROM transactions ORDER BY created_at DESC"
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(transaction_from_row).collect())
    }

    /// Find a transaction by ID
    pub async fn find_by_id(&self, id: i32) -> ApiResult<Option<Transaction>> {
        let row = sqlx::query(&format!(
            "SELECT {TRANSACTION_COLUMNS} FROM transactions WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(transaction_from_row))
    }

    /// Record a shipment for a transaction
    pub async fn create_shipment(&self, new_shipment: &NewShipment) -> ApiResult<Shipment> {
        let row = sqlx::query(
            "INSERT INTO shipments (transaction_id, status) \
             VALUES ($1, $2) \
             RETURNING id, transaction_id, status, updated_at",
        )
        .bind(new_shipment.transaction_id)
        .bind(&new_shipment.status)
        .fetch_one(&self.pool)
        .await?;

        Ok(shipment_from_row(&row))
    }

    /// Overwrite a shipment's status
    pub async fn update_shipment(&self, id: i32, patch: &UpdateShipment) -> ApiResult<Shipment> {
        let row = sqlx::query(
            "UPDATE shipments SET status = $2, updated_at = now() \
             WHERE id = $1 \
             RETURNING id, transaction_id, status, updated_at",
        )
        .bind(id)
        .bind(&patch.status)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(shipment_from_row(&row)),
            None => Err(ApiError::NotFound("Shipment not found".to_string())),
        }
    }

    /// List every shipment
    pub async fn list_shipments(&self) -> ApiResult<Vec<Shipment>> {
        let rows = sqlx::query(
            "SELECT id, transaction_id, status, updated_at FROM shipments \
             ORDER BY updated_at DESC",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(shipment_from_row).collect())
    }

    /// Find a shipment by ID
    pub async fn find_shipment_by_id(&self, id: i32) -> ApiResult<Option<Shipment>> {
        let row =
            sqlx::query("SELECT id, transaction_id, status, updated_at FROM shipments WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(row.as_ref().map(shipment_from_row))
    }
}
