//! Transaction and shipment models

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Recorded purchase. Created exactly once per successful purchase and
/// never mutated afterward.
#[derive(Debug, Clone, Serialize)]
pub struct Transaction {
    #[serde(rename = "transaccion_id")]
    pub id: i32,
    #[serde(rename = "comprador_id")]
    pub buyer_id: i32,
    #[serde(rename = "vendedor_id")]
    pub seller_id: i32,
    #[serde(rename = "producto_id")]
    pub product_id: i32,
    #[serde(rename = "monto")]
    pub amount: Decimal,
    #[serde(rename = "fecha_transaccion")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "stripe_payment_id")]
    pub payment_ref: Option<String>,
}

/// Shipment record attached to a transaction
#[derive(Debug, Clone, Serialize)]
pub struct Shipment {
    #[serde(rename = "envio_id")]
    pub id: i32,
    #[serde(rename = "transaccion_id")]
    pub transaction_id: i32,
    #[serde(rename = "estado")]
    pub status: String,
    #[serde(rename = "fecha_actualizacion")]
    pub updated_at: DateTime<Utc>,
}

/// Shipment creation payload
#[derive(Debug, Clone, Deserialize)]
pub struct NewShipment {
    #[serde(rename = "transaccion_id")]
    pub transaction_id: i32,
    #[serde(rename = "estado")]
    pub status: String,
}

/// Shipment status update
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateShipment {
    #[serde(rename = "estado")]
    pub status: String,
}
