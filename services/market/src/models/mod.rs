//! Domain models and request/patch payloads
//!
//! Wire field names keep the contract of the original frontend (Spanish
//! identifiers) via `serde(rename)`; the Rust side uses English names.

pub mod message;
pub mod product;
pub mod review;
pub mod transaction;
pub mod user;

pub use message::{Message, NewMessage};
pub use product::{Availability, Category, NewProduct, Product, ProductQuery, UpdateProduct};
pub use review::{NewReview, Review};
pub use transaction::{NewShipment, Shipment, Transaction, UpdateShipment};
pub use user::{LoginRequest, NewUser, UpdateUser, User};
