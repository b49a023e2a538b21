//! Domain repositories over the shared Postgres pool
//!
//! Each repository owns a pool clone and fails fast with a typed
//! [`crate::error::ApiError`] the moment an invariant is violated.

pub mod message;
pub mod product;
pub mod review;
pub mod transaction;
pub mod user;

pub use message::MessageRepository;
pub use product::ProductRepository;
pub use review::ReviewRepository;
pub use transaction::TransactionRepository;
pub use user::UserRepository;
