//! Application state shared across handlers
//!
//! Everything here is explicitly constructed in `main` and cloned into
//! handlers; there are no ambient singletons.

use sqlx::PgPool;

use crate::chat::ChatRegistry;
use crate::jwt::JwtService;
use crate::payments::StripeClient;
use crate::purchase::PurchaseService;
use crate::repositories::{
    MessageRepository, ProductRepository, ReviewRepository, TransactionRepository, UserRepository,
};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub jwt_service: JwtService,
    pub user_repository: UserRepository,
    pub product_repository: ProductRepository,
    pub message_repository: MessageRepository,
    pub transaction_repository: TransactionRepository,
    pub review_repository: ReviewRepository,
    pub purchase_service: PurchaseService,
    pub stripe: StripeClient,
    pub chat_registry: ChatRegistry,
}
