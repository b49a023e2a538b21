//! Purchase workflow
//!
//! The one multi-table state transition in the system: flipping a
//! product to sold, recording the transaction, and telling every open
//! chat thread about it. Everything that touches the database runs in a
//! single unit of work; a failure anywhere before commit leaves no
//! trace. Email notifications go out only after commit, detached from
//! the request.

use chrono::Utc;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Row};
use tracing::{info, warn};

use crate::error::{ApiError, ApiResult};
use crate::models::Transaction;
use crate::notify::Mailer;
use crate::repositories::{transaction::transaction_from_row, UserRepository};

/// Body sent to every chat counterpart when their thread's product sells
const SOLD_NOTICE: &str = "El producto ha sido comprado y ya no está disponible.";

/// Purchase request, also echoed back by the checkout-session endpoint
/// as the provisional transaction payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PurchaseRequest {
    #[serde(rename = "comprador_id")]
    pub buyer_id: i32,
    #[serde(rename = "vendedor_id")]
    pub seller_id: i32,
    #[serde(rename = "producto_id")]
    pub product_id: i32,
    #[serde(rename = "monto")]
    pub amount: Decimal,
    #[serde(rename = "nombre_producto")]
    pub product_name: String,
    #[serde(rename = "stripe_payment_id", default)]
    pub payment_ref: Option<String>,
}

/// Orchestrates the purchase state transition
#[derive(Clone)]
pub struct PurchaseService {
    pool: PgPool,
    users: UserRepository,
    mailer: Mailer,
}

impl PurchaseService {
    /// Create a new purchase service
    pub fn new(pool: PgPool, users: UserRepository, mailer: Mailer) -> Self {
        Self {
            pool,
            users,
            mailer,
        }
    }

    /// Run the purchase. On success the product is sold, exactly one
    /// transaction row exists, and every chat counterpart holds one new
    /// unread notice from the buyer. On failure nothing is persisted.
    pub async fn purchase(&self, request: &PurchaseRequest) -> ApiResult<Transaction> {
        let mut tx = self.pool.begin().await?;

        let product = sqlx::query(
            "SELECT id, name, availability FROM products WHERE id = $1 FOR UPDATE",
        )
        .bind(request.product_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| ApiError::NotFound("Producto no encontrado".to_string()))?;

        let availability: String = product.get("availability");
        if availability != "disponible" {
            // Sold or reserved products are never purchasable.
            return Err(ApiError::BusinessRule(
                "El producto ya no está disponible".to_string(),
            ));
        }
        let product_name: String = product.get("name");

        sqlx::query("UPDATE products SET availability = 'vendido' WHERE id = $1")
            .bind(request.product_id)
            .execute(&mut *tx)
            .await?;

        let now = Utc::now();
        let row = sqlx::query(
            "INSERT INTO transactions (buyer_id, seller_id, product_id, amount, created_at, \
             payment_ref) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             RETURNING id, buyer_id, seller_id, product_id, amount, created_at, payment_ref",
        )
        .bind(request.buyer_id)
        .bind(request.seller_id)
        .bind(request.product_id)
        .bind(request.amount)
        .bind(now)
        .bind(&request.payment_ref)
        .fetch_one(&mut *tx)
        .await?;
        let transaction = transaction_from_row(&row);

        // Everyone with a chat thread about this product, except the buyer,
        // gets one unread notice from the buyer.
        let counterparts = sqlx::query(
            "SELECT DISTINCT party FROM ( \
                 SELECT sender_id AS party FROM messages WHERE product_id = $1 \
                 UNION \
                 SELECT recipient_id AS party FROM messages WHERE product_id = $1 \
             ) AS parties \
             WHERE party <> $2",
        )
        .bind(request.product_id)
        .bind(request.buyer_id)
        .fetch_all(&mut *tx)
        .await?;

        for counterpart in &counterparts {
            let counterpart_id: i32 = counterpart.get("party");
            sqlx::query(
                "INSERT INTO messages (product_id, sender_id, recipient_id, body, sent_at) \
                 VALUES ($1, $2, $3, $4, $5)",
            )
            .bind(request.product_id)
            .bind(request.buyer_id)
            .bind(counterpart_id)
            .bind(SOLD_NOTICE)
            .bind(now)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        info!(
            "Product {} sold to user {} (transaction {}, {} chat threads notified)",
            request.product_id,
            request.buyer_id,
            transaction.id,
            counterparts.len()
        );

        self.notify_parties(request, &product_name).await;

        Ok(transaction)
    }

    /// Post-commit notification fan-out: seller and buyer each get one
    /// email on a detached task.
    async fn notify_parties(&self, request: &PurchaseRequest, product_name: &str) {
        match self.users.find_by_id(request.seller_id).await {
            Ok(Some(seller)) => self.mailer.send_detached(
                "Producto Vendido".to_string(),
                seller.email,
                format!("Tu producto {product_name} ha sido vendido."),
            ),
            Ok(None) => warn!("Seller {} not found for notification", request.seller_id),
            Err(e) => warn!("Failed to load seller for notification: {e}"),
        }

        match self.users.find_by_id(request.buyer_id).await {
            Ok(Some(buyer)) => self.mailer.send_detached(
                "Compra Exitosa".to_string(),
                buyer.email,
                format!("Has comprado el producto {product_name}."),
            ),
            Ok(None) => warn!("Buyer {} not found for notification", request.buyer_id),
            Err(e) => warn!("Failed to load buyer for notification: {e}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Availability, NewMessage, NewProduct, NewUser};
    use crate::notify::{EmailConfig, Mailer};
    use crate::repositories::{MessageRepository, ProductRepository, UserRepository};
    use rust_decimal_macros::dec;

    static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!();

    async fn test_pool() -> PgPool {
        let config = common::database::DatabaseConfig::from_env().expect("database config");
        let pool = common::database::init_pool(&config).await.expect("pool");
        MIGRATOR.run(&pool).await.expect("migrations");
        pool
    }

    fn test_mailer() -> Mailer {
        Mailer::new(&EmailConfig {
            smtp_host: "localhost".to_string(),
            smtp_port: 2525,
            sender: "noreply@example.com".to_string(),
            password: String::new(),
        })
        .expect("mailer")
    }

    async fn register_user(users: &UserRepository, tag: &str) -> i32 {
        let suffix = uuid::Uuid::new_v4().simple().to_string();
        let user = users
            .create(&NewUser {
                username: format!("{tag}_{}", &suffix[..8]),
                first_name: tag.to_string(),
                last_name: "Test".to_string(),
                second_last_name: None,
                email: format!("{tag}+{suffix}@example.com"),
                password: "contraseñaSegura123".to_string(),
                location: Some("Madrid".to_string()),
            })
            .await
            .expect("create user");
        user.id
    }

    async fn seed_category(pool: &PgPool) -> String {
        let name = format!("Electrónica {}", uuid::Uuid::new_v4().simple());
        sqlx::query("INSERT INTO categories (name) VALUES ($1)")
            .bind(&name)
            .execute(pool)
            .await
            .expect("seed category");
        name
    }

    #[tokio::test]
    #[ignore = "requires a running Postgres instance"]
    async fn purchase_flips_availability_and_fans_out() {
        let pool = test_pool().await;
        let users = UserRepository::new(pool.clone());
        let products = ProductRepository::new(pool.clone());
        let messages = MessageRepository::new(pool.clone());
        let service = PurchaseService::new(pool.clone(), users.clone(), test_mailer());

        let seller_id = register_user(&users, "seller").await;
        let buyer_id = register_user(&users, "buyer").await;
        let bystander_id = register_user(&users, "curious").await;
        let category = seed_category(&pool).await;

        let product = products
            .create(
                &NewProduct {
                    name: "Laptop".to_string(),
                    brand: "HP".to_string(),
                    model: "Probook 450 G1".to_string(),
                    price: dec!(100),
                    description: None,
                    location: "Madrid".to_string(),
                    category,
                },
                seller_id,
            )
            .await
            .expect("create product");

        // A pre-existing chat thread about the product.
        messages
            .create(&NewMessage {
                product_id: product.id,
                sender_id: bystander_id,
                recipient_id: seller_id,
                body: "¿Sigue disponible?".to_string(),
                sent_at: Utc::now(),
            })
            .await
            .expect("create message");

        let transaction = service
            .purchase(&PurchaseRequest {
                buyer_id,
                seller_id,
                product_id: product.id,
                amount: dec!(100),
                product_name: "Laptop".to_string(),
                payment_ref: Some("cs_test_123".to_string()),
            })
            .await
            .expect("purchase");

        assert_eq!(transaction.buyer_id, buyer_id);
        assert_eq!(transaction.amount, dec!(100));

        let sold = products
            .find_by_id(product.id)
            .await
            .expect("find product")
            .expect("product exists");
        assert_eq!(sold.availability, Availability::Sold);

        // Both chat counterparts (seller and bystander) got one unread
        // notice from the buyer.
        for counterpart in [seller_id, bystander_id] {
            let thread = messages
                .chat_thread(product.id, buyer_id, counterpart)
                .await
                .expect("thread");
            let notices: Vec<_> = thread
                .iter()
                .filter(|m| m.sender_id == buyer_id && !m.read)
                .collect();
            assert_eq!(notices.len(), 1, "counterpart {counterpart}");
        }
    }

    #[tokio::test]
    #[ignore = "requires a running Postgres instance"]
    async fn sold_product_cannot_be_purchased_again() {
        let pool = test_pool().await;
        let users = UserRepository::new(pool.clone());
        let products = ProductRepository::new(pool.clone());
        let service = PurchaseService::new(pool.clone(), users.clone(), test_mailer());

        let seller_id = register_user(&users, "seller").await;
        let buyer_id = register_user(&users, "buyer").await;
        let category = seed_category(&pool).await;

        let product = products
            .create(
                &NewProduct {
                    name: "Bicicleta".to_string(),
                    brand: "Orbea".to_string(),
                    model: "Vector".to_string(),
                    price: dec!(250),
                    description: None,
                    location: "Bilbao".to_string(),
                    category,
                },
                seller_id,
            )
            .await
            .expect("create product");

        let request = PurchaseRequest {
            buyer_id,
            seller_id,
            product_id: product.id,
            amount: dec!(250),
            product_name: "Bicicleta".to_string(),
            payment_ref: None,
        };

        service.purchase(&request).await.expect("first purchase");
        let second = service.purchase(&request).await;
        assert!(matches!(second, Err(ApiError::BusinessRule(_))));
    }
}
