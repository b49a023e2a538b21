use anyhow::Result;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

mod chat;
mod credentials;
mod error;
mod jwt;
mod middleware;
mod models;
mod notify;
mod payments;
mod purchase;
mod repositories;
mod routes;
mod state;
mod validation;

use common::database;

use crate::chat::ChatRegistry;
use crate::jwt::{JwtConfig, JwtService};
use crate::notify::{EmailConfig, Mailer};
use crate::payments::{StripeClient, StripeConfig};
use crate::purchase::PurchaseService;
use crate::repositories::{
    MessageRepository, ProductRepository, ReviewRepository, TransactionRepository, UserRepository,
};
use crate::state::AppState;

static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!();

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    info!("Starting marketplace service");

    // Initialize database connection pool
    let db_config = database::DatabaseConfig::from_env()?;
    let pool = database::init_pool(&db_config).await?;

    // Check database connectivity
    if database::health_check(&pool).await? {
        info!("Database connection successful");
    } else {
        anyhow::bail!("Failed to connect to database");
    }

    database::run_migrations(&pool, &MIGRATOR).await?;

    // Initialize services
    let jwt_config = JwtConfig::from_env()?;
    let jwt_service = JwtService::new(&jwt_config);
    let mailer = Mailer::new(&EmailConfig::from_env())?;
    let stripe = StripeClient::new(StripeConfig::from_env());

    // Initialize repositories
    let user_repository = UserRepository::new(pool.clone());
    let product_repository = ProductRepository::new(pool.clone());
    let message_repository = MessageRepository::new(pool.clone());
    let transaction_repository = TransactionRepository::new(pool.clone());
    let review_repository = ReviewRepository::new(pool.clone());

    let purchase_service = PurchaseService::new(pool.clone(), user_repository.clone(), mailer);

    let app_state = AppState {
        db_pool: pool,
        jwt_service,
        user_repository,
        product_repository,
        message_repository,
        transaction_repository,
        review_repository,
        purchase_service,
        stripe,
        chat_registry: ChatRegistry::new(),
    };

    info!("Marketplace service initialized successfully");

    // Start the web server
    let app = routes::create_router(app_state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let bind_addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8000".to_string());
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!("Marketplace service listening on {bind_addr}");

    axum::serve(listener, app).await?;

    Ok(())
}
