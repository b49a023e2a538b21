//! Marketplace service routes
//!
//! Public routes (signup, login, product detail, live chat, health) sit
//! on the bare router; everything else goes through the session
//! middleware. CORS preflights are answered ahead of the stack.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::{get, post, put},
    Extension, Json, Router,
};
use serde_json::json;
use tracing::{error, info};

use crate::chat;
use crate::credentials;
use crate::error::{ApiError, ApiResult};
use crate::middleware::{auth_middleware, CurrentUser};
use crate::models::{
    LoginRequest, NewMessage, NewProduct, NewReview, NewShipment, NewUser, ProductQuery,
    UpdateProduct, UpdateShipment, UpdateUser,
};
use crate::purchase::PurchaseRequest;
use crate::state::AppState;

/// Create the router for the marketplace service
pub fn create_router(state: AppState) -> Router {
    let protected = Router::new()
        .route("/users/me", get(get_profile).put(update_profile))
        .route("/users/:user_id", get(get_user))
        .route("/users/:user_id/products", get(get_user_products))
        .route("/products", post(create_product))
        .route("/allproducts", get(list_available_products))
        .route("/products/category/:name", get(get_products_by_category))
        .route("/products/search", get(search_products))
        .route("/products/vendedor/:product_id", get(get_product_seller))
        .route(
            "/products/:product_id",
            put(update_product).delete(delete_product),
        )
        .route("/categories", get(list_categories))
        .route("/messages", post(send_message))
        .route(
            "/messages/chat/:product_id/:user1_id/:user2_id",
            get(get_chat_thread),
        )
        .route("/messages/user/:user_id", get(get_user_messages))
        .route(
            "/messages/mark-as-read/:product_id/:user1_id/:user2_id",
            put(mark_messages_read),
        )
        .route("/create-checkout-session", post(create_checkout_session))
        .route("/purchase_product", post(purchase_product))
        .route("/transactions", get(list_transactions))
        .route("/transactions/:transaction_id", get(get_transaction))
        .route("/shipments", post(create_shipment).get(list_shipments))
        .route(
            "/shipments/:shipment_id",
            get(get_shipment).put(update_shipment),
        )
        .route("/reviews", post(create_review))
        .route("/reviews/:user_id", get(get_user_reviews))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    Router::new()
        .route("/health", get(health_check))
        .route("/users/signup", post(signup))
        .route("/users/login", post(login))
        .route("/products/:product_id", get(get_product))
        .route("/ws/:user_id", get(chat::ws_handler))
        .merge(protected)
        .with_state(state)
}

/// Health check endpoint; also verifies database connectivity
pub async fn health_check(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    let healthy = common::database::health_check(&state.db_pool)
        .await
        .map_err(|e| {
            error!("Database health check failed: {e}");
            ApiError::Internal
        })?;

    if !healthy {
        error!("Database health check reported unhealthy");
        return Err(ApiError::Internal);
    }

    Ok(Json(json!({
        "status": "ok",
        "service": "market-service"
    })))
}

// Users

/// Register a new account
pub async fn signup(
    State(state): State<AppState>,
    Json(payload): Json<NewUser>,
) -> ApiResult<impl IntoResponse> {
    crate::validation::validate_signup(&payload)?;

    let user = state.user_repository.create(&payload).await?;

    Ok((StatusCode::CREATED, Json(user)))
}

/// Exchange credentials for a bearer token
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> ApiResult<impl IntoResponse> {
    info!("Login attempt for {}", payload.email);

    let user = state
        .user_repository
        .find_by_email(&payload.email)
        .await?
        .filter(|user| credentials::verify_password(&payload.password, &user.password_hash))
        .ok_or_else(|| ApiError::BusinessRule("Incorrect email or password".to_string()))?;

    let token = state.jwt_service.issue(&user.email, user.id).map_err(|e| {
        error!("Failed to issue token: {e}");
        ApiError::Internal
    })?;

    Ok(Json(json!({
        "token": token,
        "user": {
            "id": user.id,
            "username": user.username,
            "email": user.email,
        }
    })))
}

/// Profile of the authenticated caller
pub async fn get_profile(Extension(current): Extension<CurrentUser>) -> impl IntoResponse {
    Json(current.0)
}

/// Self-service profile patch
pub async fn update_profile(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Json(patch): Json<UpdateUser>,
) -> ApiResult<impl IntoResponse> {
    let user = state.user_repository.update(current.0.id, &patch).await?;
    Ok(Json(user))
}

/// Look up any user by id
pub async fn get_user(
    State(state): State<AppState>,
    Path(user_id): Path<i32>,
) -> ApiResult<impl IntoResponse> {
    let user = state
        .user_repository
        .find_by_id(user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    Ok(Json(user))
}

/// Every listing owned by a user
pub async fn get_user_products(
    State(state): State<AppState>,
    Path(user_id): Path<i32>,
) -> ApiResult<impl IntoResponse> {
    let products = state.product_repository.list_by_seller(user_id).await?;
    Ok(Json(products))
}

// Products

/// Publish a listing; the seller is the authenticated caller.
pub async fn create_product(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Json(payload): Json<NewProduct>,
) -> ApiResult<impl IntoResponse> {
    let product = state
        .product_repository
        .create(&payload, current.0.id)
        .await?;

    Ok((StatusCode::CREATED, Json(product)))
}

/// Browse feed: available products from other sellers
pub async fn list_available_products(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
) -> ApiResult<impl IntoResponse> {
    let products = state
        .product_repository
        .list_available_excluding(current.0.id)
        .await?;

    Ok(Json(products))
}

/// Available products in a category, excluding the caller's own
pub async fn get_products_by_category(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(name): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let products = state
        .product_repository
        .list_by_category_name(&name, current.0.id)
        .await?;

    Ok(Json(products))
}

/// Filtered product search
pub async fn search_products(
    State(state): State<AppState>,
    Query(query): Query<ProductQuery>,
) -> ApiResult<impl IntoResponse> {
    let products = state.product_repository.search(&query).await?;
    Ok(Json(products))
}

/// Product detail; public so listings can be shared
pub async fn get_product(
    State(state): State<AppState>,
    Path(product_id): Path<i32>,
) -> ApiResult<impl IntoResponse> {
    let product = state
        .product_repository
        .find_by_id(product_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Product not found".to_string()))?;

    Ok(Json(product))
}

/// Seller id and availability of a product, for the checkout screen
pub async fn get_product_seller(
    State(state): State<AppState>,
    Path(product_id): Path<i32>,
) -> ApiResult<impl IntoResponse> {
    let product = state
        .product_repository
        .find_by_id(product_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Producto no encontrado".to_string()))?;

    Ok(Json(json!({
        "vendedor_id": product.seller_id,
        "disponibilidad": product.availability,
    })))
}

/// Patch a listing
pub async fn update_product(
    State(state): State<AppState>,
    Path(product_id): Path<i32>,
    Json(patch): Json<UpdateProduct>,
) -> ApiResult<impl IntoResponse> {
    let product = state.product_repository.update(product_id, &patch).await?;
    Ok(Json(product))
}

/// Hard delete a listing
pub async fn delete_product(
    State(state): State<AppState>,
    Path(product_id): Path<i32>,
) -> ApiResult<impl IntoResponse> {
    state.product_repository.delete(product_id).await?;
    Ok(Json(json!({"message": "Producto Borrado"})))
}

/// List all categories
pub async fn list_categories(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    let categories = state.product_repository.list_categories().await?;
    Ok(Json(categories))
}

// Messages

/// Persist a chat message sent over plain HTTP
pub async fn send_message(
    State(state): State<AppState>,
    Json(payload): Json<NewMessage>,
) -> ApiResult<impl IntoResponse> {
    let message = state.message_repository.create(&payload).await?;
    Ok((StatusCode::CREATED, Json(message)))
}

/// Both directions of a two-person thread about a product
pub async fn get_chat_thread(
    State(state): State<AppState>,
    Path((product_id, user1_id, user2_id)): Path<(i32, i32, i32)>,
) -> ApiResult<impl IntoResponse> {
    let messages = state
        .message_repository
        .chat_thread(product_id, user1_id, user2_id)
        .await?;

    Ok(Json(messages))
}

/// Every message a user sent or received
pub async fn get_user_messages(
    State(state): State<AppState>,
    Path(user_id): Path<i32>,
) -> ApiResult<impl IntoResponse> {
    let messages = state.message_repository.list_for_user(user_id).await?;
    Ok(Json(messages))
}

/// Mark a thread as read
pub async fn mark_messages_read(
    State(state): State<AppState>,
    Path((product_id, user1_id, user2_id)): Path<(i32, i32, i32)>,
) -> ApiResult<impl IntoResponse> {
    state
        .message_repository
        .mark_read(product_id, user1_id, user2_id)
        .await?;

    Ok(Json(json!({"message": "Messages marked as read"})))
}

// Payments & purchases

/// Create a checkout session with the external payment provider and
/// echo back the provisional transaction payload carrying the opaque
/// payment id.
pub async fn create_checkout_session(
    State(state): State<AppState>,
    Json(mut request): Json<PurchaseRequest>,
) -> ApiResult<impl IntoResponse> {
    let session = state
        .stripe
        .create_checkout_session(&request.product_name, request.amount)
        .await?;

    request.payment_ref = Some(session.id);

    Ok(Json(json!({
        "url": session.url,
        "transaction": request,
    })))
}

/// Complete a purchase: sold flip, transaction record, chat fan-out
pub async fn purchase_product(
    State(state): State<AppState>,
    Json(request): Json<PurchaseRequest>,
) -> ApiResult<impl IntoResponse> {
    let transaction = state.purchase_service.purchase(&request).await?;
    Ok(Json(transaction))
}

// Transactions & shipments

/// List every recorded transaction
pub async fn list_transactions(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    let transactions = state.transaction_repository.list().await?;
    Ok(Json(transactions))
}

/// Look up a transaction by id
pub async fn get_transaction(
    State(state): State<AppState>,
    Path(transaction_id): Path<i32>,
) -> ApiResult<impl IntoResponse> {
    let transaction = state
        .transaction_repository
        .find_by_id(transaction_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Transaction not found".to_string()))?;

    Ok(Json(transaction))
}

/// Record a shipment for a transaction
pub async fn create_shipment(
    State(state): State<AppState>,
    Json(payload): Json<NewShipment>,
) -> ApiResult<impl IntoResponse> {
    let shipment = state
        .transaction_repository
        .create_shipment(&payload)
        .await?;

    Ok((StatusCode::CREATED, Json(shipment)))
}

/// List every shipment
pub async fn list_shipments(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    let shipments = state.transaction_repository.list_shipments().await?;
    Ok(Json(shipments))
}

/// Look up a shipment by id
pub async fn get_shipment(
    State(state): State<AppState>,
    Path(shipment_id): Path<i32>,
) -> ApiResult<impl IntoResponse> {
    let shipment = state
        .transaction_repository
        .find_shipment_by_id(shipment_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Shipment not found".to_string()))?;

    Ok(Json(shipment))
}

/// Overwrite a shipment's status
pub async fn update_shipment(
    State(state): State<AppState>,
    Path(shipment_id): Path<i32>,
    Json(patch): Json<UpdateShipment>,
) -> ApiResult<impl IntoResponse> {
    let shipment = state
        .transaction_repository
        .update_shipment(shipment_id, &patch)
        .await?;

    Ok(Json(shipment))
}

// Reviews

/// Leave a review; the author is the authenticated caller.
pub async fn create_review(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Json(payload): Json<NewReview>,
) -> ApiResult<impl IntoResponse> {
    let review = state
        .review_repository
        .create(current.0.id, &payload)
        .await?;

    Ok((StatusCode::CREATED, Json(review)))
}

/// Every review a user has received
pub async fn get_user_reviews(
    State(state): State<AppState>,
    Path(user_id): Path<i32>,
) -> ApiResult<impl IntoResponse> {
    let reviews = state.review_repository.list_for_subject(user_id).await?;
    Ok(Json(reviews))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::ChatRegistry;
    use crate::jwt::{JwtConfig, JwtService};
    use crate::notify::{EmailConfig, Mailer};
    use crate::payments::{StripeClient, StripeConfig};
    use crate::purchase::PurchaseService;
    use crate::repositories::{
        MessageRepository, ProductRepository, ReviewRepository, TransactionRepository,
        UserRepository,
    };

    async fn test_state() -> AppState {
        let config = common::database::DatabaseConfig::from_env().expect("database config");
        let pool = common::database::init_pool(&config).await.expect("pool");

        let jwt_service = JwtService::new(&JwtConfig {
            secret: "claveSecreta".to_string(),
            token_ttl_minutes: 180,
        });
        let mailer = Mailer::new(&EmailConfig {
            smtp_host: "localhost".to_string(),
            smtp_port: 2525,
            sender: "noreply@example.com".to_string(),
            password: String::new(),
        })
        .expect("mailer");
        let stripe = StripeClient::new(StripeConfig {
            secret_key: String::new(),
            success_url: "http://localhost:3000/checkout-success".to_string(),
            cancel_url: "http://localhost:3000/cancel".to_string(),
        });

        let user_repository = UserRepository::new(pool.clone());
        let purchase_service =
            PurchaseService::new(pool.clone(), user_repository.clone(), mailer);

        AppState {
            db_pool: pool.clone(),
            jwt_service,
            user_repository,
            product_repository: ProductRepository::new(pool.clone()),
            message_repository: MessageRepository::new(pool.clone()),
            transaction_repository: TransactionRepository::new(pool.clone()),
            review_repository: ReviewRepository::new(pool),
            purchase_service,
            stripe,
            chat_registry: ChatRegistry::new(),
        }
    }

    #[tokio::test]
    #[ignore = "requires a running Postgres instance"]
    async fn health_check_reports_ok_when_database_answers() {
        let state = test_state().await;

        let response = health_check(State(state))
            .await
            .expect("health check")
            .into_response();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
