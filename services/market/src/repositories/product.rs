//! Product and category repository for database operations

use sqlx::postgres::PgRow;
use sqlx::{PgPool, QueryBuilder, Row};
use tracing::{error, info};

use crate::error::{ApiError, ApiResult};
use crate::models::{Availability, Category, NewProduct, Product, ProductQuery, UpdateProduct};

const PRODUCT_COLUMNS: &str = "id, name, brand, model, description, price, availability, \
                               location, category_id, seller_id, published_at";

pub(crate) fn product_from_row(row: &PgRow) -> ApiResult<Product> {
    let tag: String = row.get("availability");
    let availability = Availability::parse(&tag).ok_or_else(|| {
        error!("Unknown availability tag in database: {tag}");
        ApiError::Internal
    })?;

    Ok(Product {
        id: row.get("id"),
        name: row.get("name"),
        brand: row.get("brand"),
        model: row.get("model"),
        description: row.get("description"),
        price: row.get("price"),
        availability,
        location: row.get("location"),
        category_id: row.get("category_id"),
        seller_id: row.get("seller_id"),
        published_at: row.get("published_at"),
    })
}

fn products_from_rows(rows: &[PgRow]) -> ApiResult<Vec<Product>> {
    rows.iter().map(product_from_row).collect()
}

/// Product repository; also owns category lookups since every
/// product-write path resolves a category name.
#[derive(Clone)]
pub struct ProductRepository {
    pool: PgPool,
}

impl ProductRepository {
    /// Create a new product repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Resolve a category name to its id. Exact match only; no fuzzy
    /// matching, no auto-create.
    pub async fn category_id_by_name(&self, name: &str) -> ApiResult<i32> {
        let row = sqlx::query("SELECT id FROM categories WHERE name = $1")
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => Ok(row.get("id")),
            None => Err(ApiError::NotFound("Categoria not found".to_string())),
        }
    }

    /// List all categories
    pub async fn list_categories(&self) -> ApiResult<Vec<Category>> {
        let rows = sqlx::query("SELECT id, name, description FROM categories ORDER BY name")
            .fetch_all(&self.pool)
            .await?;

        Ok(rows
            .into_iter()
            .map(|row| Category {
                id: row.get("id"),
                name: row.get("name"),
                description: row.get("description"),
            })
            .collect())
    }

    /// Publish a new listing for the given seller
    pub async fn create(&self, new_product: &NewProduct, seller_id: i32) -> ApiResult<Product> {
        info!("Creating product '{}' for user {seller_id}", new_product.name);

        let category_id = self.category_id_by_name(&new_product.category).await?;

        let row = sqlx::query(&format!(
            "INSERT INTO products (name, brand, model, description, price, location, \
             category_id, seller_id) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
             RETURNING {PRODUCT_COLUMNS}"
        ))
        .bind(&new_product.name)
        .bind(&new_product.brand)
        .bind(&new_product.model)
        .bind(&new_product.description)
        .bind(new_product.price)
        .bind(&new_product.location)
        .bind(category_id)
        .bind(seller_id)
        .fetch_one(&self.pool)
        .await?;

        product_from_row(&row)
    }

    /// Find a product by ID
    pub async fn find_by_id(&self, id: i32) -> ApiResult<Option<Product>> {
        let row = sqlx::query(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(product_from_row).transpose()
    }

    /// Browse feed: every available product except the caller's own
    pub async fn list_available_excluding(&self, user_id: i32) -> ApiResult<Vec<Product>> {
        let rows = sqlx::query(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products \
             WHERE seller_id <> $1 AND availability = 'disponible' \
             ORDER BY published_at DESC"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        products_from_rows(&rows)
    }

    /// All listings owned by a seller, regardless of availability
    pub async fn list_by_seller(&self, seller_id: i32) -> ApiResult<Vec<Product>> {
        let rows = sqlx::query(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE seller_id = $1 \
             ORDER BY published_at DESC"
        ))
        .bind(seller_id)
        .fetch_all(&self.pool)
        .await?;

        products_from_rows(&rows)
    }

    /// Available products in a category (by name), excluding the caller's
    /// own listings. Fails NotFound when the category doesn't exist.
    pub async fn list_by_category_name(&self, name: &str, user_id: i32) -> ApiResult<Vec<Product>> {
        let category_id = self.category_id_by_name(name).await?;

        let rows = sqlx::query(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products \
             WHERE category_id = $1 AND seller_id <> $2 AND availability = 'disponible' \
             ORDER BY published_at DESC"
        ))
        .bind(category_id)
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        products_from_rows(&rows)
    }

    /// Filtered search: substring match on name/description, exact match
    /// on location, category by name. At least one filter is required.
    pub async fn search(&self, query: &ProductQuery) -> ApiResult<Vec<Product>> {
        if query.is_empty() {
            return Err(ApiError::Validation(
                "No search parameters provided".to_string(),
            ));
        }

        let category_id = match &query.category {
            Some(name) => Some(self.category_id_by_name(name).await?),
            None => None,
        };

        let mut builder: QueryBuilder<sqlx::Postgres> =
            QueryBuilder::new(format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE 1 = 1"));

        if let Some(name) = &query.name {
            builder.push(" AND name ILIKE ");
            builder.push_bind(format!("%{name}%"));
        }
        if let Some(description) = &query.description {
            builder.push(" AND description ILIKE ");
            builder.push_bind(format!("%{description}%"));
        }
        if let Some(location) = &query.location {
            builder.push(" AND location = ");
            builder.push_bind(location.clone());
        }
        if let Some(category_id) = category_id {
            builder.push(" AND category_id = ");
            builder.push_bind(category_id);
        }
        builder.push(" ORDER BY published_at DESC");

        let rows = builder.build().fetch_all(&self.pool).await?;

        products_from_rows(&rows)
    }

    /// Apply a listing patch. The category name resolves to an id as part
    /// of the same update; an unknown name fails the whole update and
    /// leaves the product unmodified.
    pub async fn update(&self, id: i32, patch: &UpdateProduct) -> ApiResult<Product> {
        let category_id = match &patch.category {
            Some(name) => Some(self.category_id_by_name(name).await?),
            None => None,
        };

        let row = sqlx::query(&format!(
            "UPDATE products SET \
             name = COALESCE($2, name), \
             brand = COALESCE($3, brand), \
             model = COALESCE($4, model), \
             price = COALESCE($5, price), \
             description = COALESCE($6, description), \
             location = COALESCE($7, location), \
             category_id = COALESCE($8, category_id) \
             WHERE id = $1 \
             RETURNING {PRODUCT_COLUMNS}"
        ))
        .bind(id)
        .bind(&patch.name)
        .bind(&patch.brand)
        .bind(&patch.model)
        .bind(patch.price)
        .bind(&patch.description)
        .bind(&patch.location)
        .bind(category_id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => product_from_row(&row),
            None => Err(ApiError::NotFound("Product not found".to_string())),
        }
    }

    /// Hard delete a listing
    pub async fn delete(&self, id: i32) -> ApiResult<()> {
        let result = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(ApiError::NotFound("Product not found".to_string()));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NewUser;
    use crate::repositories::UserRepository;
    use rust_decimal_macros::dec;

    static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!();

    async fn test_pool() -> PgPool {
        let config = common::database::DatabaseConfig::from_env().expect("database config");
        let pool = common::database::init_pool(&config).await.expect("pool");
        MIGRATOR.run(&pool).await.expect("migrations");
        pool
    }

    async fn seed_seller(pool: &PgPool) -> i32 {
        let suffix = uuid::Uuid::new_v4().simple().to_string();
        let user = UserRepository::new(pool.clone())
            .create(&NewUser {
                username: format!("vendedora_{}", &suffix[..8]),
                first_name: "Ana".to_string(),
                last_name: "Test".to_string(),
                second_last_name: None,
                email: format!("ana+{suffix}@example.com"),
                password: "contraseñaSegura123".to_string(),
                location: Some("Madrid".to_string()),
            })
            .await
            .expect("create seller");
        user.id
    }

    async fn seed_category(pool: &PgPool) -> String {
        let name = format!("Deportes {}", uuid::Uuid::new_v4().simple());
        sqlx::query("INSERT INTO categories (name) VALUES ($1)")
            .bind(&name)
            .execute(pool)
            .await
            .expect("seed category");
        name
    }

    async fn seed_product(pool: &PgPool, repo: &ProductRepository) -> Product {
        let seller_id = seed_seller(pool).await;
        let category = seed_category(pool).await;
        repo.create(
            &NewProduct {
                name: "Raqueta".to_string(),
                brand: "Wilson".to_string(),
                model: "Pro Staff".to_string(),
                price: dec!(90),
                description: Some("Poco uso".to_string()),
                location: "Valencia".to_string(),
                category,
            },
            seller_id,
        )
        .await
        .expect("create product")
    }

    #[tokio::test]
    #[ignore = "requires a running Postgres instance"]
    async fn price_only_patch_leaves_other_fields_untouched() {
        let pool = test_pool().await;
        let repo = ProductRepository::new(pool.clone());
        let product = seed_product(&pool, &repo).await;

        let updated = repo
            .update(
                product.id,
                &UpdateProduct {
                    price: Some(dec!(150)),
                    ..Default::default()
                },
            )
            .await
            .expect("update");

        assert_eq!(updated.price, dec!(150));
        assert_eq!(updated.name, product.name);
        assert_eq!(updated.brand, product.brand);
        assert_eq!(updated.location, product.location);
        assert_eq!(updated.description, product.description);
        assert_eq!(updated.category_id, product.category_id);
    }

    #[tokio::test]
    #[ignore = "requires a running Postgres instance"]
    async fn explicit_empty_string_is_applied() {
        let pool = test_pool().await;
        let repo = ProductRepository::new(pool.clone());
        let product = seed_product(&pool, &repo).await;

        let updated = repo
            .update(
                product.id,
                &UpdateProduct {
                    description: Some(String::new()),
                    ..Default::default()
                },
            )
            .await
            .expect("update");

        assert_eq!(updated.description.as_deref(), Some(""));
        assert_eq!(updated.name, product.name);
    }

    #[tokio::test]
    #[ignore = "requires a running Postgres instance"]
    async fn unknown_category_fails_and_changes_nothing() {
        let pool = test_pool().await;
        let repo = ProductRepository::new(pool.clone());
        let product = seed_product(&pool, &repo).await;

        let result = repo
            .update(
                product.id,
                &UpdateProduct {
                    name: Some("Renombrada".to_string()),
                    category: Some("Categoria inexistente".to_string()),
                    ..Default::default()
                },
            )
            .await;
        assert!(matches!(result, Err(ApiError::NotFound(_))));

        let reloaded = repo
            .find_by_id(product.id)
            .await
            .expect("find product")
            .expect("product exists");
        assert_eq!(reloaded.name, product.name);
        assert_eq!(reloaded.category_id, product.category_id);
    }

    #[tokio::test]
    #[ignore = "requires a running Postgres instance"]
    async fn updating_a_missing_product_is_not_found() {
        let pool = test_pool().await;
        let repo = ProductRepository::new(pool);

        let result = repo
            .update(
                i32::MAX,
                &UpdateProduct {
                    price: Some(dec!(10)),
                    ..Default::default()
                },
            )
            .await;
        assert!(matches!(result, Err(ApiError::NotFound(_))));
    }
}
