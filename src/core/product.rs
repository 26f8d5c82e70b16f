//! Product business logic - the catalog members buy from.
//!
//! Products are never hard-deleted: deactivating one hides it from the catalog and
//! blocks new purchases while order history keeps resolving its name.

use crate::{
    entities::{Product, product},
    errors::{Error, Result},
};
use chrono::Utc;
use sea_orm::{ConnectionTrait, QueryOrder, Set, prelude::*};
use tracing::{info, instrument};

/// Fields for a new catalog product.
#[derive(Debug, Clone)]
pub struct NewProduct {
    /// Top-level category
    pub main_category: String,
    /// Second-level category
    pub sub_category: String,
    /// Service being sold
    pub service_name: String,
    /// Variant of the service
    pub variant_name: String,
    /// List price in cents
    pub price_cents: i64,
}

fn require_name(field: &str, value: &str) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(Error::Config {
            message: format!("Product {field} cannot be empty"),
        });
    }
    Ok(trimmed.to_string())
}

/// Creates a new active product, trimming whitespace from every name.
///
/// # Errors
/// Returns an error if:
/// - Any of the four names is empty or whitespace-only
/// - The price is negative
/// - The database insert operation fails
#[instrument(skip(db))]
pub async fn create_product(db: &DatabaseConnection, new: NewProduct) -> Result<product::Model> {
    let main_category = require_name("main category", &new.main_category)?;
    let sub_category = require_name("sub category", &new.sub_category)?;
    let service_name = require_name("service name", &new.service_name)?;
    let variant_name = require_name("variant name", &new.variant_name)?;

    if new.price_cents < 0 {
        return Err(Error::InvalidAmount {
            amount_cents: new.price_cents,
        });
    }

    let now = Utc::now();
    let product = product::ActiveModel {
        main_category: Set(main_category),
        sub_category: Set(sub_category),
        service_name: Set(service_name),
        variant_name: Set(variant_name),
        price_cents: Set(new.price_cents),
        is_active: Set(true),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };
    let created = product.insert(db).await?;
    info!(product_id = created.id, name = %created.display_name(), "Product created");
    Ok(created)
}

/// Retrieves a product by id, whether or not it is still active.
pub async fn get_product<C>(db: &C, product_id: i64) -> Result<Option<product::Model>>
where
    C: ConnectionTrait,
{
    Product::find_by_id(product_id)
        .one(db)
        .await
        .map_err(Into::into)
}

/// Retrieves an active product or fails with `ProductNotFound`.
pub async fn get_active_product<C>(db: &C, product_id: i64) -> Result<product::Model>
where
    C: ConnectionTrait,
{
    get_product(db, product_id)
        .await?
        .filter(|p| p.is_active)
        .ok_or(Error::ProductNotFound { product_id })
}

/// Lists the active catalog ordered by category, service and variant.
pub async fn list_active_products(db: &DatabaseConnection) -> Result<Vec<product::Model>> {
    Product::find()
        .filter(product::Column::IsActive.eq(true))
        .order_by_asc(product::Column::MainCategory)
        .order_by_asc(product::Column::SubCategory)
        .order_by_asc(product::Column::ServiceName)
        .order_by_asc(product::Column::VariantName)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Changes the list price of an active product.
///
/// # Errors
/// Returns an error if the price is negative, the product is missing or inactive,
/// or the update fails.
#[instrument(skip(db))]
pub async fn update_product_price(
    db: &DatabaseConnection,
    product_id: i64,
    price_cents: i64,
) -> Result<product::Model> {
    if price_cents < 0 {
        return Err(Error::InvalidAmount {
            amount_cents: price_cents,
        });
    }

    let mut product: product::ActiveModel = get_active_product(db, product_id).await?.into();
    product.price_cents = Set(price_cents);
    product.updated_at = Set(Utc::now());

    product.update(db).await.map_err(Into::into)
}

/// Removes a product from sale while keeping it for order history.
///
/// # Errors
/// Returns `ProductNotFound` if the product is missing or already inactive.
#[instrument(skip(db))]
pub async fn deactivate_product(db: &DatabaseConnection, product_id: i64) -> Result<product::Model> {
    let mut product: product::ActiveModel = get_active_product(db, product_id).await?.into();
    product.is_active = Set(false);
    product.updated_at = Set(Utc::now());

    let updated = product.update(db).await?;
    info!(product_id, "Product deactivated");
    Ok(updated)
}
