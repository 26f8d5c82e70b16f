//! Shared test utilities for the ledger.
//!
//! This module provides common helper functions for setting up test databases
//! and creating test entities with sensible defaults.

use crate::{
    config::database::run_migrations,
    core::{product, user},
    entities,
    errors::Result,
};
use sea_orm::DatabaseConnection;

/// Creates an in-memory `SQLite` database with every migration applied.
/// This is the standard setup for all integration tests.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let db = sea_orm::Database::connect("sqlite::memory:").await?;
    run_migrations(&db).await?;
    Ok(db)
}

/// Creates a member and funds their wallet.
///
/// The starting balance goes through `update_wallet_balance`, so it also counts
/// toward lifetime spend.
pub async fn create_test_user(
    db: &DatabaseConnection,
    discord_id: i64,
    balance_cents: i64,
) -> Result<entities::user::Model> {
    user::ensure_user(db, discord_id).await?;
    if balance_cents != 0 {
        user::update_wallet_balance(db, discord_id, balance_cents).await?;
    }
    user::ensure_user(db, discord_id).await
}

/// Product fields with sensible defaults.
///
/// # Defaults
/// * `main_category`: "Test"
/// * `sub_category`: "Digital"
/// * `variant_name`: "Premium"
#[must_use]
pub fn sample_product(service_name: &str, price_cents: i64) -> product::NewProduct {
    product::NewProduct {
        main_category: "Test".to_string(),
        sub_category: "Digital".to_string(),
        service_name: service_name.to_string(),
        variant_name: "Premium".to_string(),
        price_cents,
    }
}

/// Creates an active test product from [`sample_product`].
pub async fn create_test_product(
    db: &DatabaseConnection,
    service_name: &str,
    price_cents: i64,
) -> Result<entities::product::Model> {
    product::create_product(db, sample_product(service_name, price_cents)).await
}
