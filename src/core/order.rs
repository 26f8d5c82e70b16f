//! Order business logic - catalog purchases and manual orders.
//!
//! A catalog purchase is one database transaction: read the wallet, check the
//! product, reject insufficient funds, debit the wallet, insert the order and
//! append the ledger row. Any failure rolls the whole thing back. Manual orders are
//! entered by staff for sales made outside the wallet, so they raise lifetime spend
//! without touching the balance.

use crate::{
    config::AppConfig,
    core::{MAX_ROWS, discount, product, user, wallet},
    entities::{
        Order, order,
        order::{MANUAL_ORDER_PRODUCT_ID, ManualOrderMetadata},
        wallet_transaction::TransactionKind,
    },
    errors::{Error, Result},
};
use chrono::Utc;
use sea_orm::{
    ConnectionTrait, PaginatorTrait, QueryOrder, QuerySelect, Set, TransactionTrait, prelude::*,
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

/// Metadata written on catalog orders placed through [`checkout`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogOrderMetadata {
    /// Product price before the discount
    pub list_price_cents: i64,
    /// Discount that was applied, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discount_id: Option<i64>,
    /// VIP tier the member held at checkout
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vip_tier: Option<String>,
}

/// Outcome of a successful checkout.
#[derive(Debug, Clone, PartialEq)]
pub struct Receipt {
    /// Newly created order
    pub order_id: i64,
    /// Product price before the discount
    pub list_price_cents: i64,
    /// Amount charged
    pub price_paid_cents: i64,
    /// Discount percent applied, `0.0` when none
    pub discount_applied_percent: f64,
    /// Wallet balance after the charge
    pub new_balance_cents: i64,
}

fn validate_charge(price_paid_cents: i64, discount_applied_percent: f64) -> Result<()> {
    if price_paid_cents < 0 {
        return Err(Error::InvalidAmount {
            amount_cents: price_paid_cents,
        });
    }
    if !discount_applied_percent.is_finite() || !(0.0..=100.0).contains(&discount_applied_percent)
    {
        return Err(Error::InvalidDiscount {
            percent: discount_applied_percent,
        });
    }
    Ok(())
}

/// Buys a catalog product from the member's wallet.
///
/// Returns `(order_id, new_balance_cents)`.
///
/// # Errors
/// Returns an error, leaving wallet, orders and ledger untouched, if:
/// - The price is negative or the discount percent is outside `[0, 100]`
/// - The member has no wallet (`UserNotFound`)
/// - The product is missing or inactive (`ProductNotFound`)
/// - The balance is below the price (`InsufficientBalance`)
/// - A database operation fails
#[instrument(skip(db, order_metadata))]
pub async fn purchase_product(
    db: &DatabaseConnection,
    user_discord_id: i64,
    product_id: i64,
    price_paid_cents: i64,
    discount_applied_percent: f64,
    order_metadata: Option<String>,
) -> Result<(i64, i64)> {
    validate_charge(price_paid_cents, discount_applied_percent)?;

    // Use a transaction to ensure atomicity
    let txn = db.begin().await?;

    let buyer = user::get_user(&txn, user_discord_id)
        .await?
        .ok_or(Error::UserNotFound {
            discord_id: user_discord_id,
        })?;
    let product = product::get_active_product(&txn, product_id).await?;

    if buyer.wallet_balance_cents < price_paid_cents {
        return Err(Error::InsufficientBalance {
            balance_cents: buyer.wallet_balance_cents,
            required_cents: price_paid_cents,
        });
    }

    let updated =
        user::apply_deltas(&txn, user_discord_id, -price_paid_cents, price_paid_cents).await?;

    let order = order::ActiveModel {
        user_discord_id: Set(user_discord_id),
        product_id: Set(product_id),
        price_paid_cents: Set(price_paid_cents),
        discount_applied_percent: Set(discount_applied_percent),
        order_metadata: Set(order_metadata),
        created_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    wallet::log_wallet_transaction(
        &txn,
        wallet::NewWalletTransaction {
            user_discord_id,
            amount_cents: -price_paid_cents,
            balance_after_cents: updated.wallet_balance_cents,
            kind: TransactionKind::Purchase,
            description: Some(format!("Purchase: {}", product.display_name())),
            order_id: Some(order.id),
            ticket_id: None,
            metadata: None,
        },
    )
    .await?;

    // Commit the transaction
    txn.commit().await?;

    info!(
        order_id = order.id,
        user_discord_id,
        product_id,
        price_paid_cents,
        balance = updated.wallet_balance_cents,
        "Purchase completed"
    );
    Ok((order.id, updated.wallet_balance_cents))
}

/// Prices a product for a member and buys it.
///
/// The member's VIP tier is derived from their lifetime spend using the tiers in
/// `config`. The best applicable discount for the member, product and tier is
/// applied before the purchase.
///
/// # Errors
/// Same as [`purchase_product`].
#[instrument(skip(db, config))]
pub async fn checkout(
    db: &DatabaseConnection,
    config: &AppConfig,
    user_discord_id: i64,
    product_id: i64,
) -> Result<Receipt> {
    let buyer = user::get_user(db, user_discord_id)
        .await?
        .ok_or(Error::UserNotFound {
            discord_id: user_discord_id,
        })?;
    let product = product::get_active_product(db, product_id).await?;
    let vip_tier = config
        .vip_tier_for(buyer.total_lifetime_spent_cents)
        .map(|tier| tier.name.clone());

    let best = discount::best_discount(
        db,
        Some(buyer.id),
        Some(product.id),
        vip_tier.as_deref(),
    )
    .await?;
    let percent = best.as_ref().map_or(0.0, |d| d.discount_percent);
    let price_paid_cents = discount::apply_discount(product.price_cents, percent);

    let metadata = serde_json::to_string(&CatalogOrderMetadata {
        list_price_cents: product.price_cents,
        discount_id: best.as_ref().map(|d| d.id),
        vip_tier,
    })?;

    let (order_id, new_balance_cents) = purchase_product(
        db,
        user_discord_id,
        product.id,
        price_paid_cents,
        percent,
        Some(metadata),
    )
    .await?;

    Ok(Receipt {
        order_id,
        list_price_cents: product.price_cents,
        price_paid_cents,
        discount_applied_percent: percent,
        new_balance_cents,
    })
}

/// Records a sale made outside the wallet.
///
/// Creates the member if needed, inserts an order with product id `0` and manual
/// metadata, and adds the price to lifetime spend. The wallet balance is unchanged.
/// Returns `(order_id, new_lifetime_spent_cents)`.
///
/// # Errors
/// Returns an error if the product name is blank, the price is negative, or a
/// database operation fails.
#[instrument(skip(db, notes))]
pub async fn create_manual_order(
    db: &DatabaseConnection,
    user_discord_id: i64,
    product_name: &str,
    price_paid_cents: i64,
    notes: Option<String>,
) -> Result<(i64, i64)> {
    let product_name = product_name.trim();
    if product_name.is_empty() {
        return Err(Error::Config {
            message: "Manual order product name cannot be empty".to_string(),
        });
    }
    validate_charge(price_paid_cents, 0.0)?;

    let metadata = serde_json::to_string(&ManualOrderMetadata {
        manual_order: true,
        product_name: product_name.to_string(),
        notes,
    })?;

    let txn = db.begin().await?;
    user::ensure_user(&txn, user_discord_id).await?;
    let updated = user::apply_deltas(&txn, user_discord_id, 0, price_paid_cents).await?;

    let order = order::ActiveModel {
        user_discord_id: Set(user_discord_id),
        product_id: Set(MANUAL_ORDER_PRODUCT_ID),
        price_paid_cents: Set(price_paid_cents),
        discount_applied_percent: Set(0.0),
        order_metadata: Set(Some(metadata)),
        created_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(&txn)
    .await?;
    txn.commit().await?;

    info!(
        order_id = order.id,
        user_discord_id,
        price_paid_cents,
        "Manual order recorded"
    );
    Ok((order.id, updated.total_lifetime_spent_cents))
}

/// Retrieves an order by id.
pub async fn get_order<C>(db: &C, order_id: i64) -> Result<Option<order::Model>>
where
    C: ConnectionTrait,
{
    Order::find_by_id(order_id).one(db).await.map_err(Into::into)
}

/// Retrieves a page of a member's orders, newest first.
pub async fn get_orders_for_user(
    db: &DatabaseConnection,
    user_discord_id: i64,
    limit: u64,
    offset: u64,
) -> Result<Vec<order::Model>> {
    Order::find()
        .filter(order::Column::UserDiscordId.eq(user_discord_id))
        .order_by_desc(order::Column::CreatedAt)
        .order_by_desc(order::Column::Id)
        .limit(limit.min(MAX_ROWS))
        .offset(offset.min(MAX_ROWS))
        .all(db)
        .await
        .map_err(Into::into)
}

/// Counts a member's orders.
pub async fn count_orders_for_user(db: &DatabaseConnection, user_discord_id: i64) -> Result<u64> {
    Order::find()
        .filter(order::Column::UserDiscordId.eq(user_discord_id))
        .count(db)
        .await
        .map_err(Into::into)
}
