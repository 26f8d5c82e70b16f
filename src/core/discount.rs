//! Discount business logic - which discounts apply to a purchase and how much they take off.
//!
//! A discount may be limited to a user, a product, a VIP tier, or any combination.
//! A limit left empty matches everything. Expired discounts are skipped by the
//! query itself, and the result is ordered so the best offer comes first.

use crate::{
    entities::{Discount, discount},
    errors::{Error, Result},
};
use chrono::{DateTime, Utc};
use sea_orm::{Condition, ConnectionTrait, QueryOrder, Set, prelude::*};
use tracing::{info, instrument};

/// Fields for a new discount.
#[derive(Debug, Clone, Default)]
pub struct NewDiscount {
    /// Limit to this internal user id (`users.id`)
    pub user_id: Option<i64>,
    /// Limit to this product
    pub product_id: Option<i64>,
    /// Limit to this VIP tier
    pub vip_tier: Option<String>,
    /// Percent off, in `(0, 100]`
    pub discount_percent: f64,
    /// Why the discount exists
    pub description: Option<String>,
    /// When the discount stops applying
    pub expires_at: Option<DateTime<Utc>>,
}

/// Creates a discount.
///
/// # Errors
/// Returns `InvalidDiscount` if the percent is not finite or outside `(0, 100]`.
#[instrument(skip(db))]
pub async fn set_discount(db: &DatabaseConnection, new: NewDiscount) -> Result<discount::Model> {
    let percent = new.discount_percent;
    if !percent.is_finite() || percent <= 0.0 || percent > 100.0 {
        return Err(Error::InvalidDiscount { percent });
    }

    let row = discount::ActiveModel {
        user_id: Set(new.user_id),
        product_id: Set(new.product_id),
        vip_tier: Set(new.vip_tier),
        discount_percent: Set(percent),
        description: Set(new.description),
        expires_at: Set(new.expires_at),
        created_at: Set(Utc::now()),
        ..Default::default()
    };
    let created = row.insert(db).await?;
    info!(discount_id = created.id, percent, "Discount created");
    Ok(created)
}

/// Null target matches anything; a set target must equal the caller's value.
fn target_matches<V>(column: discount::Column, value: Option<V>) -> Condition
where
    V: Into<sea_orm::Value>,
{
    match value {
        Some(v) => Condition::any()
            .add(column.is_null())
            .add(column.eq(v)),
        None => Condition::all().add(column.is_null()),
    }
}

/// Lists unexpired discounts whose every target matches, best first.
///
/// Ordered by `discount_percent` descending, then by `expires_at` ascending with
/// never-expiring discounts ahead of dated ones, then by id.
pub async fn get_applicable_discounts<C>(
    db: &C,
    user_id: Option<i64>,
    product_id: Option<i64>,
    vip_tier: Option<&str>,
) -> Result<Vec<discount::Model>>
where
    C: ConnectionTrait,
{
    let now = Utc::now();

    Discount::find()
        .filter(target_matches(discount::Column::UserId, user_id))
        .filter(target_matches(discount::Column::ProductId, product_id))
        .filter(target_matches(
            discount::Column::VipTier,
            vip_tier.map(str::to_string),
        ))
        .filter(
            Condition::any()
                .add(discount::Column::ExpiresAt.is_null())
                .add(discount::Column::ExpiresAt.gt(now)),
        )
        .order_by_desc(discount::Column::DiscountPercent)
        .order_by_asc(discount::Column::ExpiresAt)
        .order_by_asc(discount::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// The single best applicable discount, if any.
pub async fn best_discount<C>(
    db: &C,
    user_id: Option<i64>,
    product_id: Option<i64>,
    vip_tier: Option<&str>,
) -> Result<Option<discount::Model>>
where
    C: ConnectionTrait,
{
    Ok(get_applicable_discounts(db, user_id, product_id, vip_tier)
        .await?
        .into_iter()
        .next())
}

/// Price after taking `percent` off, rounded to the nearest cent.
///
/// Non-positive or non-finite percents leave the price unchanged; the result is
/// always within `0..=price_cents`.
#[must_use]
pub fn apply_discount(price_cents: i64, percent: f64) -> i64 {
    if !percent.is_finite() || percent <= 0.0 || price_cents <= 0 {
        return price_cents;
    }

    let factor = (100.0 - percent.min(100.0)) / 100.0;
    // Prices are far below 2^53 cents, so the round trip through f64 is exact.
    #[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
    let discounted = (price_cents as f64 * factor).round() as i64;
    discounted.clamp(0, price_cents)
}

/// Deletes a discount, returning whether a row was removed.
#[instrument(skip(db))]
pub async fn delete_discount(db: &DatabaseConnection, discount_id: i64) -> Result<bool> {
    let result = Discount::delete_by_id(discount_id).exec(db).await?;
    Ok(result.rows_affected > 0)
}

/// Removes every discount whose expiry has passed. Returns how many were removed.
#[instrument(skip(db))]
pub async fn purge_expired_discounts(db: &DatabaseConnection) -> Result<u64> {
    let result = Discount::delete_many()
        .filter(discount::Column::ExpiresAt.lte(Utc::now()))
        .exec(db)
        .await?;
    if result.rows_affected > 0 {
        info!(removed = result.rows_affected, "Purged expired discounts");
    }
    Ok(result.rows_affected)
}
