//! Discount entity - A percentage off, scoped to a user, a product, a VIP tier,
//! any combination of them, or nobody in particular.
//!
//! A `None` target matches everything. Discounts with a past `expires_at` are
//! kept until purged but never applied.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Discount database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "discounts")]
pub struct Model {
    /// Unique identifier for the discount
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Internal user id (`users.id`) this discount is limited to
    pub user_id: Option<i64>,
    /// Product this discount is limited to
    pub product_id: Option<i64>,
    /// VIP tier name this discount is limited to
    pub vip_tier: Option<String>,
    /// Percent off, in `(0, 100]`
    pub discount_percent: f64,
    /// Why the discount exists
    pub description: Option<String>,
    /// Moment after which the discount no longer applies
    pub expires_at: Option<DateTimeUtc>,
    /// When the discount was created
    pub created_at: DateTimeUtc,
}

/// `Discount` targets are matched by value and carry no foreign keys
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
