//! Order entity - One purchase, either from the catalog or entered manually.
//!
//! Manual orders have no catalog product: their `product_id` is
//! [`MANUAL_ORDER_PRODUCT_ID`] and the product name lives in `order_metadata`.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Product id recorded for orders that are not backed by a catalog product
pub const MANUAL_ORDER_PRODUCT_ID: i64 = 0;

/// Order database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "orders")]
pub struct Model {
    /// Unique identifier for the order
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Discord user who placed the order
    pub user_discord_id: i64,
    /// Catalog product, or `0` for a manual order
    pub product_id: i64,
    /// Amount actually charged in cents, after discounts
    pub price_paid_cents: i64,
    /// Discount percent that was applied, `0.0` when none
    pub discount_applied_percent: f64,
    /// Free-form JSON attached to the order
    pub order_metadata: Option<String>,
    /// When the order was placed
    pub created_at: DateTimeUtc,
}

/// Metadata stored on manual orders.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManualOrderMetadata {
    /// Always `true`; marks the order as entered by staff
    pub manual_order: bool,
    /// What was sold
    pub product_name: String,
    /// Staff notes
    pub notes: Option<String>,
}

impl Model {
    /// Whether this order was entered manually rather than bought from the catalog.
    #[must_use]
    pub const fn is_manual(&self) -> bool {
        self.product_id == MANUAL_ORDER_PRODUCT_ID
    }

    /// Parses manual-order metadata, returning `None` when absent or malformed.
    #[must_use]
    pub fn manual_metadata(&self) -> Option<ManualOrderMetadata> {
        self.order_metadata
            .as_deref()
            .and_then(|raw| serde_json::from_str(raw).ok())
    }
}

/// Defines relationships between Order and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each order belongs to one user
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserDiscordId",
        to = "super::user::Column::DiscordId"
    )]
    User,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
