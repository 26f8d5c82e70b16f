//! Product entity - A catalog entry that can be bought from the wallet.
//!
//! Products are grouped by a two-level category and identified to members by
//! service and variant name. Retired products are deactivated, never deleted,
//! so order history can still resolve them.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Product database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "products")]
pub struct Model {
    /// Unique identifier for the product
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Top-level category (e.g., "Streaming")
    pub main_category: String,
    /// Second-level category (e.g., "Video")
    pub sub_category: String,
    /// Service being sold (e.g., "Netflix")
    pub service_name: String,
    /// Variant of the service (e.g., "Premium 1 Month")
    pub variant_name: String,
    /// List price in cents
    pub price_cents: i64,
    /// Whether the product can still be bought
    pub is_active: bool,
    /// When the product was created
    pub created_at: DateTimeUtc,
    /// When the product was last modified
    pub updated_at: DateTimeUtc,
}

impl Model {
    /// Name shown to members: `"{service} - {variant}"`.
    #[must_use]
    pub fn display_name(&self) -> String {
        format!("{} - {}", self.service_name, self.variant_name)
    }

    /// Category breadcrumb: `"{main} > {sub}"`.
    #[must_use]
    pub fn category_path(&self) -> String {
        format!("{} > {}", self.main_category, self.sub_category)
    }
}

/// `Product` is referenced by orders through a plain id, not a foreign key,
/// because manual orders carry product id 0.
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
