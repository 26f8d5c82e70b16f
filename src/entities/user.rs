//! User entity - A member's wallet and lifetime spend.
//!
//! Rows are keyed internally by `id` and externally by the member's Discord
//! snowflake (`discord_id`). Balances are integer cents.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// User database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "users")]
pub struct Model {
    /// Internal row id, referenced by user-scoped discounts
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Discord user snowflake
    #[sea_orm(unique)]
    pub discord_id: i64,
    /// Spendable wallet balance in cents, never negative
    pub wallet_balance_cents: i64,
    /// Sum of every deposit, purchase and manual order in cents
    pub total_lifetime_spent_cents: i64,
    /// When the user row was first created
    pub created_at: DateTimeUtc,
    /// When the balances last changed
    pub updated_at: DateTimeUtc,
}

/// Defines relationships between User and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One user has many orders
    #[sea_orm(has_many = "super::order::Entity")]
    Orders,
    /// One user has many ledger entries
    #[sea_orm(has_many = "super::wallet_transaction::Entity")]
    WalletTransactions,
}

impl Related<super::order::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Orders.def()
    }
}

impl Related<super::wallet_transaction::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::WalletTransactions.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
