//! Wallet transaction entity - The append-only ledger of balance changes.
//!
//! Each row records a signed `amount_cents` and the `balance_after_cents` it left
//! behind, so a member's history can be read without replaying it.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Why the balance changed
#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text")]
pub enum TransactionKind {
    /// Funds added by the member
    #[sea_orm(string_value = "deposit")]
    Deposit,
    /// Catalog purchase paid from the wallet
    #[sea_orm(string_value = "purchase")]
    Purchase,
    /// Funds returned for an order
    #[sea_orm(string_value = "refund")]
    Refund,
    /// Staff correction
    #[sea_orm(string_value = "admin_adjustment")]
    AdminAdjustment,
}

impl TransactionKind {
    /// Stored representation, e.g. `"admin_adjustment"`.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Deposit => "deposit",
            Self::Purchase => "purchase",
            Self::Refund => "refund",
            Self::AdminAdjustment => "admin_adjustment",
        }
    }

    /// Whether a ledger row of this kind may carry `amount_cents`.
    #[must_use]
    pub const fn accepts(self, amount_cents: i64) -> bool {
        match self {
            Self::Deposit | Self::Refund => amount_cents > 0,
            Self::Purchase => amount_cents < 0,
            Self::AdminAdjustment => amount_cents != 0,
        }
    }
}

/// Wallet transaction database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "wallet_transactions")]
pub struct Model {
    /// Unique identifier for the ledger entry
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Discord user whose wallet changed
    pub user_discord_id: i64,
    /// Signed change in cents (negative for spending)
    pub amount_cents: i64,
    /// Wallet balance right after this entry
    pub balance_after_cents: i64,
    /// Why the balance changed
    pub transaction_type: TransactionKind,
    /// Human-readable note
    pub description: Option<String>,
    /// Order this entry paid for, if any
    pub order_id: Option<i64>,
    /// Ticket this entry relates to, if any
    pub ticket_id: Option<i64>,
    /// Free-form JSON (e.g. `{"proof": "..."}`)
    pub metadata: Option<String>,
    /// When the entry was written
    pub created_at: DateTimeUtc,
}

/// Defines relationships between `WalletTransaction` and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each entry belongs to one user
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
