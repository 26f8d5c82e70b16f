//! Ticket entity - A support channel opened for a member, optionally tied to an order.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Lifecycle state of a ticket
#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text")]
pub enum TicketStatus {
    /// Channel is live
    #[sea_orm(string_value = "open")]
    Open,
    /// Channel has been closed
    #[sea_orm(string_value = "closed")]
    Closed,
}

/// Ticket database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "tickets")]
pub struct Model {
    /// Unique identifier for the ticket
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Discord user the ticket belongs to
    pub user_discord_id: i64,
    /// Discord channel backing the ticket
    #[sea_orm(unique)]
    pub channel_id: i64,
    /// Kind of ticket (e.g., `"support"`, `"order"`)
    pub ticket_type: String,
    /// Open or closed
    pub status: TicketStatus,
    /// Order this ticket is about, if any
    pub order_id: Option<i64>,
    /// When the ticket was opened
    pub created_at: DateTimeUtc,
    /// When the ticket was closed
    pub closed_at: Option<DateTimeUtc>,
}

/// Defines relationships between Ticket and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// A ticket may refer to one order
    #[sea_orm(
        belongs_to = "super::order::Entity",
        from = "Column::OrderId",
        to = "super::order::Column::Id"
    )]
    Order,
}

impl Related<super::order::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Order.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
