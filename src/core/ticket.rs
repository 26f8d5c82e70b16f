//! Ticket business logic - support channels and the orders they are about.

use crate::{
    core::{order, user},
    entities::{Ticket, ticket, ticket::TicketStatus},
    errors::{Error, Result},
};
use chrono::Utc;
use sea_orm::{ConnectionTrait, QueryOrder, Set, prelude::*};
use tracing::{info, instrument};

/// Opens a ticket for a member in `channel_id`, optionally tied to an order.
///
/// # Errors
/// Returns an error if the ticket type is blank, the order does not exist, or the
/// channel already backs a ticket.
#[instrument(skip(db))]
pub async fn create_ticket(
    db: &DatabaseConnection,
    user_discord_id: i64,
    channel_id: i64,
    ticket_type: &str,
    order_id: Option<i64>,
) -> Result<ticket::Model> {
    let ticket_type = ticket_type.trim();
    if ticket_type.is_empty() {
        return Err(Error::Config {
            message: "Ticket type cannot be empty".to_string(),
        });
    }
    if let Some(order_id) = order_id {
        order::get_order(db, order_id)
            .await?
            .ok_or(Error::OrderNotFound { order_id })?;
    }

    user::ensure_user(db, user_discord_id).await?;

    let created = ticket::ActiveModel {
        user_discord_id: Set(user_discord_id),
        channel_id: Set(channel_id),
        ticket_type: Set(ticket_type.to_string()),
        status: Set(TicketStatus::Open),
        order_id: Set(order_id),
        created_at: Set(Utc::now()),
        closed_at: Set(None),
        ..Default::default()
    }
    .insert(db)
    .await?;
    info!(ticket_id = created.id, channel_id, "Ticket opened");
    Ok(created)
}

/// Retrieves a ticket by id.
pub async fn get_ticket<C>(db: &C, ticket_id: i64) -> Result<Option<ticket::Model>>
where
    C: ConnectionTrait,
{
    Ticket::find_by_id(ticket_id)
        .one(db)
        .await
        .map_err(Into::into)
}

/// Finds the most recent ticket linked to an order.
pub async fn get_ticket_by_order_id(
    db: &DatabaseConnection,
    order_id: i64,
) -> Result<Option<ticket::Model>> {
    Ticket::find()
        .filter(ticket::Column::OrderId.eq(order_id))
        .order_by_desc(ticket::Column::Id)
        .one(db)
        .await
        .map_err(Into::into)
}

/// Finds the ticket backed by a channel.
pub async fn get_ticket_by_channel(
    db: &DatabaseConnection,
    channel_id: i64,
) -> Result<Option<ticket::Model>> {
    Ticket::find()
        .filter(ticket::Column::ChannelId.eq(channel_id))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Finds a member's most recent open ticket.
pub async fn get_open_ticket_for_user(
    db: &DatabaseConnection,
    user_discord_id: i64,
) -> Result<Option<ticket::Model>> {
    Ticket::find()
        .filter(ticket::Column::UserDiscordId.eq(user_discord_id))
        .filter(ticket::Column::Status.eq(TicketStatus::Open))
        .order_by_desc(ticket::Column::Id)
        .one(db)
        .await
        .map_err(Into::into)
}

/// Points an existing ticket at an order.
///
/// # Errors
/// Returns `TicketNotFound` or `OrderNotFound` if either side is missing.
#[instrument(skip(db))]
pub async fn link_ticket_to_order(
    db: &DatabaseConnection,
    ticket_id: i64,
    order_id: i64,
) -> Result<ticket::Model> {
    let existing = get_ticket(db, ticket_id)
        .await?
        .ok_or_else(|| Error::TicketNotFound {
            reference: ticket_id.to_string(),
        })?;
    order::get_order(db, order_id)
        .await?
        .ok_or(Error::OrderNotFound { order_id })?;

    let mut active: ticket::ActiveModel = existing.into();
    active.order_id = Set(Some(order_id));
    active.update(db).await.map_err(Into::into)
}

/// Closes a ticket. Closing an already closed ticket returns it unchanged.
///
/// # Errors
/// Returns `TicketNotFound` if there is no such ticket.
#[instrument(skip(db))]
pub async fn close_ticket(db: &DatabaseConnection, ticket_id: i64) -> Result<ticket::Model> {
    let existing = get_ticket(db, ticket_id)
        .await?
        .ok_or_else(|| Error::TicketNotFound {
            reference: ticket_id.to_string(),
        })?;
    if existing.status == TicketStatus::Closed {
        return Ok(existing);
    }

    let mut active: ticket::ActiveModel = existing.into();
    active.status = Set(TicketStatus::Closed);
    active.closed_at = Set(Some(Utc::now()));
    let closed = active.update(db).await?;
    info!(ticket_id, "Ticket closed");
    Ok(closed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::order::create_manual_order;
    use crate::test_utils::*;

    #[tokio::test]
    async fn test_create_ticket_and_lookup() -> Result<()> {
        let db = setup_test_db().await?;
        let (order_id, _) = create_manual_order(&db, 10, "Setup", 500, None).await?;

        let ticket = create_ticket(&db, 10, 900_001, "order", Some(order_id)).await?;
        assert_eq!(ticket.status, TicketStatus::Open);
        assert!(ticket.closed_at.is_none());

        let by_order = get_ticket_by_order_id(&db, order_id).await?;
        assert_eq!(by_order.map(|t| t.id), Some(ticket.id));

        let by_channel = get_ticket_by_channel(&db, 900_001).await?;
        assert_eq!(by_channel.map(|t| t.id), Some(ticket.id));

        let open = get_open_ticket_for_user(&db, 10).await?;
        assert_eq!(open.map(|t| t.id), Some(ticket.id));

        Ok(())
    }

    #[tokio::test]
    async fn test_create_ticket_validation() -> Result<()> {
        let db = setup_test_db().await?;

        let blank = create_ticket(&db, 10, 1, " ", None).await;
        assert!(matches!(blank, Err(Error::Config { .. })));

        let unknown_order = create_ticket(&db, 10, 1, "order", Some(404)).await;
        assert!(matches!(
            unknown_order,
            Err(Error::OrderNotFound { order_id: 404 })
        ));

        create_ticket(&db, 10, 1, "support", None).await?;
        let duplicate_channel = create_ticket(&db, 11, 1, "support", None).await;
        assert!(matches!(duplicate_channel, Err(Error::Database(_))));

        Ok(())
    }

    #[tokio::test]
    async fn test_link_and_close_ticket() -> Result<()> {
        let db = setup_test_db().await?;
        let ticket = create_ticket(&db, 20, 900_002, "support", None).await?;
        let (order_id, _) = create_manual_order(&db, 20, "Fix", 100, None).await?;

        let linked = link_ticket_to_order(&db, ticket.id, order_id).await?;
        assert_eq!(linked.order_id, Some(order_id));

        let missing = link_ticket_to_order(&db, 999, order_id).await;
        assert!(matches!(missing, Err(Error::TicketNotFound { .. })));

        let closed = close_ticket(&db, ticket.id).await?;
        assert_eq!(closed.status, TicketStatus::Closed);
        assert!(closed.closed_at.is_some());
        assert!(get_open_ticket_for_user(&db, 20).await?.is_none());

        // Closing again is a no-op
        let again = close_ticket(&db, ticket.id).await?;
        assert_eq!(again.closed_at, closed.closed_at);

        Ok(())
    }
}
