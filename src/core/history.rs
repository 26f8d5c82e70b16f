//! History views - paged order and wallet history as plain-text lines.
//!
//! This module turns raw order and ledger rows into display-ready records: product
//! names resolved (including deleted and manual products), linked tickets found,
//! money formatted. It knows nothing about how the lines are shown.

use crate::{
    core::{order, product, ticket, wallet},
    entities::{order as order_entity, ticket::TicketStatus, wallet_transaction},
    errors::Result,
};
use chrono::{DateTime, Utc};
use sea_orm::DatabaseConnection;

const MANUAL_ORDER_FALLBACK_NAME: &str = "Manual Order";

/// A 1-based page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    page: u64,
    per_page: u64,
}

impl Pagination {
    /// Builds a page request; pages below 1 become page 1.
    ///
    /// Pages are capped so that [`offset`](Self::offset) stays within the `i64`
    /// range `SQLite` accepts.
    #[must_use]
    pub fn new(page: i64, per_page: u64) -> Self {
        let per_page = per_page.max(1);
        let last_page = i64::MAX.unsigned_abs() / per_page + 1;
        Self {
            page: u64::try_from(page).unwrap_or(0).clamp(1, last_page),
            per_page,
        }
    }

    /// Requested page number, at least 1.
    #[must_use]
    pub const fn page(&self) -> u64 {
        self.page
    }

    /// Rows per page.
    #[must_use]
    pub const fn per_page(&self) -> u64 {
        self.per_page
    }

    /// Rows to skip before this page.
    #[must_use]
    pub const fn offset(&self) -> u64 {
        (self.page - 1).saturating_mul(self.per_page)
    }

    /// Number of pages needed for `total` rows.
    #[must_use]
    pub const fn total_pages(&self, total: u64) -> u64 {
        total.div_ceil(self.per_page)
    }
}

/// One page of history.
#[derive(Debug, Clone)]
pub struct HistoryPage<T> {
    /// Page number shown
    pub page: u64,
    /// Pages available
    pub total_pages: u64,
    /// Rows across all pages
    pub total_items: u64,
    /// Rows on this page
    pub items: Vec<T>,
}

impl<T> HistoryPage<T> {
    /// Whether a later page exists.
    #[must_use]
    pub const fn has_next(&self) -> bool {
        self.page < self.total_pages
    }
}

/// Ticket summary attached to an order line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TicketRef {
    /// Ticket id
    pub id: i64,
    /// Backing channel
    pub channel_id: i64,
    /// Open or closed
    pub status: TicketStatus,
}

/// Display-ready order.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderLine {
    /// Order id
    pub order_id: i64,
    /// Whether the order was entered manually
    pub is_manual: bool,
    /// Resolved product name
    pub product_name: String,
    /// Category breadcrumb for catalog products that still exist
    pub category: Option<String>,
    /// Staff notes on manual orders
    pub notes: Option<String>,
    /// Amount charged
    pub price_paid_cents: i64,
    /// Discount applied
    pub discount_applied_percent: f64,
    /// Linked support ticket
    pub ticket: Option<TicketRef>,
    /// When the order was placed
    pub created_at: DateTime<Utc>,
}

impl OrderLine {
    /// Builds a line from an order and whatever product and ticket could be found.
    #[must_use]
    pub fn new(
        order: &order_entity::Model,
        product: Option<&crate::entities::product::Model>,
        ticket: Option<&crate::entities::ticket::Model>,
    ) -> Self {
        let (product_name, category, notes) = if order.is_manual() {
            let metadata = order.manual_metadata();
            (
                metadata.as_ref().map_or_else(
                    || MANUAL_ORDER_FALLBACK_NAME.to_string(),
                    |m| m.product_name.clone(),
                ),
                None,
                metadata.and_then(|m| m.notes),
            )
        } else {
            match product {
                Some(p) => (p.display_name(), Some(p.category_path()), None),
                None => (format!("Product #{} (deleted)", order.product_id), None, None),
            }
        };

        Self {
            order_id: order.id,
            is_manual: order.is_manual(),
            product_name,
            category,
            notes,
            price_paid_cents: order.price_paid_cents,
            discount_applied_percent: order.discount_applied_percent,
            ticket: ticket.map(|t| TicketRef {
                id: t.id,
                channel_id: t.channel_id,
                status: t.status,
            }),
            created_at: order.created_at,
        }
    }

    /// Title line, e.g. `Order #12 (Manual)`.
    #[must_use]
    pub fn title(&self) -> String {
        if self.is_manual {
            format!("Order #{} (Manual)", self.order_id)
        } else {
            format!("Order #{}", self.order_id)
        }
    }

    /// Multi-line body: product, price with discount and ticket marker, date.
    #[must_use]
    pub fn render(&self) -> String {
        let mut price = format_usd(self.price_paid_cents);
        if self.discount_applied_percent > 0.0 {
            price.push_str(&format!(" ({:.1}% off)", self.discount_applied_percent));
        }
        if let Some(ticket) = &self.ticket {
            price.push_str(&format!(" [ticket #{}]", ticket.id));
        }

        let mut lines = vec![self.title(), self.product_name.clone()];
        if let Some(category) = &self.category {
            lines.push(category.clone());
        }
        lines.push(price);
        if let Some(notes) = &self.notes {
            lines.push(format!("Notes: {notes}"));
        }
        lines.push(format_timestamp(self.created_at));
        lines.join("\n")
    }
}

/// Display-ready ledger row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerLine {
    /// Ledger row id
    pub id: i64,
    /// Signed change
    pub amount_cents: i64,
    /// Title-cased kind, e.g. `Admin Adjustment`
    pub kind_label: String,
    /// Balance after the change
    pub balance_after_cents: i64,
    /// Note on the row
    pub description: Option<String>,
    /// Related order
    pub order_id: Option<i64>,
    /// Related ticket
    pub ticket_id: Option<i64>,
    /// Proof reference from metadata
    pub proof: Option<String>,
    /// When the row was written
    pub created_at: DateTime<Utc>,
}

impl From<&wallet_transaction::Model> for LedgerLine {
    fn from(row: &wallet_transaction::Model) -> Self {
        Self {
            id: row.id,
            amount_cents: row.amount_cents,
            kind_label: title_case(row.transaction_type.as_str()),
            balance_after_cents: row.balance_after_cents,
            description: row.description.clone().filter(|d| !d.trim().is_empty()),
            order_id: row.order_id,
            ticket_id: row.ticket_id,
            proof: wallet::WalletMetadata::from_json(row.metadata.as_deref()).proof,
            created_at: row.created_at,
        }
    }
}

impl LedgerLine {
    /// Multi-line body for the ledger row.
    #[must_use]
    pub fn render(&self) -> String {
        let mut lines = vec![
            format!(
                "Transaction #{} - {}",
                self.id,
                format_timestamp(self.created_at)
            ),
            format!(
                "{} ({})",
                format_signed_usd(self.amount_cents),
                self.kind_label
            ),
            format!("Balance: {}", format_usd(self.balance_after_cents)),
        ];
        if let Some(description) = &self.description {
            lines.push(description.clone());
        }
        if let Some(order_id) = self.order_id {
            lines.push(format!("Order: #{order_id}"));
        }
        if let Some(ticket_id) = self.ticket_id {
            lines.push(format!("Ticket: #{ticket_id}"));
        }
        if let Some(proof) = &self.proof {
            lines.push(format!("Proof: {proof}"));
        }
        lines.join("\n")
    }
}

/// Loads one page of a member's orders with product names and tickets resolved.
///
/// # Errors
/// Returns an error if any database query fails.
pub async fn order_history(
    db: &DatabaseConnection,
    discord_id: i64,
    pagination: Pagination,
) -> Result<HistoryPage<OrderLine>> {
    let total_items = order::count_orders_for_user(db, discord_id).await?;
    let orders = order::get_orders_for_user(
        db,
        discord_id,
        pagination.per_page(),
        pagination.offset(),
    )
    .await?;

    let mut items = Vec::with_capacity(orders.len());
    for row in &orders {
        let catalog_product = if row.is_manual() {
            None
        } else {
            product::get_product(db, row.product_id).await?
        };
        let linked_ticket = ticket::get_ticket_by_order_id(db, row.id).await?;
        items.push(OrderLine::new(
            row,
            catalog_product.as_ref(),
            linked_ticket.as_ref(),
        ));
    }

    Ok(HistoryPage {
        page: pagination.page(),
        total_pages: pagination.total_pages(total_items),
        total_items,
        items,
    })
}

/// Loads one page of a member's wallet ledger.
///
/// # Errors
/// Returns an error if any database query fails.
pub async fn wallet_history(
    db: &DatabaseConnection,
    discord_id: i64,
    pagination: Pagination,
) -> Result<HistoryPage<LedgerLine>> {
    let total_items = wallet::count_wallet_transactions(db, discord_id).await?;
    let rows = wallet::get_wallet_transactions(
        db,
        discord_id,
        pagination.per_page(),
        pagination.offset(),
    )
    .await?;

    Ok(HistoryPage {
        page: pagination.page(),
        total_pages: pagination.total_pages(total_items),
        total_items,
        items: rows.iter().map(LedgerLine::from).collect(),
    })
}

/// Formats cents as US dollars with thousands separators, e.g. `$1,234.50`.
#[must_use]
pub fn format_usd(cents: i64) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let abs = cents.unsigned_abs();
    let dollars = (abs / 100).to_string();
    let remainder = abs % 100;

    let mut grouped = String::with_capacity(dollars.len() + dollars.len() / 3);
    for (i, digit) in dollars.chars().enumerate() {
        if i > 0 && (dollars.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    format!("{sign}${grouped}.{remainder:02}")
}

/// Formats a ledger amount with an explicit sign, e.g. `+$50.00` or `-$25.50`.
#[must_use]
pub fn format_signed_usd(cents: i64) -> String {
    if cents >= 0 {
        format!("+{}", format_usd(cents))
    } else {
        format_usd(cents)
    }
}

fn format_timestamp(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%d %H:%M UTC").to_string()
}

/// `admin_adjustment` -> `Admin Adjustment`.
fn title_case(snake: &str) -> String {
    snake
        .split('_')
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            chars.next().map_or_else(String::new, |first| {
                first.to_uppercase().chain(chars).collect()
            })
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{order::create_manual_order, order::purchase_product, ticket::create_ticket};
    use crate::entities::{Product, wallet_transaction::TransactionKind};
    use crate::test_utils::*;
    use sea_orm::EntityTrait;

    #[test]
    fn test_pagination_clamps_and_counts() {
        let first = Pagination::new(0, 10);
        assert_eq!(first.page(), 1);
        assert_eq!(first.offset(), 0);

        let negative = Pagination::new(-3, 10);
        assert_eq!(negative.page(), 1);

        let third = Pagination::new(3, 10);
        assert_eq!(third.offset(), 20);
        assert_eq!(third.total_pages(0), 0);
        assert_eq!(third.total_pages(10), 1);
        assert_eq!(third.total_pages(21), 3);

        let huge = Pagination::new(i64::MAX, 10);
        assert!(huge.offset() <= i64::MAX.unsigned_abs());
        assert_eq!(Pagination::new(i64::MAX, 1).offset(), i64::MAX.unsigned_abs());
    }

    #[test]
    fn test_format_usd() {
        assert_eq!(format_usd(0), "$0.00");
        assert_eq!(format_usd(5), "$0.05");
        assert_eq!(format_usd(123_456), "$1,234.56");
        assert_eq!(format_usd(100_000_000), "$1,000,000.00");
        assert_eq!(format_usd(-2_550), "-$25.50");
        assert_eq!(format_signed_usd(5_000), "+$50.00");
        assert_eq!(format_signed_usd(-1), "-$0.01");
    }

    #[test]
    fn test_title_case() {
        assert_eq!(title_case("admin_adjustment"), "Admin Adjustment");
        assert_eq!(title_case("deposit"), "Deposit");
    }

    #[tokio::test]
    async fn test_order_history_resolves_names() -> Result<()> {
        let db = setup_test_db().await?;
        create_test_user(&db, 50, 5_000).await?;
        let kept = create_test_product(&db, "Kept", 1_000).await?;
        let doomed = create_test_product(&db, "Doomed", 500).await?;

        let (kept_order, _) = purchase_product(&db, 50, kept.id, 900, 10.0, None).await?;
        let (doomed_order, _) = purchase_product(&db, 50, doomed.id, 500, 0.0, None).await?;
        let (manual_order, _) =
            create_manual_order(&db, 50, "Consulting", 2_000, Some("Call".to_string())).await?;
        create_ticket(&db, 50, 700, "order", Some(kept_order)).await?;

        Product::delete_by_id(doomed.id).exec(&db).await?;

        let page = order_history(&db, 50, Pagination::new(1, 10)).await?;
        assert_eq!(page.total_items, 3);
        assert_eq!(page.total_pages, 1);
        assert!(!page.has_next());

        let by_id = |id: i64| page.items.iter().find(|line| line.order_id == id);

        let kept_line = by_id(kept_order).ok_or(crate::errors::Error::OrderNotFound {
            order_id: kept_order,
        })?;
        assert_eq!(kept_line.product_name, "Kept - Premium");
        assert_eq!(kept_line.category.as_deref(), Some("Test > Digital"));
        assert!(kept_line.ticket.is_some());
        assert!(kept_line.render().contains("$9.00 (10.0% off) [ticket #"));

        let doomed_line = by_id(doomed_order).ok_or(crate::errors::Error::OrderNotFound {
            order_id: doomed_order,
        })?;
        assert_eq!(
            doomed_line.product_name,
            format!("Product #{} (deleted)", doomed.id)
        );

        let manual_line = by_id(manual_order).ok_or(crate::errors::Error::OrderNotFound {
            order_id: manual_order,
        })?;
        assert!(manual_line.is_manual);
        assert_eq!(manual_line.product_name, "Consulting");
        assert_eq!(manual_line.notes.as_deref(), Some("Call"));
        assert!(manual_line.title().ends_with("(Manual)"));

        Ok(())
    }

    #[tokio::test]
    async fn test_order_history_paging() -> Result<()> {
        let db = setup_test_db().await?;
        for _ in 0..3 {
            create_manual_order(&db, 60, "Item", 100, None).await?;
        }

        let first = order_history(&db, 60, Pagination::new(1, 2)).await?;
        assert_eq!(first.items.len(), 2);
        assert_eq!(first.total_pages, 2);
        assert!(first.has_next());

        let beyond = order_history(&db, 60, Pagination::new(5, 2)).await?;
        assert!(beyond.items.is_empty());
        assert_eq!(beyond.total_items, 3);

        let far = order_history(&db, 60, Pagination::new(i64::MAX, 10)).await?;
        assert!(far.items.is_empty());
        assert_eq!(far.total_items, 3);
        assert!(!far.has_next());

        let far_ledger = wallet_history(&db, 60, Pagination::new(i64::MAX, 1)).await?;
        assert!(far_ledger.items.is_empty());

        Ok(())
    }

    #[test]
    fn test_manual_line_with_bad_metadata_falls_back() {
        let row = order_entity::Model {
            id: 1,
            user_discord_id: 1,
            product_id: 0,
            price_paid_cents: 100,
            discount_applied_percent: 0.0,
            order_metadata: Some("{broken".to_string()),
            created_at: Utc::now(),
        };
        let line = OrderLine::new(&row, None, None);
        assert_eq!(line.product_name, "Manual Order");
        assert!(line.notes.is_none());
    }

    #[tokio::test]
    async fn test_wallet_history_lines() -> Result<()> {
        let db = setup_test_db().await?;
        wallet::credit_wallet(
            &db,
            70,
            2_500,
            TransactionKind::Deposit,
            Some("Top-up".to_string()),
            Some("receipt-9".to_string()),
        )
        .await?;
        wallet::credit_wallet(&db, 70, -500, TransactionKind::AdminAdjustment, None, None).await?;

        let page = wallet_history(&db, 70, Pagination::new(1, 10)).await?;
        assert_eq!(page.total_items, 2);

        let adjustment = &page.items[0];
        assert_eq!(adjustment.kind_label, "Admin Adjustment");
        assert_eq!(adjustment.amount_cents, -500);
        assert!(adjustment.render().contains("-$5.00 (Admin Adjustment)"));
        assert!(adjustment.render().contains("Balance: $20.00"));

        let deposit = &page.items[1];
        assert_eq!(deposit.proof.as_deref(), Some("receipt-9"));
        assert!(deposit.render().contains("Proof: receipt-9"));
        assert!(deposit.render().contains("+$25.00 (Deposit)"));

        Ok(())
    }
}
