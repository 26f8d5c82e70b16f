//! Wallet ledger business logic - the append-only record of balance changes.
//!
//! Every balance change that goes through this module writes a ledger row carrying
//! the balance it left behind. Reads are paged newest first for history views.

use crate::{
    core::{MAX_ROWS, user},
    entities::{WalletTransaction, wallet_transaction, wallet_transaction::TransactionKind},
    errors::{Error, Result},
};
use chrono::Utc;
use sea_orm::{
    ConnectionTrait, PaginatorTrait, QueryOrder, QuerySelect, Set, TransactionTrait, prelude::*,
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

/// Fields for a new ledger row.
#[derive(Debug, Clone)]
pub struct NewWalletTransaction {
    /// Discord user whose wallet changed
    pub user_discord_id: i64,
    /// Signed change in cents
    pub amount_cents: i64,
    /// Balance after the change
    pub balance_after_cents: i64,
    /// Why the balance changed
    pub kind: TransactionKind,
    /// Human-readable note
    pub description: Option<String>,
    /// Related order
    pub order_id: Option<i64>,
    /// Related ticket
    pub ticket_id: Option<i64>,
    /// JSON metadata
    pub metadata: Option<String>,
}

/// Structured metadata kept on ledger rows.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletMetadata {
    /// Payment receipt or screenshot reference supplied with a deposit
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proof: Option<String>,
}

impl WalletMetadata {
    /// Serializes to JSON, or `None` when there is nothing to store.
    pub fn to_json(&self) -> Result<Option<String>> {
        if self.proof.is_none() {
            return Ok(None);
        }
        Ok(Some(serde_json::to_string(self)?))
    }

    /// Parses stored metadata, ignoring anything that is not a JSON object.
    #[must_use]
    pub fn from_json(raw: Option<&str>) -> Self {
        raw.and_then(|r| serde_json::from_str(r).ok())
            .unwrap_or_default()
    }
}

/// Appends a ledger row.
///
/// # Errors
/// Returns an error if the insert fails.
pub async fn log_wallet_transaction<C>(
    db: &C,
    entry: NewWalletTransaction,
) -> Result<wallet_transaction::Model>
where
    C: ConnectionTrait,
{
    let row = wallet_transaction::ActiveModel {
        user_discord_id: Set(entry.user_discord_id),
        amount_cents: Set(entry.amount_cents),
        balance_after_cents: Set(entry.balance_after_cents),
        transaction_type: Set(entry.kind),
        description: Set(entry.description),
        order_id: Set(entry.order_id),
        ticket_id: Set(entry.ticket_id),
        metadata: Set(entry.metadata),
        created_at: Set(Utc::now()),
        ..Default::default()
    };
    row.insert(db).await.map_err(Into::into)
}

/// Changes a member's balance and records the matching ledger row in one transaction.
///
/// Deposits count toward lifetime spend; refunds and admin adjustments do not.
/// Deposits and refunds must be credits, purchases must be debits, and admin
/// adjustments may go either way.
///
/// # Errors
/// Returns an error if:
/// - `amount_cents` is zero or has the wrong sign for `kind`
/// - A debit would overdraw the wallet
/// - The balance or lifetime spend would overflow
/// - A database operation fails
#[instrument(skip(db, description, proof))]
pub async fn credit_wallet(
    db: &DatabaseConnection,
    discord_id: i64,
    amount_cents: i64,
    kind: TransactionKind,
    description: Option<String>,
    proof: Option<String>,
) -> Result<wallet_transaction::Model> {
    if !kind.accepts(amount_cents) {
        return Err(Error::InvalidAmount { amount_cents });
    }

    let metadata = WalletMetadata { proof }.to_json()?;
    let lifetime_delta = match kind {
        TransactionKind::Deposit => amount_cents.max(0),
        _ => 0,
    };

    let txn = db.begin().await?;
    user::ensure_user(&txn, discord_id).await?;
    let updated = user::apply_deltas(&txn, discord_id, amount_cents, lifetime_delta).await?;
    let entry = log_wallet_transaction(
        &txn,
        NewWalletTransaction {
            user_discord_id: discord_id,
            amount_cents,
            balance_after_cents: updated.wallet_balance_cents,
            kind,
            description,
            order_id: None,
            ticket_id: None,
            metadata,
        },
    )
    .await?;
    txn.commit().await?;

    info!(
        discord_id,
        amount_cents,
        kind = kind.as_str(),
        balance = updated.wallet_balance_cents,
        "Wallet updated"
    );
    Ok(entry)
}

/// Retrieves a page of a member's ledger, newest first.
pub async fn get_wallet_transactions(
    db: &DatabaseConnection,
    discord_id: i64,
    limit: u64,
    offset: u64,
) -> Result<Vec<wallet_transaction::Model>> {
    WalletTransaction::find()
        .filter(wallet_transaction::Column::UserDiscordId.eq(discord_id))
        .order_by_desc(wallet_transaction::Column::CreatedAt)
        .order_by_desc(wallet_transaction::Column::Id)
        .limit(limit.min(MAX_ROWS))
        .offset(offset.min(MAX_ROWS))
        .all(db)
        .await
        .map_err(Into::into)
}

/// Counts a member's ledger rows.
pub async fn count_wallet_transactions(db: &DatabaseConnection, discord_id: i64) -> Result<u64> {
    WalletTransaction::find()
        .filter(wallet_transaction::Column::UserDiscordId.eq(discord_id))
        .count(db)
        .await
        .map_err(Into::into)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::*;

    #[tokio::test]
    async fn test_credit_wallet_writes_ledger_row() -> Result<()> {
        let db = setup_test_db().await?;

        let entry = credit_wallet(
            &db,
            111,
            2_500,
            TransactionKind::Deposit,
            Some("PayPal top-up".to_string()),
            Some("receipt-42".to_string()),
        )
        .await?;

        assert_eq!(entry.amount_cents, 2_500);
        assert_eq!(entry.balance_after_cents, 2_500);
        assert_eq!(entry.transaction_type, TransactionKind::Deposit);
        assert_eq!(
            WalletMetadata::from_json(entry.metadata.as_deref()).proof,
            Some("receipt-42".to_string())
        );

        let user = user::ensure_user(&db, 111).await?;
        assert_eq!(user.total_lifetime_spent_cents, 2_500);

        Ok(())
    }

    #[tokio::test]
    async fn test_adjustment_does_not_count_as_spend() -> Result<()> {
        let db = setup_test_db().await?;

        credit_wallet(&db, 222, 1_000, TransactionKind::AdminAdjustment, None, None).await?;
        let debit =
            credit_wallet(&db, 222, -250, TransactionKind::AdminAdjustment, None, None).await?;
        assert_eq!(debit.balance_after_cents, 750);
        assert!(debit.metadata.is_none());

        let user = user::ensure_user(&db, 222).await?;
        assert_eq!(user.wallet_balance_cents, 750);
        assert_eq!(user.total_lifetime_spent_cents, 0);

        Ok(())
    }

    #[tokio::test]
    async fn test_credit_wallet_rejects_zero_and_overdraw() -> Result<()> {
        let db = setup_test_db().await?;

        let zero = credit_wallet(&db, 333, 0, TransactionKind::Deposit, None, None).await;
        assert!(matches!(zero, Err(Error::InvalidAmount { amount_cents: 0 })));

        let overdraw =
            credit_wallet(&db, 333, -1, TransactionKind::AdminAdjustment, None, None).await;
        assert!(matches!(overdraw, Err(Error::InsufficientBalance { .. })));

        // The failed debit left no ledger row behind
        assert_eq!(count_wallet_transactions(&db, 333).await?, 0);

        Ok(())
    }

    #[tokio::test]
    async fn test_credit_wallet_enforces_sign_per_kind() -> Result<()> {
        let db = setup_test_db().await?;
        credit_wallet(&db, 555, 1_000, TransactionKind::Deposit, None, None).await?;

        let negative_deposit =
            credit_wallet(&db, 555, -100, TransactionKind::Deposit, None, None).await;
        assert!(matches!(
            negative_deposit,
            Err(Error::InvalidAmount { amount_cents: -100 })
        ));

        let negative_refund =
            credit_wallet(&db, 555, -100, TransactionKind::Refund, None, None).await;
        assert!(matches!(negative_refund, Err(Error::InvalidAmount { .. })));

        let positive_purchase =
            credit_wallet(&db, 555, 100, TransactionKind::Purchase, None, None).await;
        assert!(matches!(positive_purchase, Err(Error::InvalidAmount { .. })));

        let refund = credit_wallet(&db, 555, 100, TransactionKind::Refund, None, None).await?;
        assert_eq!(refund.balance_after_cents, 1_100);
        assert_eq!(count_wallet_transactions(&db, 555).await?, 2);

        let user = user::ensure_user(&db, 555).await?;
        assert_eq!(user.total_lifetime_spent_cents, 1_000);

        Ok(())
    }

    #[tokio::test]
    async fn test_wallet_history_paging() -> Result<()> {
        let db = setup_test_db().await?;

        for amount in [100, 200, 300] {
            credit_wallet(&db, 444, amount, TransactionKind::Deposit, None, None).await?;
        }

        assert_eq!(count_wallet_transactions(&db, 444).await?, 3);

        let first_page = get_wallet_transactions(&db, 444, 2, 0).await?;
        assert_eq!(first_page.len(), 2);
        assert_eq!(first_page[0].amount_cents, 300);
        assert_eq!(first_page[1].amount_cents, 200);

        let second_page = get_wallet_transactions(&db, 444, 2, 2).await?;
        assert_eq!(second_page.len(), 1);
        assert_eq!(second_page[0].balance_after_cents, 100);

        let beyond = get_wallet_transactions(&db, 444, u64::MAX, u64::MAX).await?;
        assert!(beyond.is_empty());

        Ok(())
    }

    #[test]
    fn test_metadata_tolerates_garbage() {
        assert_eq!(WalletMetadata::from_json(Some("not json")), WalletMetadata::default());
        assert_eq!(WalletMetadata::from_json(None).proof, None);
    }
}
