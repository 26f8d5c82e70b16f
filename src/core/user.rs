//! User wallet business logic - creating members and moving their balances.
//!
//! Balance changes are applied as a single conditional `UPDATE` so that two writers
//! can never drive a wallet below zero. Every function takes any `ConnectionTrait`,
//! which lets the order module run them inside its own database transaction.

use crate::{
    entities::{User, user},
    errors::{Error, Result},
};
use chrono::Utc;
use sea_orm::{
    ConnectionTrait, DbErr, Set,
    prelude::*,
    sea_query::{Expr, OnConflict},
};
use tracing::{debug, instrument};

/// Finds a user by Discord ID.
pub async fn get_user<C>(db: &C, discord_id: i64) -> Result<Option<user::Model>>
where
    C: ConnectionTrait,
{
    User::find()
        .filter(user::Column::DiscordId.eq(discord_id))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Returns the user row for `discord_id`, creating an empty wallet if none exists.
///
/// # Errors
/// Returns an error if the insert or the follow-up read fails.
#[instrument(skip(db))]
pub async fn ensure_user<C>(db: &C, discord_id: i64) -> Result<user::Model>
where
    C: ConnectionTrait,
{
    if let Some(existing) = get_user(db, discord_id).await? {
        return Ok(existing);
    }

    let now = Utc::now();
    let new_user = user::ActiveModel {
        discord_id: Set(discord_id),
        wallet_balance_cents: Set(0),
        total_lifetime_spent_cents: Set(0),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };

    // Another writer may have created the row between the read and the insert.
    match User::insert(new_user)
        .on_conflict(
            OnConflict::column(user::Column::DiscordId)
                .do_nothing()
                .to_owned(),
        )
        .exec_without_returning(db)
        .await
    {
        Ok(_) | Err(DbErr::RecordNotInserted) => {}
        Err(e) => return Err(e.into()),
    }
    debug!(discord_id, "Created user wallet");

    get_user(db, discord_id)
        .await?
        .ok_or(Error::UserNotFound { discord_id })
}

/// Atomically adds `balance_delta` to the wallet and `lifetime_delta` to lifetime spend.
///
/// The update only matches while the resulting balance stays non-negative and
/// neither column leaves the `i64` range.
///
/// # Errors
/// - `UserNotFound` if no row exists for `discord_id`
/// - `InsufficientBalance` if the balance would drop below zero
/// - `InvalidAmount` if either total would overflow
pub(crate) async fn apply_deltas<C>(
    db: &C,
    discord_id: i64,
    balance_delta: i64,
    lifetime_delta: i64,
) -> Result<user::Model>
where
    C: ConnectionTrait,
{
    let mut update = User::update_many()
        .col_expr(
            user::Column::WalletBalanceCents,
            Expr::col(user::Column::WalletBalanceCents).add(balance_delta),
        )
        .col_expr(
            user::Column::TotalLifetimeSpentCents,
            Expr::col(user::Column::TotalLifetimeSpentCents).add(lifetime_delta),
        )
        .col_expr(user::Column::UpdatedAt, Expr::value(Utc::now()))
        .filter(user::Column::DiscordId.eq(discord_id));

    // SQLite stores an overflowing INTEGER sum as REAL.
    if balance_delta < 0 {
        update = update.filter(
            Expr::expr(Expr::col(user::Column::WalletBalanceCents).add(balance_delta)).gte(0),
        );
    } else if balance_delta > 0 {
        update = update.filter(user::Column::WalletBalanceCents.lte(i64::MAX - balance_delta));
    }
    if lifetime_delta > 0 {
        update = update
            .filter(user::Column::TotalLifetimeSpentCents.lte(i64::MAX - lifetime_delta));
    }

    let result = update.exec(db).await?;

    let current = get_user(db, discord_id)
        .await?
        .ok_or(Error::UserNotFound { discord_id })?;

    if result.rows_affected == 0 {
        let new_balance = current.wallet_balance_cents.checked_add(balance_delta);
        if new_balance.is_some_and(|balance| balance < 0) {
            return Err(Error::InsufficientBalance {
                balance_cents: current.wallet_balance_cents,
                required_cents: balance_delta.saturating_neg(),
            });
        }
        let amount_cents = if new_balance.is_none() {
            balance_delta
        } else {
            lifetime_delta
        };
        return Err(Error::InvalidAmount { amount_cents });
    }

    Ok(current)
}

/// Adds `delta_cents` to the member's wallet, creating the member if needed.
///
/// Positive deltas also count toward lifetime spend; negative deltas never reduce it.
/// Returns the new balance.
///
/// # Errors
/// Returns `InsufficientBalance` when a negative delta exceeds the balance, and
/// `InvalidAmount` when the balance or lifetime spend would overflow. Either way
/// nothing is changed.
#[instrument(skip(db))]
pub async fn update_wallet_balance<C>(db: &C, discord_id: i64, delta_cents: i64) -> Result<i64>
where
    C: ConnectionTrait,
{
    ensure_user(db, discord_id).await?;
    let updated = apply_deltas(db, discord_id, delta_cents, delta_cents.max(0)).await?;
    Ok(updated.wallet_balance_cents)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::*;

    #[tokio::test]
    async fn test_ensure_user_creates_empty_wallet() -> Result<()> {
        let db = setup_test_db().await?;

        let user = ensure_user(&db, 12_345).await?;
        assert_eq!(user.discord_id, 12_345);
        assert_eq!(user.wallet_balance_cents, 0);
        assert_eq!(user.total_lifetime_spent_cents, 0);

        // Second call returns the same row
        let again = ensure_user(&db, 12_345).await?;
        assert_eq!(again.id, user.id);

        Ok(())
    }

    #[tokio::test]
    async fn test_get_user_missing() -> Result<()> {
        let db = setup_test_db().await?;
        assert!(get_user(&db, 999).await?.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn test_update_wallet_balance_tracks_lifetime_spend() -> Result<()> {
        let db = setup_test_db().await?;

        assert_eq!(update_wallet_balance(&db, 12_345, 500).await?, 500);
        assert_eq!(update_wallet_balance(&db, 12_345, 250).await?, 750);

        let user = get_user(&db, 12_345).await?.ok_or(Error::UserNotFound {
            discord_id: 12_345,
        })?;
        assert_eq!(user.wallet_balance_cents, 750);
        assert_eq!(user.total_lifetime_spent_cents, 750);

        Ok(())
    }

    #[tokio::test]
    async fn test_negative_delta_does_not_increase_lifetime() -> Result<()> {
        let db = setup_test_db().await?;

        update_wallet_balance(&db, 23_456, 1_000).await?;
        let balance = update_wallet_balance(&db, 23_456, -400).await?;
        assert_eq!(balance, 600);

        let user = ensure_user(&db, 23_456).await?;
        assert_eq!(user.wallet_balance_cents, 600);
        assert_eq!(user.total_lifetime_spent_cents, 1_000);

        Ok(())
    }

    #[tokio::test]
    async fn test_overdraw_rejected_and_balance_unchanged() -> Result<()> {
        let db = setup_test_db().await?;
        update_wallet_balance(&db, 34_567, 300).await?;

        let result = update_wallet_balance(&db, 34_567, -301).await;
        assert!(matches!(
            result,
            Err(Error::InsufficientBalance {
                balance_cents: 300,
                required_cents: 301
            })
        ));

        let user = ensure_user(&db, 34_567).await?;
        assert_eq!(user.wallet_balance_cents, 300);

        // Draining to exactly zero is allowed
        assert_eq!(update_wallet_balance(&db, 34_567, -300).await?, 0);

        Ok(())
    }

    #[tokio::test]
    async fn test_overflowing_credit_rejected_and_row_stays_readable() -> Result<()> {
        let db = setup_test_db().await?;
        assert_eq!(update_wallet_balance(&db, 45_678, i64::MAX).await?, i64::MAX);

        let result = update_wallet_balance(&db, 45_678, 1).await;
        assert!(matches!(result, Err(Error::InvalidAmount { amount_cents: 1 })));

        let user = ensure_user(&db, 45_678).await?;
        assert_eq!(user.wallet_balance_cents, i64::MAX);
        assert_eq!(user.total_lifetime_spent_cents, i64::MAX);

        // Debits still work and leave lifetime spend alone
        assert_eq!(update_wallet_balance(&db, 45_678, -1).await?, i64::MAX - 1);

        Ok(())
    }

    #[tokio::test]
    async fn test_lifetime_overflow_rejected() -> Result<()> {
        let db = setup_test_db().await?;
        update_wallet_balance(&db, 56_789, i64::MAX).await?;
        update_wallet_balance(&db, 56_789, -10).await?;

        // The balance has room but lifetime spend does not
        let result = update_wallet_balance(&db, 56_789, 5).await;
        assert!(matches!(result, Err(Error::InvalidAmount { amount_cents: 5 })));
        assert_eq!(ensure_user(&db, 56_789).await?.wallet_balance_cents, i64::MAX - 10);

        Ok(())
    }

    #[tokio::test]
    async fn test_minimum_delta_is_insufficient() -> Result<()> {
        let db = setup_test_db().await?;
        update_wallet_balance(&db, 67_890, i64::MAX).await?;

        let result = update_wallet_balance(&db, 67_890, i64::MIN).await;
        assert!(matches!(result, Err(Error::InsufficientBalance { .. })));
        assert_eq!(ensure_user(&db, 67_890).await?.wallet_balance_cents, i64::MAX);

        Ok(())
    }
}
