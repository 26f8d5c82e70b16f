//! Database configuration module.
//!
//! This module handles the `SQLite` connection and the versioned schema migrations.
//! Table definitions come from the entity models through `SeaORM`'s
//! `Schema::create_table_from_entity`, so the schema always matches the Rust structs.
//! Each migration is a list of statements applied inside one transaction and recorded
//! in `schema_migrations`; already-recorded versions are skipped.

use crate::entities::{
    Discount, Order, Product, SchemaMigration, Ticket, User, WalletTransaction, order, schema_migration,
    ticket, wallet_transaction,
};
use crate::errors::Result;
use sea_orm::sea_query::{Index, IndexCreateStatement, TableCreateStatement};
use sea_orm::{
    ActiveModelTrait, ConnectionTrait, Database, DatabaseConnection, DbBackend, EntityTrait,
    Schema, Set, Statement, TransactionTrait,
};
use std::collections::HashSet;
use tracing::{debug, info, instrument};

/// Environment variable holding the database URL
pub const DATABASE_URL_ENV: &str = "DATABASE_URL";

const DEFAULT_DATABASE_URL: &str = "sqlite://data/apex_core.sqlite?mode=rwc";
const DEFAULT_DATA_DIR: &str = "data";

/// One schema change, applied at most once.
struct Migration {
    version: i32,
    name: &'static str,
    statements: fn(DbBackend) -> Vec<Statement>,
}

const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "create_wallet_and_order_tables",
        statements: create_wallet_and_order_tables,
    },
    Migration {
        version: 2,
        name: "create_ticket_and_discount_tables",
        statements: create_ticket_and_discount_tables,
    },
    Migration {
        version: 3,
        name: "index_history_lookups",
        statements: index_history_lookups,
    },
];

/// Gets the database URL from environment variable or returns default `SQLite` path.
#[must_use]
pub fn get_database_url() -> String {
    std::env::var(DATABASE_URL_ENV).unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string())
}

/// Establishes a connection to the database named by `DATABASE_URL`.
///
/// Falls back to a local `SQLite` file under `data/`, creating the directory if needed.
///
/// # Errors
/// Returns an error if the data directory cannot be created or the connection fails.
pub async fn create_connection() -> Result<DatabaseConnection> {
    let database_url = get_database_url();
    if database_url == DEFAULT_DATABASE_URL {
        std::fs::create_dir_all(DEFAULT_DATA_DIR)?;
    }

    debug!("Connecting to database");
    Database::connect(&database_url).await.map_err(Into::into)
}

fn create_table<E: EntityTrait>(backend: DbBackend, entity: E) -> Statement {
    let schema = Schema::new(backend);
    let mut table: TableCreateStatement = schema.create_table_from_entity(entity);
    table.if_not_exists();
    backend.build(&table)
}

fn create_wallet_and_order_tables(backend: DbBackend) -> Vec<Statement> {
    vec![
        create_table(backend, User),
        create_table(backend, Product),
        create_table(backend, Order),
        create_table(backend, WalletTransaction),
    ]
}

fn create_ticket_and_discount_tables(backend: DbBackend) -> Vec<Statement> {
    vec![create_table(backend, Ticket), create_table(backend, Discount)]
}

fn index_history_lookups(backend: DbBackend) -> Vec<Statement> {
    let indexes: [IndexCreateStatement; 3] = [
        Index::create()
            .name("idx_orders_user_discord_id")
            .table(Order)
            .col(order::Column::UserDiscordId)
            .if_not_exists()
            .to_owned(),
        Index::create()
            .name("idx_wallet_transactions_user_discord_id")
            .table(WalletTransaction)
            .col(wallet_transaction::Column::UserDiscordId)
            .if_not_exists()
            .to_owned(),
        Index::create()
            .name("idx_tickets_order_id")
            .table(Ticket)
            .col(ticket::Column::OrderId)
            .if_not_exists()
            .to_owned(),
    ];
    indexes.iter().map(|index| backend.build(index)).collect()
}

/// Applies every migration that has not been recorded yet, oldest first.
///
/// Returns the versions applied by this call; an up-to-date database yields an
/// empty list.
///
/// # Errors
/// Returns an error if any statement fails. The failing migration is rolled back
/// and later migrations are not attempted.
#[instrument(skip(db))]
pub async fn run_migrations(db: &DatabaseConnection) -> Result<Vec<i32>> {
    let backend = db.get_database_backend();
    db.execute(create_table(backend, SchemaMigration)).await?;

    let applied: HashSet<i32> = SchemaMigration::find()
        .all(db)
        .await?
        .into_iter()
        .map(|m| m.version)
        .collect();

    let mut newly_applied = Vec::new();
    for migration in MIGRATIONS {
        if applied.contains(&migration.version) {
            continue;
        }

        let txn = db.begin().await?;
        for statement in (migration.statements)(backend) {
            txn.execute(statement).await?;
        }
        schema_migration::ActiveModel {
            version: Set(migration.version),
            name: Set(migration.name.to_string()),
            applied_at: Set(chrono::Utc::now()),
        }
        .insert(&txn)
        .await?;
        txn.commit().await?;

        info!(
            version = migration.version,
            name = migration.name,
            "Applied schema migration"
        );
        newly_applied.push(migration.version);
    }

    Ok(newly_applied)
}

/// Highest applied schema version, or `None` on an empty database.
///
/// # Errors
/// Returns an error if the `schema_migrations` table cannot be read.
pub async fn current_schema_version(db: &DatabaseConnection) -> Result<Option<i32>> {
    let versions = SchemaMigration::find().all(db).await?;
    Ok(versions.into_iter().map(|m| m.version).max())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{
        DiscountModel, OrderModel, ProductModel, TicketModel, UserModel, WalletTransactionModel,
    };
    use sea_orm::QuerySelect;

    #[tokio::test]
    async fn test_migrations_create_all_tables() -> Result<()> {
        let db = Database::connect("sqlite::memory:").await?;
        let applied = run_migrations(&db).await?;
        assert_eq!(applied, vec![1, 2, 3]);

        // Test that tables exist by querying them
        let _: Vec<UserModel> = User::find().limit(1).all(&db).await?;
        let _: Vec<ProductModel> = Product::find().limit(1).all(&db).await?;
        let _: Vec<OrderModel> = Order::find().limit(1).all(&db).await?;
        let _: Vec<WalletTransactionModel> = WalletTransaction::find().limit(1).all(&db).await?;
        let _: Vec<TicketModel> = Ticket::find().limit(1).all(&db).await?;
        let _: Vec<DiscountModel> = Discount::find().limit(1).all(&db).await?;

        Ok(())
    }

    #[tokio::test]
    async fn test_migrations_are_idempotent() -> Result<()> {
        let db = Database::connect("sqlite::memory:").await?;
        run_migrations(&db).await?;

        let second = run_migrations(&db).await?;
        assert!(second.is_empty());
        assert_eq!(current_schema_version(&db).await?, Some(3));

        Ok(())
    }

    #[tokio::test]
    async fn test_schema_version_empty_database() -> Result<()> {
        let db = Database::connect("sqlite::memory:").await?;
        let backend = db.get_database_backend();
        db.execute(create_table(backend, SchemaMigration)).await?;
        assert_eq!(current_schema_version(&db).await?, None);
        Ok(())
    }
}
