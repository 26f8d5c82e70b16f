//! Core business logic - framework-agnostic wallet, catalog, order, discount and
//! ticket operations over a `SeaORM` connection.

/// Discount storage, selection and price math
pub mod discount;
/// Paged, display-ready order and wallet history
pub mod history;
/// Catalog purchases and manual orders
pub mod order;
/// Catalog products
pub mod product;
/// Support tickets
pub mod ticket;
/// Member wallets and lifetime spend
pub mod user;
/// Wallet ledger
pub mod wallet;

/// Largest `LIMIT`/`OFFSET` the `SQLite` driver binds without overflowing `i64`.
pub(crate) const MAX_ROWS: u64 = i64::MAX.unsigned_abs();
