//! Entity module - Contains all SeaORM entity definitions for the database.
//! These entities represent the database tables and their relationships.
//! Each entity has a Model struct for data and an Entity struct for operations.

pub mod discount;
pub mod order;
pub mod product;
pub mod schema_migration;
pub mod ticket;
pub mod user;
pub mod wallet_transaction;

// Re-export specific types to avoid conflicts
pub use discount::{Column as DiscountColumn, Entity as Discount, Model as DiscountModel};
pub use order::{Column as OrderColumn, Entity as Order, Model as OrderModel};
pub use product::{Column as ProductColumn, Entity as Product, Model as ProductModel};
pub use schema_migration::{Entity as SchemaMigration, Model as SchemaMigrationModel};
pub use ticket::{Column as TicketColumn, Entity as Ticket, Model as TicketModel};
pub use user::{Column as UserColumn, Entity as User, Model as UserModel};
pub use wallet_transaction::{
    Column as WalletTransactionColumn, Entity as WalletTransaction,
    Model as WalletTransactionModel,
};
