//! Unified error type for the ledger and its operator CLI.

use thiserror::Error;

/// Every failure the crate can report.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration could not be loaded or is invalid
    #[error("Configuration error: {message}")]
    Config {
        /// What went wrong
        message: String,
    },

    /// Underlying database failure
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    /// Metadata could not be encoded or decoded as JSON
    #[error("Metadata error: {0}")]
    Metadata(#[from] serde_json::Error),

    /// File system failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Required environment variable missing or not unicode
    #[error("Environment variable error: {0}")]
    EnvVar(#[from] std::env::VarError),

    /// No user row for this Discord ID
    #[error("User {discord_id} not found")]
    UserNotFound {
        /// Discord snowflake that was looked up
        discord_id: i64,
    },

    /// Product missing or no longer sold
    #[error("Product {product_id} not found")]
    ProductNotFound {
        /// Product row id
        product_id: i64,
    },

    /// No order with this id
    #[error("Order {order_id} not found")]
    OrderNotFound {
        /// Order row id
        order_id: i64,
    },

    /// No ticket matching the reference
    #[error("Ticket not found: {reference}")]
    TicketNotFound {
        /// Id or channel that was looked up
        reference: String,
    },

    /// Wallet cannot cover the charge
    #[error("Insufficient balance: have {balance_cents} cents, need {required_cents} cents")]
    InsufficientBalance {
        /// Current wallet balance
        balance_cents: i64,
        /// Amount the operation needed
        required_cents: i64,
    },

    /// Amount rejected by validation
    #[error("Invalid amount: {amount_cents} cents")]
    InvalidAmount {
        /// Offending amount
        amount_cents: i64,
    },

    /// Discount percent outside `(0, 100]`
    #[error("Invalid discount percent: {percent}")]
    InvalidDiscount {
        /// Offending percent
        percent: f64,
    },
}

/// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;
