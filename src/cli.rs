//! Operator command line - wallet, catalog, order, discount and ticket administration.

use apex_core::{
    config::{AppConfig, database},
    core::{
        discount::{self, NewDiscount},
        history::{self, Pagination, format_usd},
        order, product, ticket, user, wallet,
    },
    entities::wallet_transaction::TransactionKind,
    errors::{Error, Result},
};
use chrono::{Duration, Utc};
use clap::{Parser, Subcommand};
use sea_orm::DatabaseConnection;

#[derive(Parser, Debug)]
#[command(
    name = "apex-core",
    version,
    about = "Wallet ledger for the community shop",
    long_about = "Manage member wallets, the product catalog, orders, discounts and \
                  support tickets stored in the shop database."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Apply pending schema migrations and print the schema version
    Migrate,
    /// Add funds to a member's wallet
    Deposit {
        /// Member's Discord user id
        #[arg(long)]
        user: i64,
        /// Amount in cents
        #[arg(long)]
        amount_cents: i64,
        #[arg(long)]
        description: Option<String>,
        /// Payment receipt reference
        #[arg(long)]
        proof: Option<String>,
    },
    /// Correct a member's balance (negative to debit)
    Adjust {
        #[arg(long)]
        user: i64,
        #[arg(long, allow_hyphen_values = true)]
        amount_cents: i64,
        #[arg(long)]
        description: Option<String>,
    },
    /// Show a member's wallet balance and lifetime spend
    Balance {
        #[arg(long)]
        user: i64,
    },
    /// Buy a catalog product from the member's wallet, applying the best discount
    Buy {
        #[arg(long)]
        user: i64,
        #[arg(long)]
        product: i64,
    },
    /// Record a sale made outside the wallet
    ManualOrder {
        #[arg(long)]
        user: i64,
        /// What was sold
        #[arg(long)]
        name: String,
        #[arg(long)]
        price_cents: i64,
        #[arg(long)]
        notes: Option<String>,
    },
    /// Show a member's order history
    Orders {
        #[arg(long)]
        user: i64,
        #[arg(long, default_value_t = 1, allow_hyphen_values = true)]
        page: i64,
    },
    /// Show a member's wallet transactions
    Transactions {
        #[arg(long)]
        user: i64,
        #[arg(long, default_value_t = 1, allow_hyphen_values = true)]
        page: i64,
    },
    /// List the active catalog
    Products,
    /// Add a catalog product
    AddProduct {
        #[arg(long)]
        main_category: String,
        #[arg(long)]
        sub_category: String,
        #[arg(long)]
        service: String,
        #[arg(long)]
        variant: String,
        #[arg(long)]
        price_cents: i64,
    },
    /// Change a product's price
    SetPrice {
        #[arg(long)]
        product: i64,
        #[arg(long)]
        price_cents: i64,
    },
    /// Stop selling a product
    RetireProduct {
        #[arg(long)]
        product: i64,
    },
    /// Create a discount; omitted targets match everyone
    Discount {
        /// Limit to this member's Discord user id
        #[arg(long)]
        user: Option<i64>,
        #[arg(long)]
        product: Option<i64>,
        /// Limit to this VIP tier name
        #[arg(long)]
        tier: Option<String>,
        #[arg(long)]
        percent: f64,
        #[arg(long)]
        description: Option<String>,
        /// Days until the discount expires
        #[arg(long)]
        expires_in_days: Option<i64>,
    },
    /// Delete expired discounts
    PurgeDiscounts,
    /// Open a support ticket
    TicketOpen {
        #[arg(long)]
        user: i64,
        #[arg(long)]
        channel: i64,
        #[arg(long, default_value = "support")]
        ticket_type: String,
        #[arg(long)]
        order: Option<i64>,
    },
    /// Close a support ticket
    TicketClose {
        #[arg(long)]
        ticket: i64,
    },
}

/// Executes one command against the database.
pub async fn run(command: Command, db: &DatabaseConnection, config: &AppConfig) -> Result<()> {
    match command {
        Command::Migrate => {
            let version = database::current_schema_version(db).await?;
            println!("Schema version: {}", version.unwrap_or_default());
        }
        Command::Deposit {
            user,
            amount_cents,
            description,
            proof,
        } => {
            let entry = wallet::credit_wallet(
                db,
                user,
                amount_cents,
                TransactionKind::Deposit,
                description,
                proof,
            )
            .await?;
            println!(
                "Deposited {} for {user}. New balance: {}",
                format_usd(amount_cents),
                format_usd(entry.balance_after_cents)
            );
        }
        Command::Adjust {
            user,
            amount_cents,
            description,
        } => {
            let entry = wallet::credit_wallet(
                db,
                user,
                amount_cents,
                TransactionKind::AdminAdjustment,
                description,
                None,
            )
            .await?;
            println!(
                "Adjusted {user} by {}. New balance: {}",
                history::format_signed_usd(amount_cents),
                format_usd(entry.balance_after_cents)
            );
        }
        Command::Balance { user } => match user::get_user(db, user).await? {
            Some(member) => {
                let tier = config
                    .vip_tier_for(member.total_lifetime_spent_cents)
                    .map_or("none", |t| t.name.as_str());
                println!("Balance: {}", format_usd(member.wallet_balance_cents));
                println!(
                    "Lifetime spend: {}",
                    format_usd(member.total_lifetime_spent_cents)
                );
                println!("VIP tier: {tier}");
            }
            None => println!("No wallet found for {user}."),
        },
        Command::Buy { user, product } => {
            let receipt = order::checkout(db, config, user, product).await?;
            println!(
                "Order #{} placed: {} (list {}, {:.1}% off). New balance: {}",
                receipt.order_id,
                format_usd(receipt.price_paid_cents),
                format_usd(receipt.list_price_cents),
                receipt.discount_applied_percent,
                format_usd(receipt.new_balance_cents)
            );
        }
        Command::ManualOrder {
            user,
            name,
            price_cents,
            notes,
        } => {
            let (order_id, lifetime) =
                order::create_manual_order(db, user, &name, price_cents, notes).await?;
            println!(
                "Manual order #{order_id} recorded. Lifetime spend: {}",
                format_usd(lifetime)
            );
        }
        Command::Orders { user, page } => {
            let pagination = Pagination::new(page, config.history_page_size);
            let view = history::order_history(db, user, pagination).await?;
            if view.items.is_empty() {
                if pagination.page() == 1 {
                    println!("No orders found for {user}.");
                } else {
                    println!("No orders on page {}.", pagination.page());
                }
                return Ok(());
            }
            println!(
                "Order history for {user}: page {} of {} ({} total orders)",
                view.page, view.total_pages, view.total_items
            );
            for line in &view.items {
                println!("\n{}", line.render());
            }
            if view.has_next() {
                println!("\nUse --page {} to see the next page", view.page + 1);
            }
        }
        Command::Transactions { user, page } => {
            let pagination = Pagination::new(page, config.history_page_size);
            let view = history::wallet_history(db, user, pagination).await?;
            if view.items.is_empty() {
                if pagination.page() == 1 {
                    println!("No wallet transactions found for {user}.");
                } else {
                    println!("No transactions on page {}.", pagination.page());
                }
                return Ok(());
            }
            println!(
                "Wallet transactions for {user}: page {} of {} ({} total transactions)",
                view.page, view.total_pages, view.total_items
            );
            for line in &view.items {
                println!("\n{}", line.render());
            }
            if view.has_next() {
                println!("\nUse --page {} to see the next page", view.page + 1);
            }
        }
        Command::Products => {
            let products = product::list_active_products(db).await?;
            if products.is_empty() {
                println!("No products have been defined yet.");
            }
            for p in products {
                println!(
                    "#{} {} | {} | {}",
                    p.id,
                    p.category_path(),
                    p.display_name(),
                    format_usd(p.price_cents)
                );
            }
        }
        Command::AddProduct {
            main_category,
            sub_category,
            service,
            variant,
            price_cents,
        } => {
            let created = product::create_product(
                db,
                product::NewProduct {
                    main_category,
                    sub_category,
                    service_name: service,
                    variant_name: variant,
                    price_cents,
                },
            )
            .await?;
            println!(
                "Product #{} added: {} at {}",
                created.id,
                created.display_name(),
                format_usd(created.price_cents)
            );
        }
        Command::SetPrice {
            product: product_id,
            price_cents,
        } => {
            let updated = product::update_product_price(db, product_id, price_cents).await?;
            println!(
                "{} now costs {}",
                updated.display_name(),
                format_usd(updated.price_cents)
            );
        }
        Command::RetireProduct {
            product: product_id,
        } => {
            let retired = product::deactivate_product(db, product_id).await?;
            println!("{} is no longer for sale", retired.display_name());
        }
        Command::Discount {
            user,
            product,
            tier,
            percent,
            description,
            expires_in_days,
        } => {
            let expires_at = match expires_in_days {
                Some(days) => Some(
                    Duration::try_days(days)
                        .and_then(|delta| Utc::now().checked_add_signed(delta))
                        .ok_or_else(|| Error::Config {
                            message: format!("Expiry of {days} days is out of range"),
                        })?,
                ),
                None => None,
            };
            // Discounts target the internal user id, not the Discord id.
            let user_id = match user {
                Some(discord_id) => Some(user::ensure_user(db, discord_id).await?.id),
                None => None,
            };
            let created = discount::set_discount(
                db,
                NewDiscount {
                    user_id,
                    product_id: product,
                    vip_tier: tier,
                    discount_percent: percent,
                    description,
                    expires_at,
                },
            )
            .await?;
            println!(
                "Discount #{} created: {:.1}% off",
                created.id, created.discount_percent
            );
        }
        Command::PurgeDiscounts => {
            let removed = discount::purge_expired_discounts(db).await?;
            println!("Removed {removed} expired discounts");
        }
        Command::TicketOpen {
            user,
            channel,
            ticket_type,
            order,
        } => {
            let opened = ticket::create_ticket(db, user, channel, &ticket_type, order).await?;
            println!("Ticket #{} opened in channel {}", opened.id, opened.channel_id);
        }
        Command::TicketClose { ticket: ticket_id } => {
            let closed = ticket::close_ticket(db, ticket_id).await?;
            println!("Ticket #{} closed", closed.id);
        }
    }

    Ok(())
}
