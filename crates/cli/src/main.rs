//! SDCart CLI - Session, cart and catalog from the terminal.
//!
//! # Usage
//!
//! ```bash
//! # Sign in (password is read from SDCART_PASSWORD or prompted)
//! sdcart login -e asha@example.com
//!
//! # Work with the cart
//! sdcart cart show
//! sdcart cart add 42 --quantity 2
//! sdcart cart remove 7 9
//! sdcart cart checkout
//!
//! # Browse the catalog
//! sdcart products search --brand Philips --max-price 2000
//! ```
//!
//! # Environment Variables
//!
//! - `SDCART_STATE_FILE` - Where the session is kept (default: `.sdcart/session.json`)
//! - `SDCART_API_URL`, `SDCART_REQUEST_TIMEOUT_SECS`, ... - see `sdcart_client::config`
//! - `SENTRY_DSN` - Enables error reporting
//! - `RUST_LOG` - Log filter (default: `sdcart_client=info,sdcart=info`)

#![cfg_attr(not(test), forbid(unsafe_code))]
// Terminal output is this binary's job.
#![allow(clippy::print_stdout, clippy::print_stderr)]

use std::num::NonZeroU32;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use sentry::integrations::tracing as sentry_tracing;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use sdcart_client::AppContext;
use sdcart_client::config::ClientConfig;
use sdcart_client::storage::FileStore;
use sdcart_core::Price;

mod commands;

use commands::CliError;

#[derive(Parser)]
#[command(name = "sdcart")]
#[command(author, version, about = "SDCart storefront client")]
struct Cli {
    /// File holding the session credential
    #[arg(
        long,
        global = true,
        env = "SDCART_STATE_FILE",
        default_value = ".sdcart/session.json"
    )]
    state_file: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign in and load the cart
    Login {
        /// Account email
        #[arg(short, long)]
        email: String,

        /// Password (prompted when absent)
        #[arg(long, env = "SDCART_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },
    /// Create an account
    Register(commands::auth::RegisterArgs),
    /// Forget the stored session
    Logout,
    /// Show the signed-in account
    Whoami,
    /// View and change the cart
    Cart {
        #[command(subcommand)]
        action: CartAction,
    },
    /// Browse the catalog
    Products {
        #[command(subcommand)]
        action: ProductAction,
    },
    /// Manage the delivery address
    Address {
        #[command(subcommand)]
        action: AddressAction,
    },
}

#[derive(Subcommand)]
enum CartAction {
    /// List cart entries and the total
    Show,
    /// Add a product (replaces the quantity of an existing entry)
    Add {
        /// Catalog product id
        product_id: String,

        /// Units to put in the cart
        #[arg(short, long, default_value = "1")]
        quantity: NonZeroU32,
    },
    /// Remove entries by cart-entry id
    Remove {
        /// Cart-entry ids, as shown by `cart show`
        #[arg(required = true)]
        ids: Vec<i64>,
    },
    /// Empty the cart
    Clear,
    /// Place the order and empty the cart
    Checkout,
}

#[derive(Subcommand)]
enum ProductAction {
    /// List every product
    List,
    /// Show one product
    Show {
        /// Product id
        id: String,
    },
    /// Save a product image to a file
    Image {
        /// Product id
        id: String,

        /// Output file
        #[arg(short, long)]
        out: PathBuf,
    },
    /// List the products in a category
    Category {
        /// Category name
        name: String,
    },
    /// Search by brand, category and price range
    Search {
        /// Free-text query
        #[arg(long)]
        query: Option<String>,

        #[arg(long)]
        brand: Option<String>,

        #[arg(long)]
        category: Option<String>,

        /// Lowest price, inclusive
        #[arg(long)]
        min_price: Option<Price>,

        /// Highest price, inclusive
        #[arg(long)]
        max_price: Option<Price>,
    },
}

#[derive(Subcommand)]
enum AddressAction {
    /// Show the saved address
    Show,
    /// Add an address, or update one with --id
    Set(commands::address::AddressArgs),
    /// Delete an address
    Delete {
        /// Address id
        id: i64,
    },
}

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &ClientConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry.dsn.as_ref()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            environment: config
                .sentry
                .environment
                .clone()
                .map(std::borrow::Cow::Owned),
            attach_stacktrace: true,
            ..Default::default()
        },
    ));

    Some(guard)
}

/// Filter tracing events to Sentry event types.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR => sentry_tracing::EventFilter::Event,
        tracing::Level::WARN | tracing::Level::INFO => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = ClientConfig::from_env();

    // Sentry must be initialized before the tracing subscriber
    let _sentry_guard = config.as_ref().ok().and_then(init_sentry);

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "sdcart_client=info,sdcart=info".into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();

    let result = match config {
        Ok(config) => run(cli, config).await,
        Err(e) => Err(CliError::from(sdcart_client::ClientError::from(e))),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) if e.requires_login() => {
            eprintln!("{e}. Run `sdcart login` to sign in.");
            ExitCode::FAILURE
        }
        Err(e) => {
            tracing::error!("Command failed: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli, config: ClientConfig) -> Result<(), CliError> {
    let store = Arc::new(FileStore::new(cli.state_file));
    let context = AppContext::new(config, store)?;

    match cli.command {
        Commands::Login { email, password } => {
            commands::auth::login(&context, &email, password).await?;
        }
        Commands::Register(args) => commands::auth::register(&context, args).await?,
        Commands::Logout => commands::auth::logout(&context),
        Commands::Whoami => commands::auth::whoami(&context).await?,
        Commands::Cart { action } => match action {
            CartAction::Show => commands::cart::show(&context).await?,
            CartAction::Add {
                product_id,
                quantity,
            } => commands::cart::add(&context, product_id, quantity).await?,
            CartAction::Remove { ids } => commands::cart::remove(&context, &ids).await?,
            CartAction::Clear => commands::cart::clear(&context).await?,
            CartAction::Checkout => commands::cart::checkout(&context).await?,
        },
        Commands::Products { action } => match action {
            ProductAction::List => commands::catalog::list(&context).await?,
            ProductAction::Show { id } => commands::catalog::show(&context, id).await?,
            ProductAction::Image { id, out } => {
                commands::catalog::image(&context, id, &out).await?;
            }
            ProductAction::Category { name } => {
                commands::catalog::category(&context, &name).await?;
            }
            ProductAction::Search {
                query,
                brand,
                category,
                min_price,
                max_price,
            } => {
                let query = sdcart_client::catalog::SearchQuery {
                    query,
                    brand,
                    category,
                    min_price,
                    max_price,
                };
                commands::catalog::search(&context, &query).await?;
            }
        },
        Commands::Address { action } => match action {
            AddressAction::Show => commands::address::show(&context).await?,
            AddressAction::Set(args) => commands::address::set(&context, args).await?,
            AddressAction::Delete { id } => commands::address::delete(&context, id).await?,
        },
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_cart_add_defaults_quantity() {
        let cli = Cli::try_parse_from(["sdcart", "cart", "add", "A"]).unwrap();
        let Commands::Cart {
            action: CartAction::Add { quantity, .. },
        } = cli.command
        else {
            panic!("expected a cart add command");
        };
        assert_eq!(quantity.get(), 1);
    }

    #[test]
    fn test_zero_quantity_rejected_by_parser() {
        assert!(Cli::try_parse_from(["sdcart", "cart", "add", "A", "-q", "0"]).is_err());
    }

    #[test]
    fn test_remove_requires_ids() {
        assert!(Cli::try_parse_from(["sdcart", "cart", "remove"]).is_err());
    }

    #[test]
    fn test_search_parses_prices() {
        let cli =
            Cli::try_parse_from(["sdcart", "products", "search", "--max-price", "1999.50"]).unwrap();
        let Commands::Products {
            action: ProductAction::Search { max_price, .. },
        } = cli.command
        else {
            panic!("expected a search command");
        };
        assert_eq!(max_price.map(|p| p.display()).as_deref(), Some("1999.50"));
    }
}
