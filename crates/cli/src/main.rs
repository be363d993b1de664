//! Best Market Place CLI - database migrations and management tools.
//!
//! # Usage
//!
//! ```bash
//! # Run storefront database migrations
//! bm-cli migrate
//!
//! # Upsert the bundled catalog into the remote store
//! bm-cli seed products
//!
//! # Grant the admin flag to an existing customer
//! bm-cli admin promote -e admin@example.com
//! ```
//!
//! All commands read `STOREFRONT_DATABASE_URL` (or `DATABASE_URL`).

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "bm-cli")]
#[command(author, version, about = "Best Market Place CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Seed the remote store
    Seed {
        #[command(subcommand)]
        target: SeedTarget,
    },
    /// Manage admin users
    Admin {
        #[command(subcommand)]
        action: AdminAction,
    },
}

#[derive(Subcommand)]
enum SeedTarget {
    /// Upsert the bundled product catalog
    Products,
}

#[derive(Subcommand)]
enum AdminAction {
    /// Grant the admin flag to a registered user
    Promote {
        /// User email address
        #[arg(short, long)]
        email: String,

        /// Revoke the flag instead of granting it
        #[arg(long)]
        revoke: bool,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), commands::CommandError> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Seed {
            target: SeedTarget::Products,
        } => {
            commands::seed::products().await?;
        }
        Commands::Admin {
            action: AdminAction::Promote { email, revoke },
        } => commands::admin::promote(&email, !revoke).await?,
    }
    Ok(())
}
