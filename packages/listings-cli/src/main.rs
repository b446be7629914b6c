use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use listings_client::{ListingQuery, ListingsClient};
use serde_json::Value;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Operator CLI for the listings provider.
#[derive(Parser)]
#[command(name = "listings", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print a currently valid client-scoped token
    Token,

    /// Fetch listings; omit --limit to walk and de-duplicate every page
    Fetch {
        /// Fetch a single page of this many records
        #[arg(long)]
        limit: Option<u32>,

        /// Offset of the single page (requires --limit)
        #[arg(long, requires = "limit")]
        offset: Option<u32>,

        /// Provider filter object, as JSON
        #[arg(long, value_parser = parse_json)]
        filter: Option<Value>,

        /// Provider sort specification, as JSON
        #[arg(long, value_parser = parse_json)]
        sort: Option<Value>,
    },

    /// Create or update a contact from a JSON file
    UpsertContact {
        /// Path to the contact JSON
        file: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,listings_client=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let client = ListingsClient::from_env().context("Failed to configure listings client")?;
    tracing::info!(client_id = client.session().client_id(), "Listings client configured");

    match cli.command {
        Command::Token => {
            let token = client
                .client_token()
                .await
                .context("Failed to obtain client token")?;
            println!("{}", token);
        }
        Command::Fetch {
            limit,
            offset,
            filter,
            sort,
        } => {
            let mut query = ListingQuery::new();
            query.filter = filter;
            query.sort = sort;
            if let Some(limit) = limit {
                query = query.page(limit, offset.unwrap_or(0));
            }

            tracing::info!(single_page = query.is_single_page(), "Fetching listings");
            let page = client
                .fetch_listings(&query)
                .await
                .context("Failed to fetch listings")?;

            println!("{}", serde_json::to_string_pretty(&page)?);
            eprintln!(
                "{}",
                format!(
                    "✓ {} listings (provider total {})",
                    page.records.len(),
                    page.total_count
                )
                .bright_green()
            );
        }
        Command::UpsertContact { file } => {
            let raw = std::fs::read_to_string(&file)
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let contact: Value = serde_json::from_str(&raw)
                .with_context(|| format!("{} is not valid JSON", file.display()))?;

            tracing::info!(file = %file.display(), "Upserting contact");
            let response = client
                .upsert_contact(&contact)
                .await
                .context("Failed to upsert contact")?;

            println!("{}", serde_json::to_string_pretty(&response)?);
            eprintln!("{}", "✓ Contact upserted".bright_green());
        }
    }

    Ok(())
}

fn parse_json(raw: &str) -> std::result::Result<Value, String> {
    serde_json::from_str(raw).map_err(|e| format!("invalid JSON: {}", e))
}
