//! Administrative command line for pricewatch.
//!
//! Sources are created here, not by the server; the server only reads them.

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use pricewatch_core::normalize_query;

#[derive(Debug, Parser)]
#[command(name = "pricewatch-cli")]
#[command(about = "pricewatch administration")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Manage the retail sources prices are harvested from
    Sources {
        #[command(subcommand)]
        command: SourceCommands,
    },
    /// List recent scrape jobs
    Jobs {
        /// Number of jobs to show, newest first
        #[arg(long, default_value_t = 20)]
        limit: i64,
    },
    /// Delete aged-out prices for a query
    Prune {
        /// Query term whose prices should be pruned
        #[arg(long)]
        query: String,
        /// Delete records scraped more than this many days ago
        #[arg(long)]
        days: u32,
    },
    /// Database management commands
    Db {
        #[command(subcommand)]
        command: DbCommands,
    },
}

#[derive(Debug, Subcommand)]
enum SourceCommands {
    /// List all registered sources
    List,
    /// Add a new source
    Add {
        /// Source name; must match a registered adapter to be scraped
        #[arg(long)]
        name: String,
        /// Base URL the adapter builds search requests against
        #[arg(long)]
        base_url: String,
    },
}

#[derive(Debug, Subcommand)]
enum DbCommands {
    /// Test the database connection
    Ping,
    /// Run pending migrations
    Migrate,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let env_filter = EnvFilter::try_from_default_env().or_else(|_| {
        let level = std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
        EnvFilter::try_new(level)
    })?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let cli = Cli::parse();
    let pool = pricewatch_db::connect_pool_from_env().await?;

    match cli.command {
        Commands::Sources { command } => match command {
            SourceCommands::List => {
                let rows = pricewatch_db::sources::list(&pool).await?;
                if rows.is_empty() {
                    println!("no sources registered");
                }
                for row in rows {
                    let scraped = row
                        .last_scraped_at
                        .map_or_else(|| "never".to_string(), |at| at.to_rfc3339());
                    println!(
                        "{:>4}  {:<20} {:<40} last scraped: {}",
                        row.source_id, row.name, row.base_url, scraped
                    );
                }
            }
            SourceCommands::Add { name, base_url } => {
                let row = pricewatch_db::sources::create(&pool, &name, &base_url).await?;
                println!("created source {} (id {})", row.name, row.source_id);
            }
        },
        Commands::Jobs { limit } => {
            let rows = pricewatch_db::scrape_jobs::list_recent(&pool, limit).await?;
            if rows.is_empty() {
                println!("no scrape jobs recorded");
            }
            for row in rows {
                println!(
                    "{:>6}  {:<10} {:<30} created: {}  error: {}",
                    row.job_id,
                    row.status,
                    row.query_term,
                    row.created_at.to_rfc3339(),
                    row.error_message.as_deref().unwrap_or("-")
                );
            }
        }
        Commands::Prune { query, days } => {
            let query_term = normalize_query(&query);
            let deleted =
                pricewatch_db::prices::prune_older_than(&pool, &query_term, days).await?;
            println!("deleted {deleted} price records for \"{query_term}\"");
        }
        Commands::Db { command } => match command {
            DbCommands::Ping => {
                pricewatch_db::ping(&pool).await?;
                println!("database connection ok");
            }
            DbCommands::Migrate => {
                pricewatch_db::run_migrations(&pool).await?;
                println!("migrations applied");
            }
        },
    }

    Ok(())
}
