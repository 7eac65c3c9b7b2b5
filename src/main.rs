use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use query_copilot::config::{self, CopilotConfig};
use query_copilot::copilot::Copilot;
use query_copilot::db::{Database, LocalDatabase, PostgresDatabase};
use query_copilot::llm::build_model;
use query_copilot::report;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "query-copilot")]
#[command(about = "Ask questions about your data in plain language")]
struct Args {
    /// PostgreSQL connection string (or set DATABASE_URL)
    #[arg(long, global = true, conflicts_with = "csv")]
    database_url: Option<String>,

    /// CSV file to load as a table named after the file; repeatable
    #[arg(long = "csv", global = true)]
    csv: Vec<PathBuf>,

    /// Override COPILOT_MAX_ATTEMPTS
    #[arg(long, global = true)]
    max_attempts: Option<u32>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List available tables
    Tables,
    /// Print a table's schema as a CREATE TABLE statement
    Schema {
        table: String,
    },
    /// Generate SQL for a question, run it, then analyze the rows
    Ask {
        table: String,
        question: String,
    },
}

async fn open_database(args: &Args) -> Result<Arc<dyn Database>> {
    if !args.csv.is_empty() {
        return Ok(Arc::new(LocalDatabase::from_csv_files(&args.csv)?));
    }

    match config::database_url(args.database_url.clone(), |key| std::env::var(key).ok()) {
        Some(url) => Ok(Arc::new(PostgresDatabase::connect(&url).await?)),
        None => bail!("No database configured: pass --database-url or --csv <file>, or set DATABASE_URL"),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("query_copilot=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let db = open_database(&args).await?;

    match &args.command {
        Commands::Tables => {
            for table in db.list_tables().await? {
                println!("{}", table);
            }
        }
        Commands::Schema { table } => {
            println!("{}", db.table_schema(table).await?.to_create_statement());
        }
        Commands::Ask { table, question } => {
            let mut config = CopilotConfig::from_env()?;
            if let Some(max_attempts) = args.max_attempts {
                if max_attempts == 0 {
                    bail!("--max-attempts must be at least 1");
                }
                config.max_attempts = max_attempts;
            }

            let model = build_model(&config.llm)?;
            let copilot = Copilot::new(&config, model, db);

            info!("Asking about '{}': {}", table, question);
            let result = copilot.ask(table, question).await?;
            println!("{}", report::render(&result, config.sample_rows));
        }
    }

    Ok(())
}
