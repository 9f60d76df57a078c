use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use ilh_ingest::CleanBatch;
use ilh_loader::{
    collect_diagnostics, connect, database_url_from_env, LoadPipeline, LoaderConfig, MIGRATOR,
};

/// Exit code reserved for configuration errors, distinct from load
/// failures.
const CONFIG_EXIT: u8 = 2;

#[derive(Debug, Parser)]
#[command(name = "ilh-cli")]
#[command(about = "Immo Listing Historian command-line interface")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Load the cleaned batch from CLEANED_CSV into the history store.
    Load {
        /// Emit the load summary as JSON on stdout.
        #[arg(long)]
        json: bool,
    },
    /// Apply pending schema migrations.
    Migrate,
    /// Print post-load diagnostics without loading anything.
    Check,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode> {
    match cli.command.unwrap_or(Commands::Load { json: false }) {
        Commands::Load { json } => {
            let config = match LoaderConfig::from_env() {
                Ok(config) => config,
                Err(err) => {
                    eprintln!("configuration error: {err}");
                    return Ok(ExitCode::from(CONFIG_EXIT));
                }
            };
            let batch = CleanBatch::from_csv_path(&config.batch_path)?;
            let pool = config.connect().await?;
            let pipeline = LoadPipeline::new(pool, config.floor_bounds);
            let summary = pipeline.run_once(&batch).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                println!(
                    "load complete: run_id={} staged={} deltas={} opened={} closed={}",
                    summary.run_id,
                    summary.staged_rows,
                    summary.delta_rows,
                    summary.versions_opened,
                    summary.versions_closed
                );
            }
            // Publish failure leaves committed history intact; surface it
            // as a non-zero exit so the scheduler retries.
            if let Some(publish_error) = summary.publish_error {
                eprintln!("snapshot publish failed: {publish_error}");
                return Ok(ExitCode::FAILURE);
            }
            Ok(ExitCode::SUCCESS)
        }
        Commands::Migrate => {
            let database_url = match database_url_from_env() {
                Ok(url) => url,
                Err(err) => {
                    eprintln!("configuration error: {err}");
                    return Ok(ExitCode::from(CONFIG_EXIT));
                }
            };
            let pool = connect(&database_url).await?;
            MIGRATOR.run(&pool).await?;
            println!("migrations applied");
            Ok(ExitCode::SUCCESS)
        }
        Commands::Check => {
            let database_url = match database_url_from_env() {
                Ok(url) => url,
                Err(err) => {
                    eprintln!("configuration error: {err}");
                    return Ok(ExitCode::from(CONFIG_EXIT));
                }
            };
            let pool = connect(&database_url).await?;
            let diagnostics = collect_diagnostics(&pool).await?;
            println!("{}", serde_json::to_string_pretty(&diagnostics)?);
            Ok(ExitCode::SUCCESS)
        }
    }
}
