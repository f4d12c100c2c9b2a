use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::sync::Arc;
use tracing::info;

use viewtally::config::Config;
use viewtally::db::ProgressStore;
use viewtally::pipeline::scan::{eligible_items, RunReport};
use viewtally::sheet::Sheet;

/// Viewtally: view-count backfill for YouTube links in CSV sheets.
///
/// Scans a URL column, fetches each video's view count from the YouTube
/// Data API, and writes the counts into an adjacent column — surviving
/// rate limits by pausing, aborting early, and resuming where it left off.
#[derive(Parser)]
#[command(name = "viewtally", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the progress database
    Init,

    /// Scan the sheet and backfill missing view counts
    Scan {
        /// Sheet to process (overrides VIEWTALLY_SHEET)
        #[arg(long)]
        sheet: Option<String>,

        /// Ignore any saved resume position and rescan from the top
        #[arg(long)]
        restart: bool,
    },

    /// Show system status (saved cursors, last run, DB stats)
    Status,

    /// Drop the saved resume position for a dataset
    Reset {
        /// Dataset to reset (defaults to the configured sheet's name)
        dataset: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if missing)
    let _ = dotenvy::dotenv();

    // Set up structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("viewtally=info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Init => {
            info!("Initializing viewtally database...");
            let config = Config::load()?;
            let store = viewtally::db::initialize(&config.db_path)?;
            let table_count = store.table_count().await?;
            println!("Database initialized at: {}", config.db_path);
            println!("Tables created: {table_count}");
            println!("\nViewtally is ready. Next step: set up your .env file");
            println!("  (see .env.example for required variables)");
            println!("\nThen run: viewtally scan --sheet path/to/sheet.csv");
        }

        Commands::Scan { sheet, restart } => {
            let mut config = Config::load()?;
            if let Some(path) = sheet {
                config.sheet_path = path;
            }
            config.require_api_key()?;
            config.require_sheet()?;

            let store = viewtally::db::open(&config.db_path)?;
            run_scan(&config, &store, restart).await?;
        }

        Commands::Status => {
            let config = Config::load()?;
            let store = viewtally::db::open(&config.db_path)?;
            viewtally::status::show(&store, &config.db_path).await?;
        }

        Commands::Reset { dataset } => {
            let config = Config::load()?;
            let dataset = match dataset {
                Some(d) => d,
                None => {
                    config.require_sheet()?;
                    config.dataset_key()
                }
            };
            let store = viewtally::db::open(&config.db_path)?;
            store.clear_resume_position(&dataset).await?;
            println!("Resume position cleared for {dataset}.");
        }
    }

    Ok(())
}

/// One scan run: candidate rows → cursor filter → scheduler → sheet
/// write-back → cursor persistence → summary.
async fn run_scan(
    config: &Config,
    store: &Arc<dyn ProgressStore>,
    restart: bool,
) -> Result<()> {
    let dataset = config.dataset_key();

    let mut sheet = Sheet::load(&config.sheet_path)?;
    println!(
        "Scanning {} ({} rows)...",
        config.sheet_path,
        sheet.row_count()
    );

    let cursor = if restart {
        store.clear_resume_position(&dataset).await?;
        None
    } else {
        store.resume_position(&dataset).await?
    };
    if let Some(position) = cursor {
        println!("  Resuming after row {position}");
    }

    let candidates = sheet.candidate_rows(config.url_column, config.output_column, config.start_row);
    let (items, truncated) = eligible_items(candidates, cursor, config.tuning.max_items_per_run);

    if items.is_empty() {
        println!("Nothing to do — every URL row already has a view count.");
        if cursor.is_some() {
            // The remainder past the cursor is done; the cursor has no
            // further use.
            store.clear_resume_position(&dataset).await?;
        }
        return Ok(());
    }
    if truncated {
        println!(
            "  Capped at {} rows this run (VIEWTALLY_MAX_ITEMS_PER_RUN)",
            config.tuning.max_items_per_run,
        );
    }
    println!("  {} rows to fetch", items.len());

    let client =
        viewtally::youtube::client::YouTubeClient::new(&config.api_base_url, &config.api_key)?;

    let report = viewtally::pipeline::scan::run(&client, items, &config.tuning).await;

    // Write successes back before touching the cursor, so an interruption
    // between the two re-fetches rows instead of skipping them.
    let successes = report.successes();
    if !successes.is_empty() {
        let applied = sheet.apply_counts(&successes, config.output_column);
        sheet.save()?;
        info!(applied, "View counts written to sheet");
    }

    persist_cursor(store, &dataset, &report, truncated).await?;
    store
        .set_meta("last_run_at", &chrono::Utc::now().to_rfc3339())
        .await?;

    viewtally::output::terminal::display_run_summary(&report);

    if report.aborted {
        println!(
            "\n{}",
            "Rate limiting got excessive — run `viewtally scan` again later to continue."
                .yellow()
        );
    } else if truncated {
        println!("\nRun `viewtally scan` again to process the remaining rows.");
    }

    Ok(())
}

/// Decide what the stored cursor should say after a run.
///
/// Abort: the scheduler's reported resume position (absent when the very
/// first item aborted — any prior cursor stands). Capped completion: the
/// last attempted position, so the next run continues down the sheet.
/// Full completion: no cursor at all.
async fn persist_cursor(
    store: &Arc<dyn ProgressStore>,
    dataset: &str,
    report: &RunReport,
    truncated: bool,
) -> Result<()> {
    if report.aborted {
        if let Some(position) = report.resume_position {
            store.set_resume_position(dataset, position).await?;
        }
    } else if truncated {
        if let Some(position) = report.last_position() {
            store.set_resume_position(dataset, position).await?;
        }
    } else {
        store.clear_resume_position(dataset).await?;
    }
    Ok(())
}
