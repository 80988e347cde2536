mod db;
mod export;
mod fetch;
mod load;
mod normalize;
mod report;
mod scrape;
mod settings;

use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::warn;

use settings::Settings;

#[derive(Parser)]
#[command(name = "gradcafe_scraper", about = "Admissions-results scraper for thegradcafe.com")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the database schema
    Init,
    /// Scrape new survey entries and write the normalized export file
    Scrape {
        /// Max entries to collect
        #[arg(short = 'n', long, default_value = "100")]
        limit: usize,
        /// Export file path (defaults to the configured one)
        #[arg(short, long)]
        out: Option<PathBuf>,
        /// Re-scrape the full history instead of stopping at the first
        /// already-stored entry
        #[arg(long)]
        full: bool,
    },
    /// Load an export file (raw or LLM-enriched) into the database
    Load { file: PathBuf },
    /// Scrape + load in one pipeline
    Run {
        /// Max entries to collect
        #[arg(short = 'n', long, default_value = "100")]
        limit: usize,
        /// Export file path (defaults to the configured one)
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
    /// Show database counts
    Stats,
    /// Answer the aggregate admissions questions
    Report,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();
    let settings = settings::load()?;

    match cli.command {
        Commands::Init => {
            let conn = db::connect(&settings.db_path)?;
            db::init_schema(&conn)?;
            println!("Database ready at {}", settings.db_path.display());
        }
        Commands::Scrape { limit, out, full } => {
            let path = out.unwrap_or_else(|| settings.export_path.clone());
            let count = cmd_scrape(&settings, limit, &path, full)?;
            println!("Scraped {} entries -> {}", count, path.display());
        }
        Commands::Load { file } => {
            let conn = db::connect(&settings.db_path)?;
            db::init_schema(&conn)?;
            let inserted = load::load_file(&conn, &file)?;
            println!("Inserted {} new rows from {}", inserted, file.display());
        }
        Commands::Run { limit, out } => {
            let path = out.unwrap_or_else(|| settings.export_path.clone());
            let count = cmd_scrape(&settings, limit, &path, false)?;
            println!("Scraped {} entries -> {}", count, path.display());

            let conn = db::connect(&settings.db_path)?;
            db::init_schema(&conn)?;
            let inserted = load::load_file(&conn, &path)?;
            println!("Inserted {inserted} new rows.");
        }
        Commands::Stats => {
            let conn = db::connect(&settings.db_path)?;
            db::init_schema(&conn)?;
            let s = db::stats(&conn)?;
            println!("Total:    {}", s.total);
            println!("Enriched: {}", s.enriched);
            println!(
                "Latest:   {}",
                s.latest_date_added
                    .map_or_else(|| "-".to_string(), |d| d.to_string())
            );
        }
        Commands::Report => {
            let conn = db::connect(&settings.db_path)?;
            db::init_schema(&conn)?;
            report::build(&conn)?.print();
        }
    }

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {:.1}s", elapsed.as_secs_f64());
    }

    Ok(())
}

/// Scrape, normalize and write the export file. The store's url lookup is
/// the incremental-stop predicate unless `full` asks for the whole history.
fn cmd_scrape(settings: &Settings, limit: usize, out: &Path, full: bool) -> Result<usize> {
    let conn = db::connect(&settings.db_path)?;
    db::init_schema(&conn)?;

    let fetcher = fetch::HttpFetcher::new(&settings.listing_url, &settings.user_agent)?;
    let options = scrape::ScrapeOptions {
        max_records: limit,
        delay: settings.delay(),
    };

    let records = if full {
        scrape::collect_new(&fetcher, &options, |_| false)?
    } else {
        scrape::collect_new(&fetcher, &options, |url| {
            db::url_exists(&conn, url).unwrap_or_else(|e| {
                warn!(url, error = %e, "url lookup failed, treating as unseen");
                false
            })
        })?
    };

    let cleaned = normalize::clean_records(&records);
    export::save_records(out, &cleaned)?;
    Ok(cleaned.len())
}
