//! amjtoc - journal table-of-contents collector
//!
//! Two independent steps sharing nothing but the CSV file between them.
//!
//! ## Usage
//!
//! ```bash
//! amjtoc collect --volumes 15-17 --issues 1-6
//! amjtoc dedup "AMJ ToC/amj_articles.csv"
//! ```

use amjtoc::{collector::Collector, config, config::CrawlConfig, dedup, pacing::Jitter};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::ops::RangeInclusive;
use std::path::PathBuf;
use std::time::Duration;
use tracing::Level;
use tracing_subscriber::{fmt, EnvFilter};

// ============================================================================
// CLI Definition
// ============================================================================

/// Journal table-of-contents collector and deduplicator
#[derive(Parser)]
#[command(name = "amjtoc")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render every listing page in the crawl window and append its articles
    Collect {
        /// Volume range (e.g., "15", "15-17")
        #[arg(long, default_value = "15-17")]
        volumes: String,

        /// Issue range within each volume (e.g., "1-6")
        #[arg(long, default_value = "1-6")]
        issues: String,

        /// Output CSV file (appended to if it exists)
        #[arg(short, long, default_value = config::DEFAULT_OUTPUT)]
        output: PathBuf,

        /// Journal code used in listing URLs
        #[arg(long, default_value = config::DEFAULT_JOURNAL)]
        journal: String,

        /// Site root
        #[arg(long, default_value = config::DEFAULT_BASE_URL)]
        base_url: String,

        /// Seconds to wait for the article list to appear
        #[arg(long, default_value = "10")]
        timeout: u64,

        /// Scroll passes before a still-growing page is taken as complete
        #[arg(long, default_value = "20")]
        max_scroll_passes: u32,

        /// Minimum pause between pages, in seconds
        #[arg(long, default_value = "1.0")]
        min_delay: f64,

        /// Maximum pause between pages, in seconds
        #[arg(long, default_value = "3.0")]
        max_delay: f64,

        /// Chrome/Chromium executable (defaults to CHROMIUM_PATH, then auto-detection)
        #[arg(long)]
        chrome: Option<PathBuf>,
    },

    /// Remove duplicate rows and sort by volume and issue
    Dedup {
        /// Collected CSV file; output goes to `<name>_unique.<ext>` beside it
        #[arg(default_value = config::DEFAULT_OUTPUT)]
        input: PathBuf,
    },
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.debug { Level::DEBUG } else { Level::INFO };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level.to_string()));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .init();

    match cli.command {
        Commands::Collect {
            volumes,
            issues,
            output,
            journal,
            base_url,
            timeout,
            max_scroll_passes,
            min_delay,
            max_delay,
            chrome,
        } => {
            let page_delay = Jitter::try_from_secs_f64(min_delay, max_delay)
                .context("Invalid --min-delay/--max-delay")?;

            let config = CrawlConfig {
                base_url,
                journal,
                volumes: parse_range(&volumes).context("Invalid --volumes format")?,
                issues: parse_range(&issues).context("Invalid --issues format")?,
                output,
                page_timeout: Duration::from_secs(timeout),
                max_scroll_passes,
                page_delay,
                chrome_path: chrome,
                ..Default::default()
            };
            run_collect(config).await
        }
        Commands::Dedup { input } => run_dedup(input),
    }
}

// ============================================================================
// Commands
// ============================================================================

async fn run_collect(config: CrawlConfig) -> Result<()> {
    println!(
        "Collecting volumes {}-{}, issues {}-{} into {}",
        config.volumes.start(),
        config.volumes.end(),
        config.issues.start(),
        config.issues.end(),
        config.output.display()
    );

    let summary = Collector::with_chrome(config)
        .run()
        .await
        .context("Collection failed")?;

    println!(
        "\n✓ Collected {} articles ({} pages rendered, {} failed)",
        summary.records_written, summary.pages_fetched, summary.pages_failed
    );
    println!("Data saved to {}", summary.output.display());
    Ok(())
}

fn run_dedup(input: PathBuf) -> Result<()> {
    let report = dedup::dedupe_file(&input)
        .with_context(|| format!("Deduplication of {} failed", input.display()))?;

    println!("\nDeduplication complete:");
    println!("Original rows: {}", report.original);
    println!("Unique rows:   {}", report.kept);
    println!("Removed:       {}", report.removed);
    println!("Saved to {}", report.output.display());
    Ok(())
}

/// Parse a range string (e.g., "3", "15-17")
fn parse_range(range_str: &str) -> Result<RangeInclusive<u32>> {
    if range_str.contains('-') {
        let parts: Vec<&str> = range_str.split('-').collect();
        if parts.len() != 2 {
            anyhow::bail!("Invalid range format");
        }
        let start: u32 = parts[0].trim().parse().context("Invalid range start")?;
        let end: u32 = parts[1].trim().parse().context("Invalid range end")?;
        Ok(start..=end)
    } else {
        let single: u32 = range_str.trim().parse().context("Invalid number")?;
        Ok(single..=single)
    }
}
