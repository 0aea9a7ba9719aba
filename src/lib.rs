//! # amjtoc
//!
//! Journal table-of-contents collector and CSV deduplicator.
//!
//! ## Modules
//!
//! - [`collector`] - Crawl loop over volumes and issues
//! - [`browser`] - Headless Chromium rendering of listing pages
//! - [`extract`] - Article extraction from rendered markup
//! - [`writer`] - Append-mode CSV output
//! - [`dedup`] - Duplicate removal and (Volume, Issue) sorting
//! - [`config`] - Crawl window and browser settings
//! - [`record`] - Article rows and the volume -> year mapping
//! - [`pacing`] - Randomized pauses
//! - [`error`] - Custom error types
//!
//! ## Usage
//!
//! ```rust,no_run
//! use amjtoc::{collector::Collector, config::CrawlConfig, dedup};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = CrawlConfig::default();
//!     let summary = Collector::with_chrome(config).run().await?;
//!     let report = dedup::dedupe_file(&summary.output)?;
//!     println!("{} unique articles", report.kept);
//!     Ok(())
//! }
//! ```

pub mod browser;
pub mod collector;
pub mod config;
pub mod dedup;
pub mod error;
pub mod extract;
pub mod pacing;
pub mod record;
pub mod writer;

pub use error::{Result, TocError};
