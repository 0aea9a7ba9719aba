//! Crawl loop over the configured volumes and issues.
//!
//! Failures are sorted by reach: a browser that cannot start ends the run,
//! a page that times out or errors contributes no rows, and a single broken
//! article is dropped by the extractor. Records are written after every page.

use crate::browser::BrowserSession;
use crate::config::CrawlConfig;
use crate::error::Result;
use crate::extract::parse_toc_page;
use crate::record::ArticleRecord;
use crate::writer::ArticleWriter;
use std::path::PathBuf;
use tracing::{debug, error, info, warn};
use url::Url;

/// Supplier of rendered listing-page markup.
#[allow(async_fn_in_trait)]
pub trait TocSource {
    /// Fetch the fully rendered HTML behind `url`.
    async fn fetch(&mut self, url: &Url) -> Result<String>;
}

/// Renders each listing page in its own headless Chromium session.
pub struct ChromeSource {
    config: CrawlConfig,
}

impl ChromeSource {
    pub fn new(config: CrawlConfig) -> Self {
        Self { config }
    }
}

impl TocSource for ChromeSource {
    async fn fetch(&mut self, url: &Url) -> Result<String> {
        let session = BrowserSession::launch(&self.config).await?;
        let html = session.render_listing(url, &self.config).await;
        session.close().await;
        html
    }
}

/// Outcome of a completed crawl.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlSummary {
    /// Pages that rendered, whether or not they held articles
    pub pages_fetched: usize,
    /// Pages that timed out or failed and contributed nothing
    pub pages_failed: usize,
    pub records_written: usize,
    pub output: PathBuf,
}

/// Drives a [`TocSource`] across the crawl window and persists the results.
pub struct Collector<S> {
    config: CrawlConfig,
    source: S,
    writer: ArticleWriter,
}

impl Collector<ChromeSource> {
    /// Collector backed by a real browser.
    pub fn with_chrome(config: CrawlConfig) -> Self {
        let source = ChromeSource::new(config.clone());
        Self::new(config, source)
    }
}

impl<S: TocSource> Collector<S> {
    pub fn new(config: CrawlConfig, source: S) -> Self {
        let writer = ArticleWriter::new(config.output.clone());
        Self { config, source, writer }
    }

    /// Run the crawl to completion.
    ///
    /// # Errors
    ///
    /// Returns the error that ended the run early: a browser that cannot be
    /// launched, an invalid configuration, or a failed write. Rows written
    /// before the error stay on disk.
    pub async fn run(&mut self) -> Result<CrawlSummary> {
        self.config.validate()?;

        let result = self.crawl().await;
        if let Err(e) = &result {
            error!(error = %e, output = %self.writer.path().display(), "Crawl aborted, keeping rows already written");
        }
        result
    }

    async fn crawl(&mut self) -> Result<CrawlSummary> {
        let pages: Vec<(u32, u32)> = self.config.pages().collect();
        info!(
            pages = pages.len(),
            volumes = ?self.config.volumes,
            issues = ?self.config.issues,
            output = %self.writer.path().display(),
            "Starting crawl"
        );

        let mut summary = CrawlSummary {
            pages_fetched: 0,
            pages_failed: 0,
            records_written: 0,
            output: self.writer.path().to_path_buf(),
        };

        for (volume, issue) in pages {
            info!(volume, issue, "Collecting issue");

            match self.collect_page(volume, issue).await {
                Ok(records) => {
                    summary.pages_fetched += 1;
                    if !records.is_empty() {
                        summary.records_written += self.writer.append(&records)?;
                        report_page(&records, summary.records_written);
                    } else {
                        info!(volume, issue, "No articles on page");
                    }
                }
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    summary.pages_failed += 1;
                    warn!(volume, issue, error = %e, "Page failed, continuing with next issue");
                }
            }

            let waited = self.config.page_delay.pause().await;
            debug!(secs = waited.as_secs_f64(), "Paused between pages");
        }

        if summary.records_written == 0 {
            warn!(pages = summary.pages_fetched + summary.pages_failed, "Crawl finished without writing any records");
        } else {
            info!(
                records = summary.records_written,
                fetched = summary.pages_fetched,
                failed = summary.pages_failed,
                output = %summary.output.display(),
                "Crawl complete"
            );
        }

        Ok(summary)
    }

    /// Fetch and parse one listing page.
    async fn collect_page(&mut self, volume: u32, issue: u32) -> Result<Vec<ArticleRecord>> {
        let url = self.config.toc_url(volume, issue)?;
        debug!(url = %url, "Fetching listing page");

        let html = self.source.fetch(&url).await?;
        let records = parse_toc_page(&html, volume, issue, &self.config.base_url)?;
        info!(volume, issue, count = records.len(), "Extracted articles");
        Ok(records)
    }
}

/// Log the page count, running total and the newest article.
fn report_page(records: &[ArticleRecord], total: usize) {
    info!(count = records.len(), total, "Issue saved");
    if let Some(latest) = records.last() {
        info!(
            year = latest.year,
            title = %latest.title,
            authors = %latest.authors,
            doi = %latest.identifier,
            "Latest article"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dedup::dedupe_file;
    use crate::error::TocError;
    use crate::pacing::Jitter;
    use std::collections::HashMap;
    use tempfile::TempDir;

    /// Serves canned pages keyed by URL path; unknown paths time out.
    struct ScriptedSource {
        pages: HashMap<String, String>,
        launch_fails: bool,
        requested: Vec<String>,
    }

    impl ScriptedSource {
        fn new(pages: &[(&str, String)]) -> Self {
            Self {
                pages: pages.iter().map(|(p, h)| (p.to_string(), h.clone())).collect(),
                launch_fails: false,
                requested: Vec::new(),
            }
        }
    }

    impl TocSource for ScriptedSource {
        async fn fetch(&mut self, url: &Url) -> Result<String> {
            self.requested.push(url.path().to_string());
            if self.launch_fails {
                return Err(TocError::Launch("msedgedriver not found".to_string()));
            }
            self.pages.get(url.path()).cloned().ok_or_else(|| TocError::Timeout {
                selector: "div.article-meta".to_string(),
                secs: 10,
            })
        }
    }

    fn article(doi: &str, title: &str) -> String {
        format!(
            r#"<div class="article-meta"><h5 class="issue-item__title"><a href="/doi/{}">{}</a></h5>
               <ul class="rlist--inline loa"><li><span>Ann Lee</span></li></ul></div>"#,
            doi, title
        )
    }

    fn page(articles: &[String]) -> String {
        format!("<html><body>{}</body></html>", articles.concat())
    }

    fn config(dir: &TempDir, volumes: std::ops::RangeInclusive<u32>, issues: std::ops::RangeInclusive<u32>) -> CrawlConfig {
        CrawlConfig {
            volumes,
            issues,
            output: dir.path().join("AMJ ToC").join("amj_articles.csv"),
            page_delay: Jitter::none(),
            scroll_pause: Jitter::none(),
            scroll_settle: Jitter::none(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_header_once_and_row_count() -> Result<()> {
        let dir = TempDir::new()?;
        let source = ScriptedSource::new(&[
            ("/toc/amj/15/1", page(&[article("10.5465/1", "One"), article("10.5465/2", "Two")])),
            ("/toc/amj/15/2", page(&[article("10.5465/3", "Three")])),
            ("/toc/amj/15/3", page(&[])),
        ]);
        let mut collector = Collector::new(config(&dir, 15..=15, 1..=3), source);

        let summary = collector.run().await?;
        assert_eq!(summary.records_written, 3);
        assert_eq!(summary.pages_fetched, 3);
        assert_eq!(summary.pages_failed, 0);

        let text = std::fs::read_to_string(&summary.output)?;
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 1 + 3);
        assert_eq!(lines[0], "Volume,Issue,Year,Title,Authors,DOI,Link");
        assert_eq!(lines[3], "15,2,1972,Three,Ann Lee,10.5465/3,https://journals.aom.org/doi/10.5465/3");
        Ok(())
    }

    #[tokio::test]
    async fn test_timed_out_page_does_not_stop_run() -> Result<()> {
        let dir = TempDir::new()?;
        // 15/2 is missing from the script and times out
        let source = ScriptedSource::new(&[
            ("/toc/amj/15/1", page(&[article("10.5465/1", "One")])),
            ("/toc/amj/15/3", page(&[article("10.5465/3", "Three")])),
        ]);
        let mut collector = Collector::new(config(&dir, 15..=15, 1..=3), source);

        let summary = collector.run().await?;
        assert_eq!(summary.pages_failed, 1);
        assert_eq!(summary.pages_fetched, 2);
        assert_eq!(summary.records_written, 2);
        assert_eq!(
            collector.source.requested,
            vec!["/toc/amj/15/1", "/toc/amj/15/2", "/toc/amj/15/3"]
        );

        let text = std::fs::read_to_string(&summary.output)?;
        assert!(!text.contains(",2,1972,"));
        Ok(())
    }

    #[tokio::test]
    async fn test_launch_failure_is_fatal() -> Result<()> {
        let dir = TempDir::new()?;
        let mut source = ScriptedSource::new(&[]);
        source.launch_fails = true;
        let mut collector = Collector::new(config(&dir, 15..=17, 1..=6), source);

        let err = collector.run().await.expect_err("launch failure must abort");
        assert!(err.is_fatal());
        assert_eq!(collector.source.requested.len(), 1);
        assert!(!dir.path().join("AMJ ToC").join("amj_articles.csv").exists());
        Ok(())
    }

    #[tokio::test]
    async fn test_invalid_config_fetches_nothing() -> Result<()> {
        let dir = TempDir::new()?;
        let mut cfg = config(&dir, 15..=15, 1..=1);
        cfg.issues = 0..=1;
        let mut collector = Collector::new(cfg, ScriptedSource::new(&[]));

        assert!(collector.run().await.is_err());
        assert!(collector.source.requested.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_repeated_article_collapses_after_dedup() -> Result<()> {
        let dir = TempDir::new()?;
        let repeated = article("10.5465/9", "Listed Twice");
        // Same page content served for 16/1 on a second run over the same file
        let pages = [
            ("/toc/amj/16/1", page(&[repeated.clone()])),
            ("/toc/amj/15/1", page(&[article("10.5465/1", "Earlier")])),
        ];

        let mut first = Collector::new(config(&dir, 16..=16, 1..=1), ScriptedSource::new(&pages));
        first.run().await?;
        let mut second = Collector::new(config(&dir, 15..=16, 1..=1), ScriptedSource::new(&pages));
        let summary = second.run().await?;

        let raw = std::fs::read_to_string(&summary.output)?;
        assert_eq!(raw.matches("Listed Twice").count(), 2);
        assert_eq!(raw.matches("Volume,Issue").count(), 1);

        let report = dedupe_file(&summary.output)?;
        assert_eq!(report.original, 3);
        assert_eq!(report.kept, 2);
        assert_eq!(report.removed, 1);

        let unique = std::fs::read_to_string(&report.output)?;
        let lines: Vec<&str> = unique.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[1].contains("Earlier"));
        assert!(lines[2].contains("Listed Twice"));
        Ok(())
    }
}
