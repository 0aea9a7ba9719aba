//! Crawl window and browser settings for the collector.

use crate::error::{Result, TocError};
use crate::pacing::Jitter;
use crate::record::year_from_volume;
use chrono::Datelike;
use std::ops::RangeInclusive;
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

/// Journal website root
pub const DEFAULT_BASE_URL: &str = "https://journals.aom.org";

/// Journal code used in listing URLs
pub const DEFAULT_JOURNAL: &str = "amj";

/// Where the collector appends and the deduplicator reads
pub const DEFAULT_OUTPUT: &str = "AMJ ToC/amj_articles.csv";

/// User agent presented by the headless browser
pub const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

/// Highest issue number accepted for a single volume
pub const MAX_ISSUE: u32 = 12;

/// Settings for one collector run.
#[derive(Debug, Clone)]
pub struct CrawlConfig {
    /// Site root, without trailing slash
    pub base_url: String,
    /// Journal code, e.g. `amj`
    pub journal: String,
    pub volumes: RangeInclusive<u32>,
    pub issues: RangeInclusive<u32>,
    /// CSV file records are appended to
    pub output: PathBuf,
    /// How long to wait for the first article container
    pub page_timeout: Duration,
    /// Pixels per scroll step
    pub scroll_step_px: u32,
    /// Upper bound on full scroll passes before the page is taken as complete
    pub max_scroll_passes: u32,
    /// Pause between scroll steps
    pub scroll_pause: Jitter,
    /// Pause after a full pass, before the height is re-measured
    pub scroll_settle: Jitter,
    /// Pause between listing pages
    pub page_delay: Jitter,
    /// Explicit browser executable; auto-detected when `None`
    pub chrome_path: Option<PathBuf>,
    pub window_size: (u32, u32),
    pub user_agent: String,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            journal: DEFAULT_JOURNAL.to_string(),
            volumes: 15..=17,
            issues: 1..=6,
            output: PathBuf::from(DEFAULT_OUTPUT),
            page_timeout: Duration::from_secs(10),
            scroll_step_px: 100,
            max_scroll_passes: 20,
            scroll_pause: Jitter::from_millis(100, 300),
            scroll_settle: Jitter::from_millis(1_000, 2_000),
            page_delay: Jitter::from_millis(1_000, 3_000),
            chrome_path: None,
            window_size: (1920, 1080),
            user_agent: USER_AGENT.to_string(),
        }
    }
}

impl CrawlConfig {
    /// Check ranges and settings before any page is requested.
    pub fn validate(&self) -> Result<()> {
        Url::parse(&self.base_url)
            .map_err(|e| TocError::Config(format!("Invalid base URL '{}': {}", self.base_url, e)))?;

        if self.journal.trim().is_empty() {
            return Err(TocError::Config("Journal code must not be empty".to_string()));
        }

        if self.volumes.is_empty() {
            return Err(TocError::Validation(format!(
                "Empty volume range {}-{}",
                self.volumes.start(),
                self.volumes.end()
            )));
        }
        if *self.volumes.start() == 0 {
            return Err(TocError::Validation("Volumes start at 1".to_string()));
        }
        let latest_year = i64::from(chrono::Local::now().year()) + 1;
        if year_from_volume(*self.volumes.end()) > latest_year {
            return Err(TocError::Validation(format!(
                "Volume {} would be published in {}, after {}",
                self.volumes.end(),
                year_from_volume(*self.volumes.end()),
                latest_year
            )));
        }

        if self.issues.is_empty() {
            return Err(TocError::Validation(format!(
                "Empty issue range {}-{}",
                self.issues.start(),
                self.issues.end()
            )));
        }
        if *self.issues.start() == 0 || *self.issues.end() > MAX_ISSUE {
            return Err(TocError::Validation(format!(
                "Issues must lie within 1-{}",
                MAX_ISSUE
            )));
        }

        if self.page_timeout.is_zero() {
            return Err(TocError::Config("Page timeout must be positive".to_string()));
        }
        if self.scroll_step_px == 0 {
            return Err(TocError::Config("Scroll step must be positive".to_string()));
        }
        if self.max_scroll_passes == 0 {
            return Err(TocError::Config("At least one scroll pass is required".to_string()));
        }

        for (name, jitter) in [
            ("scroll pause", &self.scroll_pause),
            ("scroll settle", &self.scroll_settle),
            ("page delay", &self.page_delay),
        ] {
            if !jitter.is_valid() {
                return Err(TocError::Config(format!(
                    "Invalid {} range: {:?} > {:?}",
                    name, jitter.min, jitter.max
                )));
            }
        }

        Ok(())
    }

    /// Listing page of one issue: `{base}/toc/{journal}/{volume}/{issue}`.
    pub fn toc_url(&self, volume: u32, issue: u32) -> Result<Url> {
        let raw = format!(
            "{}/toc/{}/{}/{}",
            self.base_url.trim_end_matches('/'),
            self.journal,
            volume,
            issue
        );
        Url::parse(&raw).map_err(|e| TocError::Config(format!("Invalid ToC URL '{}': {}", raw, e)))
    }

    /// Every (volume, issue) pair of the crawl, volume-major.
    pub fn pages(&self) -> impl Iterator<Item = (u32, u32)> + '_ {
        self.volumes
            .clone()
            .flat_map(move |v| self.issues.clone().map(move |i| (v, i)))
    }

    /// Number of listing pages the crawl will visit.
    pub fn page_count(&self) -> usize {
        self.volumes.clone().count() * self.issues.clone().count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        CrawlConfig::default().validate().expect("defaults must validate");
    }

    #[test]
    fn test_toc_url() {
        let config = CrawlConfig {
            base_url: "https://journals.aom.org/".to_string(),
            ..Default::default()
        };
        let url = config.toc_url(15, 3).expect("Failed to build URL");
        assert_eq!(url.as_str(), "https://journals.aom.org/toc/amj/15/3");
    }

    #[test]
    fn test_pages_volume_major() {
        let config = CrawlConfig {
            volumes: 15..=16,
            issues: 1..=2,
            ..Default::default()
        };
        let pages: Vec<_> = config.pages().collect();
        assert_eq!(pages, vec![(15, 1), (15, 2), (16, 1), (16, 2)]);
        assert_eq!(config.page_count(), 4);
        assert_eq!(CrawlConfig::default().page_count(), 18);
    }

    #[test]
    fn test_rejects_bad_ranges() {
        #[allow(clippy::reversed_empty_ranges)]
        let inverted = CrawlConfig {
            volumes: 17..=15,
            ..Default::default()
        };
        assert!(matches!(inverted.validate(), Err(TocError::Validation(_))));

        let zero_issue = CrawlConfig {
            issues: 0..=6,
            ..Default::default()
        };
        assert!(zero_issue.validate().is_err());

        let too_many_issues = CrawlConfig {
            issues: 1..=13,
            ..Default::default()
        };
        assert!(too_many_issues.validate().is_err());

        let future_volume = CrawlConfig {
            volumes: 15..=500,
            ..Default::default()
        };
        assert!(future_volume.validate().is_err());
    }

    #[test]
    fn test_rejects_volumes_beyond_i32() {
        for end in [2_147_483_648, u32::MAX] {
            let config = CrawlConfig {
                volumes: 15..=end,
                ..Default::default()
            };
            assert!(
                matches!(config.validate(), Err(TocError::Validation(_))),
                "volume {} must be rejected",
                end
            );
        }
    }

    #[test]
    fn test_rejects_bad_settings() {
        let bad_url = CrawlConfig {
            base_url: "not a url".to_string(),
            ..Default::default()
        };
        assert!(matches!(bad_url.validate(), Err(TocError::Config(_))));

        let no_timeout = CrawlConfig {
            page_timeout: Duration::ZERO,
            ..Default::default()
        };
        assert!(no_timeout.validate().is_err());

        let inverted_delay = CrawlConfig {
            page_delay: Jitter::from_millis(3_000, 1_000),
            ..Default::default()
        };
        assert!(inverted_delay.validate().is_err());

        let no_passes = CrawlConfig {
            max_scroll_passes: 0,
            ..Default::default()
        };
        assert!(no_passes.validate().is_err());
    }
}
