//! Custom error types for amjtoc.
//!
//! All library functions return `Result<T, TocError>`. The variants mirror how
//! far a failure reaches: `Launch` aborts a crawl, `Browser` and `Timeout`
//! cost one listing page, `Parse` costs one article.

use thiserror::Error;

/// Main error type for amjtoc operations.
#[derive(Debug, Error)]
pub enum TocError {
    /// Browser binary missing, version-mismatched or refusing to start
    #[error("Browser launch failed: {0}")]
    Launch(String),

    /// Navigation or DevTools protocol failure on an open session
    #[error("Browser error: {0}")]
    Browser(String),

    /// Marker element did not appear in time
    #[error("Timed out after {secs}s waiting for '{selector}'")]
    Timeout {
        /// CSS selector that was awaited
        selector: String,
        /// Wait budget in seconds
        secs: u64,
    },

    /// HTML parsing error
    #[error("Parse error: {0}")]
    Parse(String),

    /// CSV read/write error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// File I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error
    #[error("Config error: {0}")]
    Config(String),

    /// Validation error
    #[error("Validation error: {0}")]
    Validation(String),
}

impl TocError {
    /// Whether the error must end a crawl instead of costing a single page.
    pub fn is_fatal(&self) -> bool {
        matches!(self, TocError::Launch(_))
    }
}

impl From<chromiumoxide::error::CdpError> for TocError {
    fn from(e: chromiumoxide::error::CdpError) -> Self {
        TocError::Browser(e.to_string())
    }
}

/// Result type alias using `TocError`
pub type Result<T> = std::result::Result<T, TocError>;

/// Extension trait for adding context to Option types
pub trait OptionExt<T> {
    /// Convert Option to Result with a parse error message
    fn ok_or_parse(self, msg: &str) -> Result<T>;
}

impl<T> OptionExt<T> for Option<T> {
    fn ok_or_parse(self, msg: &str) -> Result<T> {
        self.ok_or_else(|| TocError::Parse(msg.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_launch_is_fatal() {
        assert!(TocError::Launch("no chrome".into()).is_fatal());
        assert!(!TocError::Browser("reset".into()).is_fatal());
        assert!(!TocError::Timeout {
            selector: "div.article-meta".into(),
            secs: 10
        }
        .is_fatal());
        assert!(!TocError::Parse("missing title".into()).is_fatal());
    }

    #[test]
    fn test_ok_or_parse() {
        let missing: Option<u8> = None;
        let err = missing.ok_or_parse("no href").expect_err("should fail");
        assert_eq!(err.to_string(), "Parse error: no href");
        assert_eq!(Some(3).ok_or_parse("unused").expect("present"), 3);
    }
}
