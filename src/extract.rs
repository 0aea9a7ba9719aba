//! Extraction of article records from a rendered table-of-contents page.
//!
//! Author lists are read leniently. An author entry without a name `span` is
//! left out and the rest of the article is kept. Blank names are dropped
//! rather than leaving an empty slot between separators. An article with no
//! author list at all gets an empty `Authors` field.

use crate::error::{OptionExt, Result, TocError};
use crate::record::{join_authors, year_from_volume, ArticleRecord};
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, warn};
use url::Url;

/// Container bundling one article's title, authors and link.
pub const ARTICLE_SELECTOR: &str = "div.article-meta";
const TITLE_LINK_SELECTOR: &str = "h5.issue-item__title a";
const AUTHOR_ITEM_SELECTOR: &str = "ul.rlist--inline.loa li";
const AUTHOR_NAME_SELECTOR: &str = "span";

/// Path prefix of article links
const DOI_PREFIX: &str = "/doi/";

/// Compiled selectors for one listing page.
struct TocSelectors {
    article: Selector,
    title_link: Selector,
    author_item: Selector,
    author_name: Selector,
    doi: Regex,
}

impl TocSelectors {
    fn new() -> Result<Self> {
        let parse = |s: &str| Selector::parse(s).map_err(|e| TocError::Parse(e.to_string()));
        Ok(Self {
            article: parse(ARTICLE_SELECTOR)?,
            title_link: parse(TITLE_LINK_SELECTOR)?,
            author_item: parse(AUTHOR_ITEM_SELECTOR)?,
            author_name: parse(AUTHOR_NAME_SELECTOR)?,
            // View segments (abs, full, pdf, epdf) sit between /doi/ and the DOI itself
            doi: Regex::new(r"^/doi/(?:(?:abs|full|pdf|epdf)/)?(10\.\d{4,9}/[^?#\s]+)")
                .map_err(|e| TocError::Parse(e.to_string()))?,
        })
    }
}

/// Parse a rendered listing page into article records.
///
/// Containers that cannot be turned into a record are logged and skipped;
/// the rest of the page is still returned.
///
/// # Arguments
///
/// * `html` - Page source after scrolling has finished
/// * `volume`, `issue` - Listing the page belongs to
/// * `base_url` - Site root prepended to relative article links
pub fn parse_toc_page(html: &str, volume: u32, issue: u32, base_url: &str) -> Result<Vec<ArticleRecord>> {
    let document = Html::parse_document(html);
    let selectors = TocSelectors::new()?;
    let base_url = base_url.trim_end_matches('/');

    let containers: Vec<ElementRef> = document.select(&selectors.article).collect();
    debug!(volume, issue, count = containers.len(), "Found article containers");

    let mut records = Vec::with_capacity(containers.len());
    for (idx, container) in containers.into_iter().enumerate() {
        match parse_article(container, &selectors, volume, issue, base_url) {
            Ok(record) => records.push(record),
            Err(e) => {
                warn!(volume, issue, index = idx, error = %e, "Skipping unparsable article");
            }
        }
    }

    Ok(records)
}

/// Build one record from an article container.
fn parse_article(
    container: ElementRef,
    selectors: &TocSelectors,
    volume: u32,
    issue: u32,
    base_url: &str,
) -> Result<ArticleRecord> {
    let title_link = container
        .select(&selectors.title_link)
        .next()
        .ok_or_parse("missing title link")?;

    let title = title_link.text().collect::<String>().trim().to_string();
    if title.is_empty() {
        return Err(TocError::Parse("empty title".to_string()));
    }

    let href = title_link
        .value()
        .attr("href")
        .ok_or_parse("title link has no href")?
        .trim();

    let authors = join_authors(container.select(&selectors.author_item).filter_map(|item| {
        item.select(&selectors.author_name)
            .next()
            .map(|name| name.text().collect::<String>())
    }));

    Ok(ArticleRecord {
        volume,
        issue,
        year: year_from_volume(volume),
        title,
        authors,
        identifier: extract_identifier(href, &selectors.doi),
        link: absolute_link(base_url, href),
    })
}

/// Article identifier from a link such as `/doi/10.5465/255000`.
///
/// Absolute links are reduced to their path first, so the identifier does
/// not depend on whether the page used relative or absolute hrefs.
fn extract_identifier(href: &str, doi: &Regex) -> String {
    let parsed = Url::parse(href).ok();
    let path = parsed.as_ref().map(|u| u.path()).unwrap_or(href);

    if let Some(caps) = doi.captures(path) {
        if let Some(m) = caps.get(1) {
            return m.as_str().to_string();
        }
    }
    path.replacen(DOI_PREFIX, "", 1)
}

fn absolute_link(base_url: &str, href: &str) -> String {
    if href.starts_with("http://") || href.starts_with("https://") {
        href.to_string()
    } else if href.starts_with('/') {
        format!("{}{}", base_url, href)
    } else {
        format!("{}/{}", base_url, href)
    }
}
