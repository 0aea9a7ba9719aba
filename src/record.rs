//! Article rows as they are written to the collector's CSV file.

use serde::Serialize;

/// Column order of every CSV file produced by the collector.
pub const CSV_HEADER: [&str; 7] = ["Volume", "Issue", "Year", "Title", "Authors", "DOI", "Link"];

/// Volume whose year anchors the volume -> year mapping.
const ANCHOR_VOLUME: i64 = 36;
/// Publication year of [`ANCHOR_VOLUME`].
const ANCHOR_YEAR: i64 = 1993;

/// One article listed on a table-of-contents page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArticleRecord {
    #[serde(rename = "Volume")]
    pub volume: u32,
    #[serde(rename = "Issue")]
    pub issue: u32,
    #[serde(rename = "Year")]
    pub year: i64,
    #[serde(rename = "Title")]
    pub title: String,
    /// Author names joined with `"; "`, empty when the page lists none
    #[serde(rename = "Authors")]
    pub authors: String,
    /// DOI taken from the article link path
    #[serde(rename = "DOI")]
    pub identifier: String,
    /// Absolute article URL
    #[serde(rename = "Link")]
    pub link: String,
}

/// Publication year of a journal volume. One volume spans one year.
///
/// Computed in `i64` so every `u32` volume maps without wrapping.
pub fn year_from_volume(volume: u32) -> i64 {
    ANCHOR_YEAR + (i64::from(volume) - ANCHOR_VOLUME)
}

/// Joins author names the way they are stored in the `Authors` column.
///
/// Names are trimmed and blank names are dropped, so a list never carries
/// an empty slot such as `"A; ; B"`.
pub fn join_authors<I, S>(names: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    names
        .into_iter()
        .map(|n| n.as_ref().trim().to_string())
        .filter(|n| !n.is_empty())
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_year_from_volume() {
        assert_eq!(year_from_volume(36), 1993);
        assert_eq!(year_from_volume(15), 1972);
        assert_eq!(year_from_volume(17), 1974);
        assert_eq!(year_from_volume(67), 2024);
    }

    #[test]
    fn test_year_for_huge_volumes_does_not_wrap() {
        assert_eq!(year_from_volume(2_147_483_648), 1993 + 2_147_483_648 - 36);
        assert_eq!(year_from_volume(u32::MAX), 1993 + 4_294_967_295 - 36);
        assert!(year_from_volume(u32::MAX) > year_from_volume(u32::MAX - 1));
    }

    #[test]
    fn test_year_is_monotonic() {
        for v in 1..200 {
            assert_eq!(year_from_volume(v + 1), year_from_volume(v) + 1);
        }
    }

    #[test]
    fn test_join_authors() {
        assert_eq!(join_authors([" Ann Lee ", "Bo Chen"]), "Ann Lee; Bo Chen");
        assert_eq!(join_authors(Vec::<String>::new()), "");
        assert_eq!(join_authors(["", "Solo"]), "Solo");
        assert_eq!(join_authors(["A", "  ", "B"]), "A; B");
    }

    #[test]
    fn test_serialized_header_matches_columns() -> Result<(), Box<dyn std::error::Error>> {
        let record = ArticleRecord {
            volume: 15,
            issue: 2,
            year: 1972,
            title: "Title, with comma".to_string(),
            authors: "A; B".to_string(),
            identifier: "10.5465/255000".to_string(),
            link: "https://journals.aom.org/doi/10.5465/255000".to_string(),
        };

        let mut wtr = csv::Writer::from_writer(Vec::new());
        wtr.serialize(&record)?;
        let bytes = wtr.into_inner().map_err(|_| "flush failed")?;
        let text = String::from_utf8(bytes)?;
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some(CSV_HEADER.join(",").as_str()));
        assert_eq!(
            lines.next(),
            Some("15,2,1972,\"Title, with comma\",A; B,10.5465/255000,https://journals.aom.org/doi/10.5465/255000")
        );
        Ok(())
    }
}
