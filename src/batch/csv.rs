//! CSV parsing for batch input.
//!
//! The format is deliberately forgiving: the header row is matched
//! case-insensitively, a `url` (or `urls`) column is required, and any
//! column whose name mentions "keyword" or "primary" supplies seed
//! keywords. Quoted fields may contain commas.

use super::{BatchItem, MAX_URLS};
use crate::error::Error;
use url::Url;

pub fn parse_batch_csv(text: &str) -> Result<Vec<BatchItem>, Error> {
    let mut lines = text.lines().filter(|l| !l.trim().is_empty());

    let header = lines
        .next()
        .ok_or_else(|| Error::Validation("CSV file is empty".to_string()))?;
    let columns: Vec<String> = header
        .split(',')
        .map(|c| c.trim().trim_matches('"').to_lowercase())
        .collect();

    let url_col = columns
        .iter()
        .position(|c| c == "url" || c == "urls")
        .ok_or_else(|| Error::Validation("CSV must have a \"url\" column".to_string()))?;
    let keyword_col = columns
        .iter()
        .position(|c| c.contains("keyword") || c.contains("primary"));

    let mut items = Vec::new();
    for line in lines {
        let fields = split_csv_line(line);

        let Some(raw_url) = fields.get(url_col).map(|f| f.trim()) else {
            continue;
        };
        if Url::parse(raw_url).is_err() {
            ::log::debug!("Skipping invalid URL in CSV: {}", raw_url);
            continue;
        }

        let keywords = keyword_col
            .and_then(|col| fields.get(col))
            .map(|raw| {
                raw.split([',', ';'])
                    .map(|k| k.trim().to_string())
                    .filter(|k| !k.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        if items.len() >= MAX_URLS {
            ::log::warn!("CSV has more than {} URLs, ignoring the rest", MAX_URLS);
            break;
        }
        items.push(BatchItem {
            url: raw_url.to_string(),
            keywords,
        });
    }

    Ok(items)
}

/// Splits one CSV line on commas, honoring double-quoted fields
fn split_csv_line(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;

    for c in line.chars() {
        match c {
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => {
                fields.push(current.trim().to_string());
                current.clear();
            }
            _ => current.push(c),
        }
    }
    fields.push(current.trim().to_string());

    fields
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_urls_and_keywords() {
        let csv = "url,primary keyword\n\
                   https://example.com/a,widgets\n\
                   https://example.com/b,gadgets";
        let items = parse_batch_csv(csv).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].url, "https://example.com/a");
        assert_eq!(items[0].keywords, vec!["widgets"]);
    }

    #[test]
    fn test_quoted_field_keeps_commas_and_splits_keywords() {
        let csv = "url,keywords\n\
                   https://example.com,\"seo, schema; markup\"";
        let items = parse_batch_csv(csv).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].keywords, vec!["seo", "schema", "markup"]);
    }

    #[test]
    fn test_missing_url_column_is_rejected() {
        let err = parse_batch_csv("page,keyword\nhttps://example.com,x").unwrap_err();
        assert!(err.is_validation());
        assert!(err.to_string().contains("\"url\""));
    }

    #[test]
    fn test_invalid_urls_are_skipped() {
        let csv = "url\nnot a url\nhttps://example.com\n\n";
        let items = parse_batch_csv(csv).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].url, "https://example.com");
    }

    #[test]
    fn test_urls_header_variant_and_extra_columns() {
        let csv = "name,urls,notes\nhome,https://example.com,ignore me";
        let items = parse_batch_csv(csv).unwrap();
        assert_eq!(items.len(), 1);
        assert!(items[0].keywords.is_empty());
    }

    #[test]
    fn test_rows_beyond_cap_are_dropped() {
        let mut csv = String::from("url\n");
        for i in 0..30 {
            csv.push_str(&format!("https://site{}.example\n", i));
        }
        let items = parse_batch_csv(&csv).unwrap();
        assert_eq!(items.len(), MAX_URLS);
    }

    #[test]
    fn test_empty_file_is_rejected() {
        assert!(parse_batch_csv("").unwrap_err().is_validation());
        assert!(parse_batch_csv("\n\n").unwrap_err().is_validation());
    }
}
