//! Parsing of per-company question CSV files

use std::path::Path;

use csv::{ReaderBuilder, StringRecord, Trim};
use once_cell::sync::Lazy;
use regex::Regex;

use super::IngestError;
use crate::model::Difficulty;

static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

const TITLE_COLUMNS: &[&str] = &["Title"];
const URL_COLUMNS: &[&str] = &["URL", "Link"];
const DIFFICULTY_COLUMNS: &[&str] = &["Difficulty"];
const ACCEPTANCE_COLUMNS: &[&str] = &["Acceptance %", "Acceptance"];
const FREQUENCY_COLUMNS: &[&str] = &["Frequency %", "Frequency"];

/// One usable row of a company CSV
#[derive(Debug, Clone, PartialEq)]
pub struct CsvQuestion {
    pub title: String,
    pub url: String,
    pub difficulty: Difficulty,
    pub acceptance_rate: f64,
    pub frequency: f64,
}

/// Rows read from one file, plus how many were dropped
#[derive(Debug, Default)]
pub struct ParsedFile {
    pub rows: Vec<CsvQuestion>,
    pub skipped: usize,
}

/// Parse a percentage such as `"37.5%"` into a fraction (0.375).
///
/// Empty or non-numeric input yields 0. The result is clamped to [0, 1].
pub fn parse_percent(raw: &str) -> f64 {
    let trimmed = raw.trim();
    let number = trimmed.strip_suffix('%').unwrap_or(trimmed).trim();

    match number.parse::<f64>() {
        Ok(value) if value.is_finite() => (value / 100.0).clamp(0.0, 1.0),
        _ => 0.0,
    }
}

/// Derive a question id from its URL, falling back to the title.
///
/// The id is the last non-empty path segment of the URL, lowercased. When
/// the URL has no usable segment the title is lowercased with whitespace runs
/// collapsed to single hyphens.
pub fn derive_slug(url: &str, title: &str) -> String {
    let without_query = url.trim().split(['?', '#']).next().unwrap_or_default();
    let path = match without_query.split_once("://") {
        Some((_, rest)) => rest.split_once('/').map_or("", |(_, path)| path),
        None => without_query,
    };

    match path.split('/').map(str::trim).rev().find(|segment| !segment.is_empty()) {
        Some(segment) => segment.to_lowercase(),
        None => WHITESPACE_RE.replace_all(title.trim(), "-").to_lowercase(),
    }
}

/// Column positions resolved from the header row
struct Columns {
    title: Vec<usize>,
    url: Vec<usize>,
    difficulty: Vec<usize>,
    acceptance: Vec<usize>,
    frequency: Vec<usize>,
}

impl Columns {
    fn resolve(headers: &StringRecord) -> Self {
        let find = |names: &[&str]| -> Vec<usize> {
            names.iter().filter_map(|name| headers.iter().position(|h| h == *name)).collect()
        };

        Self {
            title: find(TITLE_COLUMNS),
            url: find(URL_COLUMNS),
            difficulty: find(DIFFICULTY_COLUMNS),
            acceptance: find(ACCEPTANCE_COLUMNS),
            frequency: find(FREQUENCY_COLUMNS),
        }
    }
}

/// First non-empty value among the candidate columns
fn field<'r>(record: &'r StringRecord, columns: &[usize]) -> Option<&'r str> {
    columns.iter().filter_map(|&i| record.get(i)).find(|value| !value.is_empty())
}

fn parse_record(record: &StringRecord, columns: &Columns) -> Option<CsvQuestion> {
    let title = field(record, &columns.title)?;
    let url = field(record, &columns.url)?;
    let difficulty = Difficulty::parse(field(record, &columns.difficulty)?)?;

    Some(CsvQuestion {
        title: title.to_string(),
        url: url.to_string(),
        difficulty,
        acceptance_rate: field(record, &columns.acceptance).map_or(0.0, parse_percent),
        frequency: field(record, &columns.frequency).map_or(0.0, parse_percent),
    })
}

/// Read every usable row from a CSV file.
///
/// Rows missing a title, URL or recognizable difficulty are skipped, as are
/// rows that fail to decode. Only a file that cannot be opened or whose header
/// cannot be read is an error.
pub fn read_company_file(path: &Path) -> Result<ParsedFile, IngestError> {
    let csv_error = |source| IngestError::Csv { path: path.to_path_buf(), source };

    let mut reader =
        ReaderBuilder::new().trim(Trim::All).flexible(true).from_path(path).map_err(csv_error)?;
    let columns = Columns::resolve(reader.headers().map_err(csv_error)?);

    let mut parsed = ParsedFile::default();
    for result in reader.records() {
        let question = match result {
            Ok(record) => parse_record(&record, &columns),
            Err(e) => {
                tracing::debug!("Undecodable row in {:?}: {}", path, e);
                None
            }
        };

        match question {
            Some(question) => parsed.rows.push(question),
            None => parsed.skipped += 1,
        }
    }

    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn parse_percent_with_suffix() {
        assert_eq!(parse_percent("37.5%"), 0.375);
        assert_eq!(parse_percent(" 50 % "), 0.5);
        assert_eq!(parse_percent("100"), 1.0);
    }

    #[test]
    fn parse_percent_defaults_to_zero() {
        assert_eq!(parse_percent(""), 0.0);
        assert_eq!(parse_percent("n/a"), 0.0);
        assert_eq!(parse_percent("%"), 0.0);
        assert_eq!(parse_percent("NaN"), 0.0);
    }

    #[test]
    fn slug_from_url() {
        assert_eq!(derive_slug("https://leetcode.com/problems/Two-Sum", "Two Sum"), "two-sum");
        assert_eq!(derive_slug("https://leetcode.com/problems/two-sum/", "Two Sum"), "two-sum");
        assert_eq!(
            derive_slug("https://leetcode.com/problems/lru-cache?envType=study", "LRU Cache"),
            "lru-cache"
        );
    }

    #[test]
    fn slug_falls_back_to_title() {
        assert_eq!(derive_slug("https://leetcode.com", "Two  Sum\tII"), "two-sum-ii");
        assert_eq!(derive_slug("", "Valid Parentheses"), "valid-parentheses");
    }

    #[test]
    fn reads_rows_and_counts_skips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("thirty-days.csv");
        std::fs::write(
            &path,
            "Difficulty,Title,Frequency %,Acceptance %,Link,Topics\n\
             EASY,Two Sum,100.0%,25.0%,https://leetcode.com/problems/two-sum,\"Array, Hash\"\n\
             MEDIUM,,40%,30%,https://leetcode.com/problems/missing-title,\n\
             HARD,No Link,10%,20%,,\n\
             HARD,\"Pow(x, n)\",,abc,https://leetcode.com/problems/powx-n,Math\n",
        )
        .unwrap();

        let parsed = read_company_file(&path).unwrap();
        assert_eq!(parsed.skipped, 2);
        assert_eq!(parsed.rows.len(), 2);

        assert_eq!(
            parsed.rows[0],
            CsvQuestion {
                title: "Two Sum".to_string(),
                url: "https://leetcode.com/problems/two-sum".to_string(),
                difficulty: Difficulty::Easy,
                acceptance_rate: 0.25,
                frequency: 1.0,
            }
        );
        assert_eq!(parsed.rows[1].title, "Pow(x, n)");
        assert_eq!(parsed.rows[1].acceptance_rate, 0.0);
        assert_eq!(parsed.rows[1].frequency, 0.0);
    }

    #[test]
    fn url_column_is_preferred_over_link() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("all.csv");
        std::fs::write(
            &path,
            "Title,URL,Link,Difficulty\n\
             Two Sum,https://a.example/two-sum,https://b.example/other,Easy\n\
             Three Sum,,https://b.example/3sum,Medium\n",
        )
        .unwrap();

        let parsed = read_company_file(&path).unwrap();
        assert_eq!(parsed.rows[0].url, "https://a.example/two-sum");
        assert_eq!(parsed.rows[1].url, "https://b.example/3sum");
    }

    proptest! {
        #[test]
        fn parse_percent_stays_in_unit_range(raw in ".*") {
            let value = parse_percent(&raw);
            prop_assert!((0.0..=1.0).contains(&value));
        }
    }
}
