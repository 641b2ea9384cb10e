use crate::error::{FetcherError, Result};
use std::fs::File;
use std::io::Read;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info, instrument};

/// One data line of a feed. Values are kept as the raw CSV text; typed
/// access goes through the helpers below.
#[derive(Debug, Clone, PartialEq)]
pub struct RawRow {
    /// 1-based data line number (header excluded)
    pub line: usize,
    pub fields: Vec<String>,
}

impl RawRow {
    /// Raw cell text, trimmed. Missing trailing cells read as empty.
    pub fn text(&self, index: usize) -> &str {
        self.fields.get(index).map(|s| s.trim()).unwrap_or("")
    }

    /// Non-empty cell text, or `None` for a blank cell.
    pub fn opt_text(&self, index: usize) -> Option<&str> {
        let value = self.text(index);
        if value.is_empty() || value.eq_ignore_ascii_case("nan") {
            None
        } else {
            Some(value)
        }
    }

    /// Integer cell. Blank cells are `None`; integral floats such as
    /// `"12.0"` are accepted when they fit in an `i64`; anything else is an
    /// error.
    pub fn int(&self, index: usize, column: &str) -> Result<Option<i64>> {
        let Some(value) = self.opt_text(index) else {
            return Ok(None);
        };
        if let Ok(n) = value.parse::<i64>() {
            return Ok(Some(n));
        }
        match value.parse::<f64>() {
            // i64::MAX as f64 rounds up to 2^63, which is out of range
            Ok(f) if f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64 => {
                Ok(Some(f as i64))
            }
            _ => Err(FetcherError::InvalidNumber {
                line: self.line,
                column: column.to_string(),
                value: value.to_string(),
            }),
        }
    }
}

/// In-memory table as returned by a feed reader.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<RawRow>,
}

impl Table {
    /// Parse CSV with a header line.
    pub fn from_csv<R: Read>(reader: R) -> Result<Self> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(reader);

        let columns = csv_reader
            .headers()?
            .iter()
            .map(|h| h.trim_start_matches('\u{feff}').trim().to_string())
            .collect();

        let mut rows = Vec::new();
        for (idx, result) in csv_reader.records().enumerate() {
            let record = result?;
            rows.push(RawRow {
                line: idx + 1,
                fields: record.iter().map(|s| s.to_string()).collect(),
            });
        }

        Ok(Self { columns, rows })
    }

    /// Position of a named column; a missing column means the feed schema
    /// drifted and the run cannot continue.
    pub fn column_index(&self, source_code: &str, column: &str) -> Result<usize> {
        self.columns
            .iter()
            .position(|c| c == column)
            .ok_or_else(|| FetcherError::MissingColumn {
                source_code: source_code.to_string(),
                column: column.to_string(),
            })
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Retrieval transport for feed snapshots.
pub trait FeedReader {
    fn fetch(&self, url: &str) -> Result<Table>;
}

/// Blocking HTTP GET of a CSV endpoint.
pub struct HttpFeedReader {
    client: reqwest::blocking::Client,
}

impl HttpFeedReader {
    pub fn new(timeout: Duration, user_agent: &str) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()?;
        Ok(Self { client })
    }
}

impl FeedReader for HttpFeedReader {
    #[instrument(skip(self))]
    fn fetch(&self, url: &str) -> Result<Table> {
        let response = self.client.get(url).send()?.error_for_status()?;
        let body = response.bytes()?;
        debug!("Downloaded {} bytes", body.len());
        let table = Table::from_csv(body.as_ref())?;
        info!("Fetched {} rows ({} columns)", table.len(), table.columns.len());
        Ok(table)
    }
}

/// Reads a local CSV snapshot instead of the remote endpoint.
pub struct FileFeedReader {
    path: PathBuf,
}

impl FileFeedReader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl FeedReader for FileFeedReader {
    fn fetch(&self, url: &str) -> Result<Table> {
        debug!("Reading {} in place of {}", self.path.display(), url);
        let file = File::open(&self.path)?;
        Table::from_csv(file)
    }
}
