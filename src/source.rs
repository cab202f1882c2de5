//! Sales sheet ingestion.
//!
//! The sheet is a published CSV export whose columns drift over time, so
//! columns are located by substring match on the header instead of by
//! position. Every failure in here is recovered: callers of
//! [`RowSource::fetch_rows`] only ever see a (possibly empty) row list.

use std::future::Future;
use std::path::Path;

use anyhow::Context;
use reqwest::header::ACCEPT;
use reqwest::Client;
use tracing::{debug, info, instrument, warn};

use crate::config::SourceConfig;
use crate::error::SourceError;
use crate::models::SourceRow;

const USER_AGENT: &str = concat!("leadflow-assistant/", env!("CARGO_PKG_VERSION"));

/// Anything that can hand the assistant a fresh batch of sheet rows.
pub trait RowSource {
    fn fetch_rows(&self) -> impl Future<Output = Vec<SourceRow>> + Send;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnMap {
    pub closer: Option<usize>,
    pub setter: Option<usize>,
    pub system_size: usize,
    pub realization: usize,
}

fn header_matches(header: &str, needle: &str, excluded: &[&str]) -> bool {
    header.contains(needle) && !excluded.iter().any(|word| header.contains(word))
}

pub fn locate_columns(header: &[String]) -> Result<ColumnMap, SourceError> {
    let lowered: Vec<String> = header.iter().map(|name| name.to_lowercase()).collect();
    let find = |needle: &str, excluded: &[&str]| {
        lowered
            .iter()
            .position(|name| header_matches(name, needle, excluded))
    };

    let closer = find("closer", &["division", "region", "team"]);
    let setter = find("setter", &["division", "region"]);
    let system_size = find("system_size", &[]);
    let realization = find("realization", &[]);

    let mut missing = Vec::new();
    if closer.is_none() && setter.is_none() {
        missing.push("closer/setter");
    }
    if system_size.is_none() {
        missing.push("system_size");
    }
    if realization.is_none() {
        missing.push("realization");
    }

    match (system_size, realization) {
        (Some(system_size), Some(realization)) if missing.is_empty() => Ok(ColumnMap {
            closer,
            setter,
            system_size,
            realization,
        }),
        _ => Err(SourceError::MissingColumns(missing.join(", "))),
    }
}

/// Splits one line into fields, keeping quoted fields (with embedded commas)
/// whole. Falls back to a plain comma split when the reader yields nothing.
pub fn tokenize_line(line: &str) -> Vec<String> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(line.as_bytes());

    match reader.records().next() {
        Some(Ok(record)) if !record.is_empty() => record
            .iter()
            .map(|field| field.trim_matches('"').trim().to_string())
            .collect(),
        _ => split_on_commas(line),
    }
}

fn split_on_commas(line: &str) -> Vec<String> {
    line.split(',')
        .map(|field| field.trim().trim_matches('"').trim().to_string())
        .collect()
}

/// Empty cells count as zero; anything else must be numeric.
fn parse_number(raw: &str) -> Option<f64> {
    let cleaned: String = raw.chars().filter(|c| *c != ',' && !c.is_whitespace()).collect();
    if cleaned.is_empty() {
        return Some(0.0);
    }
    cleaned.parse::<f64>().ok().filter(|value| value.is_finite())
}

fn name_at(tokens: &[String], index: Option<usize>) -> Option<String> {
    index
        .and_then(|i| tokens.get(i))
        .map(|value| value.trim())
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

/// A placeholder size ("N/A", "-") on an unsold lead counts as 0 W so the
/// lead still reaches the setter's totals. Net deals need a real size.
fn parse_row(tokens: &[String], columns: &ColumnMap) -> Option<SourceRow> {
    let field = |index: usize| tokens.get(index).map(String::as_str).unwrap_or("");
    let realization_flag = parse_number(field(columns.realization))?;
    let watts = parse_number(field(columns.system_size));

    let row = SourceRow {
        closer_name: name_at(tokens, columns.closer),
        setter_name: name_at(tokens, columns.setter),
        system_size_kw: watts.unwrap_or(0.0) / 1000.0,
        realization_flag,
    };
    if watts.is_none() && row.is_realized() {
        return None;
    }
    Some(row)
}

pub fn parse_sheet(body: &str, max_rows: usize) -> Result<Vec<SourceRow>, SourceError> {
    let mut lines = body.lines().filter(|line| !line.trim().is_empty());
    let header = lines.next().ok_or(SourceError::EmptyBody)?;
    let columns = locate_columns(&tokenize_line(header))?;

    let mut rows = Vec::new();
    let mut skipped = 0usize;
    let mut seen = 0usize;

    for (line_num, line) in lines.take(max_rows).enumerate() {
        seen += 1;
        let tokens = tokenize_line(line);
        if tokens.len() < 3 {
            skipped += 1;
            continue;
        }
        match parse_row(&tokens, &columns) {
            Some(row) => rows.push(row),
            None => {
                skipped += 1;
                debug!(line = line_num + 2, "skipping unparseable sheet row");
            }
        }
    }

    if seen == 0 {
        return Err(SourceError::EmptyBody);
    }

    debug!(rows = rows.len(), skipped, "parsed sales sheet");
    Ok(rows)
}

// ---------------------------------------------------------------------------
// HTTP source
// ---------------------------------------------------------------------------

/// Fetches the published sheet over HTTP on every call.
#[derive(Debug, Clone)]
pub struct SheetSource {
    config: SourceConfig,
    client: Client,
}

impl SheetSource {
    pub fn new(config: SourceConfig) -> Result<Self, SourceError> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()?;
        Ok(Self { config, client })
    }

    async fn request_body(&self) -> Result<String, SourceError> {
        let response = self
            .client
            .get(&self.config.url)
            .header(ACCEPT, "text/csv")
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::Status(status.as_u16()));
        }
        Ok(response.text().await?)
    }

    /// The deadline covers connect, headers and body.
    async fn fetch_body(&self) -> Result<String, SourceError> {
        tokio::time::timeout(self.config.timeout, self.request_body())
            .await
            .map_err(|_elapsed| SourceError::Timeout(self.config.timeout))?
    }

    async fn try_fetch_rows(&self) -> Result<Vec<SourceRow>, SourceError> {
        let body = self.fetch_body().await?;
        parse_sheet(&body, self.config.max_rows)
    }
}

impl RowSource for SheetSource {
    #[instrument(skip_all, fields(url = %self.config.url))]
    async fn fetch_rows(&self) -> Vec<SourceRow> {
        match self.try_fetch_rows().await {
            Ok(rows) => {
                info!(rows = rows.len(), "fetched sales sheet");
                rows
            }
            Err(err) => {
                warn!(error = %err, "sales sheet unavailable");
                Vec::new()
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Fixed text source
// ---------------------------------------------------------------------------

/// Serves a CSV body held in memory, e.g. a local export or a test fixture.
#[derive(Debug, Clone)]
pub struct StaticSource {
    body: String,
    max_rows: usize,
}

impl StaticSource {
    pub fn from_text(body: impl Into<String>, max_rows: usize) -> Self {
        Self {
            body: body.into(),
            max_rows,
        }
    }

    pub fn from_path(path: &Path, max_rows: usize) -> anyhow::Result<Self> {
        let body = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read sheet export {}", path.display()))?;
        Ok(Self::from_text(body, max_rows))
    }
}

impl RowSource for StaticSource {
    async fn fetch_rows(&self) -> Vec<SourceRow> {
        parse_sheet(&self.body, self.max_rows).unwrap_or_else(|err| {
            warn!(error = %err, "sales sheet export unusable");
            Vec::new()
        })
    }
}
