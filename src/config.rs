use std::time::Duration;

/// Published export of the sales analytics sheet.
pub const DEFAULT_SHEET_URL: &str =
    "https://docs.google.com/spreadsheets/d/e/2PACX-1vLeadflowSalesAnalytics/pub?gid=0&single=true&output=csv";

pub const SHEET_URL_ENV: &str = "LEADFLOW_SHEET_URL";

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Rows past this cap are ignored so a growing sheet cannot stretch a chat turn.
pub const DEFAULT_MAX_ROWS: usize = 500;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceConfig {
    pub url: String,
    pub timeout: Duration,
    pub max_rows: usize,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_SHEET_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
            max_rows: DEFAULT_MAX_ROWS,
        }
    }
}

impl SourceConfig {
    /// Blank overrides count as absent.
    pub fn with_url_override(url: Option<String>) -> Self {
        let mut config = Self::default();
        if let Some(url) = url.filter(|value| !value.trim().is_empty()) {
            config.url = url.trim().to_string();
        }
        config
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn max_rows(mut self, max_rows: usize) -> Self {
        self.max_rows = max_rows;
        self
    }
}
