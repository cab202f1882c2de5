use std::time::Duration;

/// Reasons a sheet fetch produced no rows. Always recovered inside the source.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("sheet responded with status {0}")]
    Status(u16),

    #[error("sheet fetch timed out after {0:?}")]
    Timeout(Duration),

    #[error("sheet body is empty or has no data rows")]
    EmptyBody,

    #[error("sheet header is missing required columns: {0}")]
    MissingColumns(String),
}
