use std::sync::atomic::{AtomicUsize, Ordering};

use crate::models::SourceRow;
use crate::source::{RowSource, StaticSource};

/// Closers by net kW: Amy Smith 15.0, Jo Smith 7.0, Bo Li 2.0.
/// Setters by conversion: Carl Diaz 100%, Dana Fox 66.7%, Eve Park 0%.
pub const SALES_SHEET: &str = "\
Customer,Closer Name,Closer Team,Setter Name,Setter Region,System_Size,Realization
\"Doe, Jane\",Amy Smith,North,Carl Diaz,West,9000,1
Ray Moe,Amy Smith,North,Carl Diaz,West,6000,1
Lia Poe,Jo Smith,North,Dana Fox,West,7000,1
Kim Roe,Bo Li,South,Dana Fox,East,2000,1
Ned Yu,Bo Li,South,Dana Fox,East,4000,0
Pat Ode,,South,Eve Park,East,5000,0
Sam Ito,Eve Park,South,Eve Park,East,3000,2
";

/// Counts how many times the sheet was fetched.
pub struct CountingSource {
    inner: StaticSource,
    fetches: AtomicUsize,
}

impl CountingSource {
    pub fn new(body: &str) -> Self {
        Self {
            inner: StaticSource::from_text(body, crate::config::DEFAULT_MAX_ROWS),
            fetches: AtomicUsize::new(0),
        }
    }

    pub fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

impl RowSource for CountingSource {
    async fn fetch_rows(&self) -> Vec<SourceRow> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        self.inner.fetch_rows().await
    }
}

/// Behaves like a sheet that timed out.
pub struct UnavailableSource;

impl RowSource for UnavailableSource {
    async fn fetch_rows(&self) -> Vec<SourceRow> {
        Vec::new()
    }
}
