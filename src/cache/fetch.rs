//! Fetch abstraction behind the resource cache.
//!
//! The cache only knows how to ask for "the current list of records"; the
//! production fetcher reads a sheet range and parses rows, while tests
//! inject closures with call counters and gates.

use futures::future::BoxFuture;
use futures::FutureExt;
use tracing::warn;

use crate::api::{FetchError, SheetRange, SheetsClient};
use crate::models::SheetRecord;

/// Producer of the current record list for one resource.
///
/// Any `Fn() -> Future<Output = Result<Vec<T>, FetchError>>` closure
/// qualifies via the blanket impl, which keeps test fetchers lightweight.
pub trait FetchRecords<T>: Send + Sync + 'static {
    fn fetch(&self) -> BoxFuture<'static, Result<Vec<T>, FetchError>>;
}

impl<T, F, Fut> FetchRecords<T> for F
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: std::future::Future<Output = Result<Vec<T>, FetchError>> + Send + 'static,
{
    fn fetch(&self) -> BoxFuture<'static, Result<Vec<T>, FetchError>> {
        (self)().boxed()
    }
}

/// Parse raw sheet rows into typed records, dropping rows that fail closed.
/// One malformed row never fails the whole fetch.
pub fn parse_rows<R: SheetRecord>(rows: &[Vec<String>]) -> Vec<R> {
    let records: Vec<R> = rows.iter().filter_map(|row| R::from_row(row)).collect();
    let dropped = rows.len() - records.len();
    if dropped > 0 {
        warn!(
            resource = R::RESOURCE_NAME,
            dropped,
            kept = records.len(),
            "Dropped malformed rows"
        );
    }
    records
}

/// Production fetcher: one sheet range, parsed into one record type.
pub fn sheet_fetcher<R: SheetRecord>(
    client: SheetsClient,
    sheet: SheetRange,
) -> impl FetchRecords<R> {
    move || {
        let client = client.clone();
        let sheet = sheet.clone();
        async move {
            let rows = client.fetch_rows(&sheet).await?;
            Ok(parse_rows::<R>(&rows))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CalendarEvent;

    fn row(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|c| c.to_string()).collect()
    }

    #[test]
    fn test_parse_rows_drops_only_malformed() {
        let rows = vec![
            row(&["One", "2026-01-01", "2026-01-01"]),
            row(&["Two", "2026-01-02", "2026-01-02"]),
            row(&["Bad", "", "2026-01-03"]),
            row(&["Four", "2026-01-04", "2026-01-04"]),
            row(&["Five", "2026-01-05", "2026-01-05"]),
        ];
        let records = parse_rows::<CalendarEvent>(&rows);
        assert_eq!(records.len(), 4);
        assert!(records.iter().all(|e| e.title != "Bad"));
    }

    #[test]
    fn test_parse_rows_empty_input() {
        let records = parse_rows::<CalendarEvent>(&[]);
        assert!(records.is_empty());
    }
}
