//! Shared record traits and positional row parsing helpers.

use chrono::NaiveDate;

/// A typed record backed by one spreadsheet row.
///
/// `from_row` fails closed: a row missing any required field yields `None`
/// and is dropped from the result set, rather than producing a record with
/// silently-empty fields. One bad row never fails the whole fetch.
pub trait SheetRecord: Sized + Send + Sync + 'static {
    /// Stable name used for cache keys and log fields
    const RESOURCE_NAME: &'static str;

    /// Cache entries older than this are stale and must be revalidated
    const TTL_MINUTES: i64;

    /// Per-request HTTP timeout in seconds
    const TIMEOUT_SECS: u64;

    /// Cell range fetched from the tab, excluding the header row
    const RANGE: &'static str;

    fn from_row(row: &[String]) -> Option<Self>;
}

/// A record with an inclusive `[start, end]` calendar-day range.
///
/// Dates stay as strings on the record and are parsed on demand, so one
/// malformed date cannot poison operations over the other records.
pub trait Scheduled {
    fn start_date(&self) -> &str;
    fn end_date(&self) -> &str;
}

/// Required cell: present and non-blank, or the row is dropped
pub fn required(row: &[String], index: usize) -> Option<String> {
    let cell = row.get(index)?.trim();
    if cell.is_empty() {
        None
    } else {
        Some(cell.to_string())
    }
}

/// Optional cell: blank and missing both map to `None`
pub fn optional(row: &[String], index: usize) -> Option<String> {
    row.get(index)
        .map(|c| c.trim())
        .filter(|c| !c.is_empty())
        .map(String::from)
}

/// Parse a `YYYY-MM-DD` cell into a calendar day, tolerating a trailing
/// time component (sheets sometimes export `2025-12-24 00:00:00`).
pub fn parse_day(value: &str) -> Option<NaiveDate> {
    let day_part = value.trim().split_whitespace().next()?;
    NaiveDate::parse_from_str(day_part, "%Y-%m-%d").ok()
}
