//! sheetcache - a single-flight, TTL-bounded cache for slowly-changing
//! resource lists read from a hosted spreadsheet.
//!
//! Three resources are served: calendar events, team members, and webinar
//! listings, each backed by one tab of a Google Sheet. Any number of
//! consumers share one `ResourceCache` per resource; the cache guarantees at
//! most one fetch in flight, serves repeat requests inside the TTL window
//! from memory, and keeps showing the last good records while a failed or
//! background refresh sorts itself out.

pub mod api;
pub mod cache;
pub mod config;
pub mod models;

use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;

use api::{FetchError, SheetRange, SheetsClient};
use cache::{sheet_fetcher, DiskStore, ResourceCache};
use config::Config;
use models::SheetRecord;

fn sheet_range<R: SheetRecord>(config: &Config, tab: &str) -> SheetRange {
    SheetRange {
        spreadsheet_id: config.spreadsheet_id.clone(),
        api_key: config.api_key.clone(),
        tab: tab.to_string(),
        range: R::RANGE.to_string(),
    }
}

/// Build the in-memory cache for a resource type, wired to its sheet tab
/// with the resource's own TTL and request timeout.
pub fn build_cache<R: SheetRecord>(
    config: &Config,
    tab: &str,
) -> Result<ResourceCache<R>, FetchError> {
    let client = SheetsClient::new(Duration::from_secs(R::TIMEOUT_SECS))?;
    Ok(ResourceCache::new(
        R::RESOURCE_NAME,
        R::TTL_MINUTES,
        sheet_fetcher::<R>(client, sheet_range::<R>(config, tab)),
    ))
}

/// Build the durable variant: seeded from the disk copy when fresh enough,
/// persisted back on every successful fetch.
pub fn build_durable_cache<R>(
    config: &Config,
    tab: &str,
    store: DiskStore,
) -> Result<ResourceCache<R>, FetchError>
where
    R: SheetRecord + Serialize + DeserializeOwned,
{
    let client = SheetsClient::new(Duration::from_secs(R::TIMEOUT_SECS))?;
    Ok(ResourceCache::with_store(
        R::RESOURCE_NAME,
        R::TTL_MINUTES,
        sheet_fetcher::<R>(client, sheet_range::<R>(config, tab)),
        store,
    ))
}
