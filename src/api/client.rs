//! HTTP client for the Google Sheets `values` read endpoint.
//!
//! This module provides the `SheetsClient` for fetching rows from a named tab
//! of a hosted spreadsheet. Requests are authenticated with an API key passed
//! as a query parameter; no OAuth flow is involved.

use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::config;

use super::FetchError;

// ============================================================================
// Constants
// ============================================================================

/// Base URL for the Sheets v4 values endpoint
const SHEETS_BASE_URL: &str = "https://sheets.googleapis.com/v4/spreadsheets";

/// Maximum number of retries for transient failures (timeouts, 5xx).
/// Rate limiting (429) is never retried automatically.
const MAX_TRANSIENT_RETRIES: u32 = 2;

/// Initial backoff delay in milliseconds between retries.
const INITIAL_BACKOFF_MS: u64 = 500;

/// A fully-addressed read range: document, credentials, tab, and cell range.
///
/// The id and key are optional so a misconfigured environment fails at fetch
/// time with a `MissingConfig` error instead of at startup.
#[derive(Debug, Clone)]
pub struct SheetRange {
    pub spreadsheet_id: Option<String>,
    pub api_key: Option<String>,
    pub tab: String,
    pub range: String,
}

impl SheetRange {
    fn credentials(&self) -> Result<(&str, &str), FetchError> {
        let id = self
            .spreadsheet_id
            .as_deref()
            .ok_or(FetchError::MissingConfig(config::SPREADSHEET_ID_VAR))?;
        let key = self
            .api_key
            .as_deref()
            .ok_or(FetchError::MissingConfig(config::API_KEY_VAR))?;
        Ok((id, key))
    }
}

/// Wire type for the values endpoint. An empty sheet omits `values` entirely,
/// which is a legitimate "no records" response, not an error.
#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<String>>,
}

/// Sheets API client.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct SheetsClient {
    client: Client,
    base_url: String,
}

impl SheetsClient {
    /// Create a client with a per-request timeout. Each resource type builds
    /// its own client so slow feeds get a longer budget than fast ones.
    pub fn new(timeout: Duration) -> Result<Self, FetchError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: SHEETS_BASE_URL.to_string(),
        })
    }

    #[cfg(test)]
    fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.to_string();
        self
    }

    fn values_url(&self, spreadsheet_id: &str, tab: &str, range: &str) -> String {
        format!("{}/{}/values/{}!{}", self.base_url, spreadsheet_id, tab, range)
    }

    /// Fetch all rows of the given range as a 2D array of string cells.
    ///
    /// Transient failures are retried with exponential backoff; configuration,
    /// permission, and rate-limit errors surface on the first attempt.
    pub async fn fetch_rows(&self, sheet: &SheetRange) -> Result<Vec<Vec<String>>, FetchError> {
        let (spreadsheet_id, api_key) = sheet.credentials()?;
        let url = self.values_url(spreadsheet_id, &sheet.tab, &sheet.range);

        let mut attempt = 0;
        let mut backoff_ms = INITIAL_BACKOFF_MS;

        loop {
            match self.fetch_once(&url, api_key).await {
                Ok(rows) => {
                    debug!(tab = %sheet.tab, rows = rows.len(), "Fetched sheet range");
                    return Ok(rows);
                }
                Err(e) if e.is_transient() && attempt < MAX_TRANSIENT_RETRIES => {
                    attempt += 1;
                    warn!(
                        tab = %sheet.tab,
                        attempt,
                        backoff_ms,
                        error = %e,
                        "Transient fetch failure, backing off"
                    );
                    tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
                    backoff_ms *= 2;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn fetch_once(&self, url: &str, api_key: &str) -> Result<Vec<Vec<String>>, FetchError> {
        let response = self
            .client
            .get(url)
            .query(&[("key", api_key)])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(FetchError::from_status(status, &body));
        }

        let parsed: ValueRange = response
            .json()
            .await
            .map_err(|e| FetchError::InvalidResponse(format!("Failed to parse values: {}", e)))?;

        Ok(parsed.values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn range(id: Option<&str>, key: Option<&str>) -> SheetRange {
        SheetRange {
            spreadsheet_id: id.map(String::from),
            api_key: key.map(String::from),
            tab: "Events".to_string(),
            range: "A2:F".to_string(),
        }
    }

    #[test]
    fn test_missing_config_fails_before_any_request() {
        let missing_id = range(None, Some("k")).credentials().unwrap_err();
        assert!(matches!(
            missing_id,
            FetchError::MissingConfig(config::SPREADSHEET_ID_VAR)
        ));

        let missing_key = range(Some("doc"), None).credentials().unwrap_err();
        assert!(matches!(
            missing_key,
            FetchError::MissingConfig(config::API_KEY_VAR)
        ));
    }

    #[test]
    fn test_values_url_shape() {
        let client = SheetsClient::new(Duration::from_secs(1))
            .unwrap()
            .with_base_url("https://example.test/v4/spreadsheets");
        assert_eq!(
            client.values_url("doc123", "Events", "A2:F"),
            "https://example.test/v4/spreadsheets/doc123/values/Events!A2:F"
        );
    }

    #[test]
    fn test_parse_value_range() {
        let json = r#"{"range":"Events!A2:F","majorDimension":"ROWS","values":[["Retreat","2025-12-24","2025-12-26"],["Standup","2026-01-05","2026-01-05"]]}"#;
        let parsed: ValueRange = serde_json::from_str(json).expect("valid value range");
        assert_eq!(parsed.values.len(), 2);
        assert_eq!(parsed.values[0][0], "Retreat");
    }

    #[test]
    fn test_parse_empty_sheet_omits_values() {
        let json = r#"{"range":"Team!A2:E","majorDimension":"ROWS"}"#;
        let parsed: ValueRange = serde_json::from_str(json).expect("valid empty range");
        assert!(parsed.values.is_empty());
    }
}
