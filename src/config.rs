//! Application configuration management.
//!
//! Configuration comes from the process environment (optionally seeded from a
//! `.env` file by the binary). The spreadsheet id and API key are carried as
//! `Option` rather than validated up front: a missing value fails fast at
//! fetch time and surfaces through the cache as a configuration error, so a
//! misconfigured deployment still renders whatever is cached.

use std::env;

/// Environment variable holding the spreadsheet document id
pub const SPREADSHEET_ID_VAR: &str = "SHEETS_SPREADSHEET_ID";

/// Environment variable holding the Google API key
pub const API_KEY_VAR: &str = "SHEETS_API_KEY";

const EVENTS_TAB_VAR: &str = "SHEETS_EVENTS_TAB";
const TEAM_TAB_VAR: &str = "SHEETS_TEAM_TAB";
const WEBINARS_TAB_VAR: &str = "SHEETS_WEBINARS_TAB";

/// Default tab names, used when the corresponding variable is absent
const DEFAULT_EVENTS_TAB: &str = "Events";
const DEFAULT_TEAM_TAB: &str = "Team";
const DEFAULT_WEBINARS_TAB: &str = "Webinars";

#[derive(Debug, Clone, Default)]
pub struct Config {
    pub spreadsheet_id: Option<String>,
    pub api_key: Option<String>,
    pub events_tab: String,
    pub team_tab: String,
    pub webinars_tab: String,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            spreadsheet_id: non_empty(env::var(SPREADSHEET_ID_VAR).ok()),
            api_key: non_empty(env::var(API_KEY_VAR).ok()),
            events_tab: tab_or_default(EVENTS_TAB_VAR, DEFAULT_EVENTS_TAB),
            team_tab: tab_or_default(TEAM_TAB_VAR, DEFAULT_TEAM_TAB),
            webinars_tab: tab_or_default(WEBINARS_TAB_VAR, DEFAULT_WEBINARS_TAB),
        }
    }
}

fn tab_or_default(var: &str, default: &str) -> String {
    non_empty(env::var(var).ok()).unwrap_or_else(|| default.to_string())
}

/// Treat empty or whitespace-only values as absent
fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
