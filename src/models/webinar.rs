use serde::{Deserialize, Serialize};

use super::record::{optional, required, Scheduled, SheetRecord};

/// A webinar listing row: title, start date, end date, then optional
/// speaker, registration link, and description columns.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Webinar {
    pub title: String,
    pub start_date: String,
    pub end_date: String,
    pub speaker: Option<String>,
    pub registration_url: Option<String>,
    pub description: Option<String>,
}

impl SheetRecord for Webinar {
    const RESOURCE_NAME: &'static str = "webinars";
    const TTL_MINUTES: i64 = 10;
    const TIMEOUT_SECS: u64 = 15;
    const RANGE: &'static str = "A2:F";

    fn from_row(row: &[String]) -> Option<Self> {
        Some(Self {
            title: required(row, 0)?,
            start_date: required(row, 1)?,
            end_date: required(row, 2)?,
            speaker: optional(row, 3),
            registration_url: optional(row, 4),
            description: optional(row, 5),
        })
    }
}

impl Scheduled for Webinar {
    fn start_date(&self) -> &str {
        &self.start_date
    }

    fn end_date(&self) -> &str {
        &self.end_date
    }
}
