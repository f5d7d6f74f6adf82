use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::record::{optional, parse_day, required, Scheduled, SheetRecord};

/// A calendar event row: title, start date, end date, then optional
/// location, description, and link columns.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CalendarEvent {
    pub title: String,
    pub start_date: String,
    pub end_date: String,
    pub location: Option<String>,
    pub description: Option<String>,
    pub link: Option<String>,
}

impl SheetRecord for CalendarEvent {
    const RESOURCE_NAME: &'static str = "events";
    const TTL_MINUTES: i64 = 10;
    const TIMEOUT_SECS: u64 = 10;
    const RANGE: &'static str = "A2:F";

    fn from_row(row: &[String]) -> Option<Self> {
        Some(Self {
            title: required(row, 0)?,
            start_date: required(row, 1)?,
            end_date: required(row, 2)?,
            location: optional(row, 3),
            description: optional(row, 4),
            link: optional(row, 5),
        })
    }
}

impl Scheduled for CalendarEvent {
    fn start_date(&self) -> &str {
        &self.start_date
    }

    fn end_date(&self) -> &str {
        &self.end_date
    }
}

impl CalendarEvent {
    /// Start day as a calendar date, if the cell parses
    pub fn start_day(&self) -> Option<NaiveDate> {
        parse_day(&self.start_date)
    }

    /// "Dec 24 - Dec 26, 2025" for multi-day events, single date otherwise
    pub fn formatted_dates(&self) -> String {
        match (parse_day(&self.start_date), parse_day(&self.end_date)) {
            (Some(start), Some(end)) if start != end => format!(
                "{} - {}",
                start.format("%b %d"),
                end.format("%b %d, %Y")
            ),
            (Some(start), _) => start.format("%b %d, %Y").to_string(),
            _ => self.start_date.clone(),
        }
    }

    /// Whether this event starts strictly after the given day
    pub fn is_upcoming(&self, today: NaiveDate) -> bool {
        self.start_day().is_some_and(|d| d > today)
    }
}
