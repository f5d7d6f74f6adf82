//! Typed records for the cached sheet resources.
//!
//! Each record type maps one spreadsheet row positionally into named fields:
//!
//! - `CalendarEvent`: public calendar entries with a date range
//! - `TeamMember`: team roster entries (the durable-cache resource)
//! - `Webinar`: webinar listings with a date range
//!
//! Row parsing fails closed: rows missing required cells are dropped.

pub mod event;
pub mod record;
pub mod team;
pub mod webinar;

pub use event::CalendarEvent;
pub use record::{parse_day, Scheduled, SheetRecord};
pub use team::TeamMember;
pub use webinar::Webinar;
