//! Google Sheets read-API client module.
//!
//! This module provides the `SheetsClient` for fetching rows from a hosted
//! spreadsheet's `values` endpoint, and the `FetchError` taxonomy shared by
//! everything that talks to the network.
//!
//! Authentication is a caller-supplied API key passed as a query parameter.

pub mod client;
pub mod error;

pub use client::{SheetRange, SheetsClient};
pub use error::FetchError;
