//! Shared caching module.
//!
//! This module provides the `ResourceCache`: a single-flight, TTL-bounded,
//! stale-while-revalidate cache shared by every consumer of one remote
//! resource list. Supporting pieces:
//!
//! - `fetch`: the `FetchRecords` abstraction and the sheet-backed fetcher
//! - `store`: the durable on-disk copy used by the team-members resource
//! - `active`: selection of the record whose date range covers today

pub mod active;
pub mod fetch;
pub mod manager;
pub mod store;

pub use active::active_record;
pub use fetch::{sheet_fetcher, FetchRecords};
pub use manager::{CacheView, ResourceCache, RevalidatorHandle, Snapshot, VisibilitySignal};
pub use store::DiskStore;
