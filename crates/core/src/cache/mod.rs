//! In-memory cache for upstream search results.
//!
//! This module provides a process-wide, TTL-bounded cache keyed by
//! `(query, page)`. It supports:
//!
//! - Lazy expiry: entries past their deadline read as absent
//! - Upsert semantics with last-writer-wins on concurrent fills
//! - An injectable clock so expiry can be driven from tests
//! - An optional sweep that drops dead entries

pub mod clock;
pub mod search;

pub use clock::{Clock, ManualClock, SystemClock};
pub use search::{CacheEntry, SearchCache};
