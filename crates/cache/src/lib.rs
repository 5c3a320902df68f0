//! In-memory evaluation cache for feature flags.
//!
//! The cache holds one immutable [`Snapshot`] of every flag, prepared for
//! evaluation and indexed by ID and by key. Refreshing builds a whole new
//! snapshot from the configured source and swaps it in atomically, so readers
//! only ever see complete generations and a failed refresh never costs them
//! the data they already had.
//!
//! # Architecture
//! - [`Snapshot`]: one generation of prepared flags, both indexes built from
//!   the same fetch.
//! - [`EvalCache`]: owns the current snapshot and runs refreshes.
//! - [`Refresher`]: drives [`EvalCache::refresh`] on an interval until
//!   cancelled.

mod cache;
pub mod error;
mod refresh;
mod snapshot;

pub use crate::cache::{EvalCache, RefreshStats};
pub use crate::refresh::Refresher;
pub use crate::snapshot::Snapshot;
