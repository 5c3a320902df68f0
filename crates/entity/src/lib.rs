//! Feature flag records and their evaluation preparation.
//!
//! The record types in [`models`] mirror the upstream flag service's JSON
//! shape. The cache treats them as opaque payloads; the only thing it does with
//! them is [`Flag::prepare`], which validates a record and precomputes what
//! an evaluator needs.

pub mod error;
pub mod evaluation;
pub mod models;

pub use crate::evaluation::{Condition, FlagEvaluation, Operator, PreparedFlag, SegmentEvaluation};
pub use crate::models::{Constraint, Distribution, Flag, Segment, Variant};
