//! Entity Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};

/// A preparation error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for entity operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// Every one of these means the flag data itself is wrong. Fetching the same
/// data again will fail in exactly the same way.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// Top-level frame naming the flag that could not be prepared.
    #[display("failed to prepare flag (id: {id}, key: {key:?}) for evaluation")]
    Preparation { id: u64, key: String },
    /// Segment rollout must be a percentage.
    #[display("segment {segment} has rollout percent {percent}, must be at most 100")]
    RolloutPercent { segment: u64, percent: u32 },
    /// A constraint was stored without a property to compare against.
    #[display("constraint {_0} has an empty property")]
    EmptyProperty(#[error(not(source))] u64),
    #[display("unknown constraint operator: {_0}")]
    Operator(#[error(not(source))] String),
    /// The constraint value cannot be used with its operator.
    #[display("constraint on '{property}' has invalid value for {operator}: {value}")]
    ConstraintValue { property: String, operator: String, value: String },
    /// A distribution points at a variant the flag does not own.
    #[display("distribution {distribution} references unknown variant {variant}")]
    UnknownVariant { distribution: u64, variant: u64 },
    /// Distribution percents within one segment must add up to exactly 100.
    #[display("segment {segment} distribution percents sum to {sum}, expected 100")]
    DistributionSum { segment: u64, sum: u32 },
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        // Only upstream data changes can fix a preparation failure.
        false
    }
}
