//! Evaluation preparation.
//!
//! Turns a raw [`Flag`] into a [`PreparedFlag`]: every constraint is parsed
//! and compiled, segments are put in evaluation order, and distributions are
//! turned into cumulative bucket ranges. Anything malformed is rejected here,
//! so a flag that makes it into the cache is known to be evaluable.

mod condition;
mod operator;

pub use self::condition::Condition;
pub use self::operator::Operator;
use crate::error::{ErrorKind, Result};
use crate::models::{Flag, Segment, Variant};
use exn::ResultExt;
use serde_json::Value;
use std::collections::HashMap;
use tracing::instrument;

/// Number of buckets a segment's traffic is split into.
pub const TOTAL_BUCKETS: u32 = 1000;
/// Buckets per whole percent.
pub const PERCENT_MULTIPLIER: u32 = TOTAL_BUCKETS / 100;

/// A flag together with everything precomputed for evaluating it.
///
/// The cache hands these out behind an [`Arc`](std::sync::Arc); the same
/// instance is reachable by ID and by key.
#[derive(Debug, Clone)]
pub struct PreparedFlag {
    flag: Flag,
    evaluation: FlagEvaluation,
}
impl PreparedFlag {
    pub fn flag(&self) -> &Flag {
        &self.flag
    }

    pub fn evaluation(&self) -> &FlagEvaluation {
        &self.evaluation
    }

    pub fn id(&self) -> u64 {
        self.flag.id
    }

    pub fn key(&self) -> &str {
        &self.flag.key
    }

    /// Give back the original record, dropping the precomputed state.
    pub fn into_flag(self) -> Flag {
        self.flag
    }
}

#[derive(Debug, Clone, Default)]
pub struct FlagEvaluation {
    /// Segments ordered by rank (ties broken by ID).
    pub segments: Vec<SegmentEvaluation>,
    pub variants: HashMap<u64, Variant>,
}

#[derive(Debug, Clone)]
pub struct SegmentEvaluation {
    pub id: u64,
    pub rank: u32,
    pub rollout_percent: u32,
    pub conditions: Vec<Condition>,
    distribution: DistributionArray,
}
impl SegmentEvaluation {
    /// All conditions hold for `context` (vacuously true with no conditions).
    pub fn matches(&self, context: &Value) -> bool {
        self.conditions.iter().all(|c| c.matches(context))
    }

    /// Whether `bucket` falls inside the rolled-out share of this segment.
    pub fn in_rollout(&self, bucket: u32) -> bool {
        bucket < self.rollout_percent * PERCENT_MULTIPLIER
    }

    /// The variant ID serving `bucket` (`0..TOTAL_BUCKETS`), if any.
    pub fn variant_for_bucket(&self, bucket: u32) -> Option<u64> {
        self.distribution.lookup(bucket)
    }
}

/// Cumulative bucket boundaries: variant `i` serves buckets in
/// `accumulated[i-1]..accumulated[i]`.
#[derive(Debug, Clone, Default)]
struct DistributionArray {
    variant_ids: Vec<u64>,
    accumulated: Vec<u32>,
}
impl DistributionArray {
    fn lookup(&self, bucket: u32) -> Option<u64> {
        if bucket >= TOTAL_BUCKETS {
            return None;
        }
        let index = self.accumulated.partition_point(|&edge| edge <= bucket);
        self.variant_ids.get(index).copied()
    }
}

impl Flag {
    /// Validate this flag and precompute its evaluation state.
    ///
    /// The first problem found aborts preparation; the returned error names
    /// the flag and carries the specific cause as a child frame.
    #[instrument(level = "trace", skip(self), fields(id = self.id, key = %self.key))]
    pub fn prepare(self) -> Result<PreparedFlag> {
        let frame = || ErrorKind::Preparation { id: self.id, key: self.key.clone() };
        let evaluation = FlagEvaluation::try_from(&self).or_raise(frame)?;
        Ok(PreparedFlag { flag: self, evaluation })
    }
}

impl TryFrom<&Flag> for FlagEvaluation {
    type Error = crate::error::Error;
    fn try_from(flag: &Flag) -> Result<Self> {
        let variants: HashMap<u64, Variant> = flag.variants.iter().map(|v| (v.id, v.clone())).collect();
        let mut ordered: Vec<&Segment> = flag.segments.iter().collect();
        ordered.sort_by_key(|s| (s.rank, s.id));
        let segments = ordered
            .into_iter()
            .map(|segment| prepare_segment(segment, &variants))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { segments, variants })
    }
}

fn prepare_segment(segment: &Segment, variants: &HashMap<u64, Variant>) -> Result<SegmentEvaluation> {
    if segment.rollout_percent > 100 {
        exn::bail!(ErrorKind::RolloutPercent { segment: segment.id, percent: segment.rollout_percent });
    }
    let conditions = segment.constraints.iter().map(Condition::try_from).collect::<Result<Vec<_>>>()?;

    let mut distribution = DistributionArray::default();
    let mut sum = 0u32;
    for d in &segment.distributions {
        if !variants.contains_key(&d.variant_id) {
            exn::bail!(ErrorKind::UnknownVariant { distribution: d.id, variant: d.variant_id });
        }
        sum = sum.saturating_add(d.percent);
        distribution.variant_ids.push(d.variant_id);
        distribution.accumulated.push(sum.saturating_mul(PERCENT_MULTIPLIER));
    }
    if !segment.distributions.is_empty() && sum != 100 {
        exn::bail!(ErrorKind::DistributionSum { segment: segment.id, sum });
    }

    Ok(SegmentEvaluation {
        id: segment.id,
        rank: segment.rank,
        rollout_percent: segment.rollout_percent,
        conditions,
        distribution,
    })
}
