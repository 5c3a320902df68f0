use super::{Constraint, Distribution, null_as_default};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A targeting rule: all constraints must match for the segment to apply,
/// then the distributions decide which variant is served.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct Segment {
    #[serde(rename = "ID")]
    pub id: u64,
    #[serde(rename = "FlagID")]
    pub flag_id: u64,
    #[serde(deserialize_with = "null_as_default")]
    pub description: String,
    /// Lower ranks are evaluated first.
    pub rank: u32,
    pub rollout_percent: u32,
    #[serde(deserialize_with = "null_as_default")]
    pub constraints: Vec<Constraint>,
    #[serde(deserialize_with = "null_as_default")]
    pub distributions: Vec<Distribution>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}
