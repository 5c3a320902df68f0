use super::null_as_default;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A single comparison against a property of the evaluation context.
///
/// `operator` and `value` are stored exactly as upstream provides them; they
/// are only parsed when the owning flag is prepared for evaluation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct Constraint {
    #[serde(rename = "ID")]
    pub id: u64,
    #[serde(rename = "SegmentID")]
    pub segment_id: u64,
    #[serde(deserialize_with = "null_as_default")]
    pub property: String,
    #[serde(deserialize_with = "null_as_default")]
    pub operator: String,
    #[serde(deserialize_with = "null_as_default")]
    pub value: String,
    /// Upstream fields the cache doesn't model, passed through untouched.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}
