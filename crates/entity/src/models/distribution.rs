use super::null_as_default;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct Distribution {
    #[serde(rename = "ID")]
    pub id: u64,
    #[serde(rename = "SegmentID")]
    pub segment_id: u64,
    #[serde(rename = "VariantID")]
    pub variant_id: u64,
    #[serde(deserialize_with = "null_as_default")]
    pub variant_key: String,
    /// Share of the segment's traffic, in whole percent.
    pub percent: u32,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}
