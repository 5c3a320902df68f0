use super::null_as_default;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One possible outcome of a flag, with an optional opaque JSON attachment.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct Variant {
    #[serde(rename = "ID")]
    pub id: u64,
    #[serde(rename = "FlagID")]
    pub flag_id: u64,
    #[serde(deserialize_with = "null_as_default")]
    pub key: String,
    pub attachment: Option<Map<String, Value>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}
