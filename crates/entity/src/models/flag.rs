use super::{Segment, Variant, null_as_default};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A feature flag with its nested segments and variants.
///
/// Field names on the wire match the upstream flag service (`ID`, `Key`,
/// `Segments`, ...). Anything the cache doesn't model, such as tags or
/// timestamps, is kept in `extra` and written back out unchanged. Every field
/// is optional and a missing or `null` value defaults to zero/empty, so a
/// record that only carries an `ID` still deserializes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct Flag {
    /// Database identifier, non-zero once persisted.
    #[serde(rename = "ID")]
    pub id: u64,
    /// Human-readable lookup key, may be empty.
    #[serde(deserialize_with = "null_as_default")]
    pub key: String,
    #[serde(deserialize_with = "null_as_default")]
    pub description: String,
    pub enabled: bool,
    #[serde(deserialize_with = "null_as_default")]
    pub notes: String,
    #[serde(deserialize_with = "null_as_default")]
    pub entity_type: String,
    pub data_records_enabled: bool,
    #[serde(deserialize_with = "null_as_default")]
    pub segments: Vec<Segment>,
    #[serde(deserialize_with = "null_as_default")]
    pub variants: Vec<Variant>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}
impl Flag {
    /// A flag is only reachable through the cache if it has a non-zero ID or
    /// a non-empty key.
    pub fn is_indexable(&self) -> bool {
        self.id != 0 || !self.key.is_empty()
    }
}
