use crate::error::{Error, ErrorKind};
use exn::ResultExt;
use flagcache_entity::{Constraint, Distribution, Flag, Segment, Variant};

fn unsigned(value: i64, column: &'static str) -> Result<u64, Error> {
    u64::try_from(value).or_raise(|| ErrorKind::InvalidData(column))
}

fn narrow(value: i64, column: &'static str) -> Result<u32, Error> {
    u32::try_from(value).or_raise(|| ErrorKind::InvalidData(column))
}

#[derive(sqlx::FromRow)]
pub(crate) struct FlagRow {
    id: i64,
    key: Option<String>,
    description: Option<String>,
    enabled: i64,
    notes: Option<String>,
    entity_type: Option<String>,
    data_records_enabled: i64,
}
impl TryFrom<FlagRow> for Flag {
    type Error = Error;
    fn try_from(row: FlagRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: unsigned(row.id, "flags.id")?,
            key: row.key.unwrap_or_default(),
            description: row.description.unwrap_or_default(),
            enabled: row.enabled != 0,
            notes: row.notes.unwrap_or_default(),
            entity_type: row.entity_type.unwrap_or_default(),
            data_records_enabled: row.data_records_enabled != 0,
            segments: Vec::new(),
            variants: Vec::new(),
            ..Default::default()
        })
    }
}

#[derive(sqlx::FromRow)]
pub(crate) struct SegmentRow {
    id: i64,
    flag_id: i64,
    description: Option<String>,
    rank: i64,
    rollout_percent: i64,
}
impl TryFrom<SegmentRow> for Segment {
    type Error = Error;
    fn try_from(row: SegmentRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: unsigned(row.id, "segments.id")?,
            flag_id: unsigned(row.flag_id, "segments.flag_id")?,
            description: row.description.unwrap_or_default(),
            rank: narrow(row.rank, "segments.rank")?,
            rollout_percent: narrow(row.rollout_percent, "segments.rollout_percent")?,
            constraints: Vec::new(),
            distributions: Vec::new(),
            ..Default::default()
        })
    }
}

#[derive(sqlx::FromRow)]
pub(crate) struct ConstraintRow {
    id: i64,
    segment_id: i64,
    property: Option<String>,
    operator: Option<String>,
    value: Option<String>,
}
impl TryFrom<ConstraintRow> for Constraint {
    type Error = Error;
    fn try_from(row: ConstraintRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: unsigned(row.id, "constraints.id")?,
            segment_id: unsigned(row.segment_id, "constraints.segment_id")?,
            property: row.property.unwrap_or_default(),
            operator: row.operator.unwrap_or_default(),
            value: row.value.unwrap_or_default(),
            ..Default::default()
        })
    }
}

#[derive(sqlx::FromRow)]
pub(crate) struct DistributionRow {
    id: i64,
    segment_id: i64,
    variant_id: i64,
    variant_key: Option<String>,
    percent: i64,
}
impl TryFrom<DistributionRow> for Distribution {
    type Error = Error;
    fn try_from(row: DistributionRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: unsigned(row.id, "distributions.id")?,
            segment_id: unsigned(row.segment_id, "distributions.segment_id")?,
            variant_id: unsigned(row.variant_id, "distributions.variant_id")?,
            variant_key: row.variant_key.unwrap_or_default(),
            percent: narrow(row.percent, "distributions.percent")?,
            ..Default::default()
        })
    }
}

#[derive(sqlx::FromRow)]
pub(crate) struct VariantRow {
    id: i64,
    flag_id: i64,
    key: Option<String>,
    /// JSON object stored as text.
    attachment: Option<String>,
}
impl TryFrom<VariantRow> for Variant {
    type Error = Error;
    fn try_from(row: VariantRow) -> Result<Self, Self::Error> {
        let attachment = match row.attachment.as_deref().map(str::trim) {
            None | Some("") | Some("null") => None,
            Some(text) => Some(serde_json::from_str(text).or_raise(|| ErrorKind::InvalidData("variants.attachment"))?),
        };
        Ok(Self {
            id: unsigned(row.id, "variants.id")?,
            flag_id: unsigned(row.flag_id, "variants.flag_id")?,
            key: row.key.unwrap_or_default(),
            attachment,
            ..Default::default()
        })
    }
}
