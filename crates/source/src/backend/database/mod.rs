//! Database source, used whenever evaluation-only mode is off.
//!
//! Flags and their nested rows are loaded table by table (one statement per
//! table, regardless of how many flags there are) over a single pooled
//! connection, then stitched together in memory. Soft-deleted rows are
//! skipped.

mod rows;

use self::rows::{ConstraintRow, DistributionRow, FlagRow, SegmentRow, VariantRow};
use crate::backend::FlagSource;
use crate::error::{ErrorKind, Result};
use async_trait::async_trait;
use exn::ResultExt;
use flagcache_entity::{Constraint, Distribution, Flag, Segment, Variant};
use sqlx::FromRow;
use sqlx::any::{AnyPoolOptions, AnyRow};
use sqlx::{AnyConnection, AnyPool};
use std::collections::HashMap;
use tracing::instrument;

// Refreshes are sequential, so one connection does the work; the rest are
// headroom for anything else sharing the pool.
const MAX_CONNECTIONS: u32 = 4;

/// Flag source backed by the flag service's relational database.
///
/// Any database sqlx can reach through its `Any` driver works (SQLite,
/// Postgres, MySQL); the driver is picked from the URL scheme.
#[derive(Debug, Clone)]
pub struct DatabaseSource {
    pool: AnyPool,
}
impl DatabaseSource {
    /// Connect to the database at `url` (e.g. `sqlite://flags.sqlite`,
    /// `postgres://user@host/flags`).
    #[instrument("connecting to flag database", skip(url))]
    pub async fn connect(url: &str) -> Result<Self> {
        sqlx::any::install_default_drivers();
        let pool = AnyPoolOptions::new()
            .max_connections(MAX_CONNECTIONS)
            .connect(url)
            .await
            .or_raise(|| ErrorKind::Database)?;
        Ok(Self { pool })
    }

    /// Wrap an existing pool.
    pub fn from_pool(pool: AnyPool) -> Self {
        Self { pool }
    }

    /// Get a reference to the underlying connection pool.
    pub fn pool(&self) -> &AnyPool {
        &self.pool
    }

    /// Close the connection pool, waiting for checked-out connections.
    pub async fn close(&self) {
        self.pool.close().await;
    }

    async fn select<R>(conn: &mut AnyConnection, sql: &'static str) -> Result<Vec<R>>
    where
        R: for<'r> FromRow<'r, AnyRow> + Send + Unpin,
    {
        sqlx::query_as::<_, R>(sql).fetch_all(conn).await.or_raise(|| ErrorKind::Database)
    }
}

#[async_trait]
impl FlagSource for DatabaseSource {
    fn name(&self) -> &str {
        "database"
    }

    #[instrument(name = "fetch_database", skip(self))]
    async fn fetch(&self) -> Result<Vec<Flag>> {
        let mut conn = self.pool.acquire().await.or_raise(|| ErrorKind::Database)?;
        let flags: Vec<FlagRow> = Self::select(&mut conn, include_str!("../../../queries/select_flags.sql")).await?;
        let segments: Vec<SegmentRow> =
            Self::select(&mut conn, include_str!("../../../queries/select_segments.sql")).await?;
        let constraints: Vec<ConstraintRow> =
            Self::select(&mut conn, include_str!("../../../queries/select_constraints.sql")).await?;
        let distributions: Vec<DistributionRow> =
            Self::select(&mut conn, include_str!("../../../queries/select_distributions.sql")).await?;
        let variants: Vec<VariantRow> =
            Self::select(&mut conn, include_str!("../../../queries/select_variants.sql")).await?;
        drop(conn);

        let flags = assemble(flags, segments, constraints, distributions, variants)?;
        tracing::debug!(flags = flags.len(), "Loaded flags from database");
        Ok(flags)
    }
}

/// Group child rows under their parents. Rows pointing at a parent that
/// doesn't exist (or was soft-deleted) are dropped.
fn assemble(
    flag_rows: Vec<FlagRow>,
    segment_rows: Vec<SegmentRow>,
    constraint_rows: Vec<ConstraintRow>,
    distribution_rows: Vec<DistributionRow>,
    variant_rows: Vec<VariantRow>,
) -> Result<Vec<Flag>> {
    let mut constraints: HashMap<u64, Vec<Constraint>> = HashMap::new();
    for row in constraint_rows {
        let constraint = Constraint::try_from(row)?;
        constraints.entry(constraint.segment_id).or_default().push(constraint);
    }
    let mut distributions: HashMap<u64, Vec<Distribution>> = HashMap::new();
    for row in distribution_rows {
        let distribution = Distribution::try_from(row)?;
        distributions.entry(distribution.segment_id).or_default().push(distribution);
    }
    let mut segments: HashMap<u64, Vec<Segment>> = HashMap::new();
    for row in segment_rows {
        let mut segment = Segment::try_from(row)?;
        segment.constraints = constraints.remove(&segment.id).unwrap_or_default();
        segment.distributions = distributions.remove(&segment.id).unwrap_or_default();
        segments.entry(segment.flag_id).or_default().push(segment);
    }
    let mut variants: HashMap<u64, Vec<Variant>> = HashMap::new();
    for row in variant_rows {
        let variant = Variant::try_from(row)?;
        variants.entry(variant.flag_id).or_default().push(variant);
    }
    flag_rows
        .into_iter()
        .map(|row| {
            let mut flag = Flag::try_from(row)?;
            flag.segments = segments.remove(&flag.id).unwrap_or_default();
            flag.variants = variants.remove(&flag.id).unwrap_or_default();
            Ok(flag)
        })
        .collect()
}
