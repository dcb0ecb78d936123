//! Agricultural statistics extract: stream the bulk dump, keep the matching records,
//! and total their values per region.

pub mod aggregate;
pub mod error;
pub mod filter;
pub mod reader;

use crate::config::QuickStatsConfig;
use crate::quickstats::aggregate::RegionTotals;
use crate::quickstats::error::QuickStatsError;
use crate::quickstats::filter::{FilterCriteria, STATE_ALPHA, VALUE};
use crate::quickstats::reader::{open_gzip, FieldLookup, QuickStatsReader};
use crate::transport::{artifact_name, fetch_cached, FetchResult, Transport};
use log::{debug, info, warn};
use std::io::Read;
use std::path::{Path, PathBuf};
use tokio::task;

/// One matching statistics record, reduced to the emitted columns.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatsRow {
    pub state_alpha: String,
    pub state_name: String,
    pub county_name: String,
    pub year: String,
    pub value: String,
    pub unit: String,
    pub short_desc: String,
    pub commodity: String,
    pub statistic: String,
}

impl StatsRow {
    pub fn from_record(record: &impl FieldLookup) -> Self {
        let field = |name: &str| record.field(name).to_string();
        Self {
            state_alpha: field(STATE_ALPHA),
            state_name: field("STATE_NAME"),
            county_name: field("COUNTY_NAME"),
            year: field("YEAR"),
            value: field(VALUE),
            unit: field("UNIT_DESC"),
            short_desc: field("SHORT_DESC"),
            commodity: field("COMMODITY_DESC"),
            statistic: field("STATISTICCAT_DESC"),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct QuickStatsExtract {
    pub rows: Vec<StatsRow>,
    pub totals: RegionTotals,
    /// Input records read, matching or not.
    pub scanned: u64,
}

/// Reads records until the stream ends or `max_rows` records were scanned
/// (`None` or `0` means no cap), keeping those that match `criteria`.
///
/// Only one record is held at a time; matching rows and the running totals are
/// the only state that grows.
pub fn extract<R: Read>(
    reader: &mut QuickStatsReader<R>,
    criteria: &FilterCriteria,
    max_rows: Option<u64>,
) -> Result<QuickStatsExtract, QuickStatsError> {
    let limit = max_rows.filter(|&n| n > 0);
    let mut out = QuickStatsExtract::default();

    while limit.map_or(true, |n| out.scanned < n) {
        let Some(record) = reader.next_record()? else {
            break;
        };
        out.scanned += 1;
        if !criteria.matches(&record) {
            continue;
        }
        let row = StatsRow::from_record(&record);
        if !out.totals.add(&row.state_alpha, &row.value) {
            debug!(
                "Value {:?} for {} is not numeric; left out of totals",
                row.value, row.state_alpha
            );
        }
        out.rows.push(row);
    }
    Ok(out)
}

pub struct QuickStatsExtractor<'a, T> {
    transport: &'a T,
    config: &'a QuickStatsConfig,
    criteria: FilterCriteria,
    cache_dir: &'a Path,
}

impl<'a, T: Transport> QuickStatsExtractor<'a, T> {
    pub fn new(
        transport: &'a T,
        config: &'a QuickStatsConfig,
        states: &[String],
        cache_dir: &'a Path,
    ) -> Self {
        Self {
            transport,
            config,
            criteria: FilterCriteria::from_config(config, states),
            cache_dir,
        }
    }

    /// Where the dump for `url` is kept between runs.
    pub fn dataset_path(&self, url: &str) -> PathBuf {
        self.cache_dir.join(artifact_name(url))
    }

    /// Downloads the dump unless a previous run left it in the cache directory.
    pub async fn fetch_dataset(&self, url: &str) -> FetchResult<PathBuf> {
        let path = self.dataset_path(url);
        fetch_cached(self.transport, url, &path).await?;
        Ok(path)
    }

    /// Filters and totals the dump at `path`, removing it afterwards when configured.
    pub async fn extract_file(&self, path: &Path) -> Result<QuickStatsExtract, QuickStatsError> {
        if self.criteria.is_unconstrained() {
            warn!("No statistics filters configured; keeping every record with a value");
        }
        let source = open_gzip(path).await?;
        let criteria = self.criteria.clone();
        let max_rows = self.config.max_rows;
        let out = task::spawn_blocking(move || {
            let mut reader = QuickStatsReader::from_reader(source)?;
            extract(&mut reader, &criteria, max_rows)
        })
        .await??;
        info!(
            "Scanned {} statistics records, {} matched across {} regions",
            out.scanned,
            out.rows.len(),
            out.totals.len()
        );

        if self.config.delete_source_after {
            if let Err(e) = tokio::fs::remove_file(path).await {
                warn!("Could not remove {}: {}", path.display(), e);
            }
        }
        Ok(out)
    }
}
