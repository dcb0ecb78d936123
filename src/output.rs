//! CSV artifacts handed to the chart builders.
//!
//! Every artifact is written to a temporary file next to its destination and then
//! renamed over it, so a reader sees either the previous file or the complete new one.

use crate::ndvi::subset::NdviRow;
use crate::quickstats::aggregate::RegionTotals;
use crate::quickstats::StatsRow;
use crate::types::timeseries::{TimeseriesRow, ISO_DATE_FORMAT};
use crate::weather_data::fetcher::DAILY_MEASUREMENTS;
use log::info;
use polars::prelude::*;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use thiserror::Error;
use tokio::task;

pub const QUICKSTATS_FILE: &str = "quickstats_irrigation.csv";
pub const QUICKSTATS_SUMMARY_FILE: &str = "quickstats_irrigation_state_summary.csv";
pub const WEATHER_FILE: &str = "ghcn_daily_summary.csv";
pub const NDVI_FILE: &str = "modis_ndvi_timeseries.csv";

#[derive(Debug, Error)]
pub enum OutputError {
    #[error("I/O error writing '{0}'")]
    Io(PathBuf, #[source] std::io::Error),

    #[error("Failed to encode CSV for '{0}'")]
    Encode(PathBuf, #[source] PolarsError),

    #[error("Failed to assemble output frame")]
    Frame(#[from] PolarsError),

    #[error("Background task failed to complete")]
    TaskJoin(#[from] tokio::task::JoinError),
}

/// Destinations of the four artifacts inside one output directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputPaths {
    pub quickstats: PathBuf,
    pub quickstats_summary: PathBuf,
    pub weather: PathBuf,
    pub ndvi: PathBuf,
}

impl OutputPaths {
    pub fn in_dir(dir: &Path) -> Self {
        Self {
            quickstats: dir.join(QUICKSTATS_FILE),
            quickstats_summary: dir.join(QUICKSTATS_SUMMARY_FILE),
            weather: dir.join(WEATHER_FILE),
            ndvi: dir.join(NDVI_FILE),
        }
    }
}

fn column<T>(rows: &[T], get: impl Fn(&T) -> String) -> Vec<String> {
    rows.iter().map(get).collect()
}

fn format_date(row: &TimeseriesRow) -> String {
    row.date.format(ISO_DATE_FORMAT).to_string()
}

pub fn stats_frame(rows: &[StatsRow]) -> Result<DataFrame, OutputError> {
    let df = df! {
        "state_alpha" => column(rows, |r| r.state_alpha.clone()),
        "state_name" => column(rows, |r| r.state_name.clone()),
        "county_name" => column(rows, |r| r.county_name.clone()),
        "year" => column(rows, |r| r.year.clone()),
        "value" => column(rows, |r| r.value.clone()),
        "unit" => column(rows, |r| r.unit.clone()),
        "short_desc" => column(rows, |r| r.short_desc.clone()),
        "commodity" => column(rows, |r| r.commodity.clone()),
        "statistic" => column(rows, |r| r.statistic.clone()),
    }?;
    Ok(df)
}

pub fn totals_frame(totals: &RegionTotals) -> Result<DataFrame, OutputError> {
    let (regions, values): (Vec<String>, Vec<f64>) = totals.rounded().into_iter().unzip();
    let df = df! {
        "state_alpha" => regions,
        "total_value" => values,
    }?;
    Ok(df)
}

/// Daily weather rows as `station,state,date,prcp,tmax,tmin`. Measurements keep the
/// source's shortest form, so whole values are written without a fractional part.
pub fn weather_frame(rows: &[TimeseriesRow]) -> Result<DataFrame, OutputError> {
    let mut columns = vec![
        Column::new("station".into(), column(rows, |r| r.entity_id.clone())),
        Column::new(
            "state".into(),
            column(rows, |r| r.region.clone().unwrap_or_default()),
        ),
        Column::new("date".into(), column(rows, format_date)),
    ];
    for (_, name) in DAILY_MEASUREMENTS {
        let values: Vec<Option<String>> = rows
            .iter()
            .map(|r| r.measurement(name).map(|v| v.to_string()))
            .collect();
        columns.push(Column::new(name.into(), values));
    }
    Ok(DataFrame::new(columns)?)
}

pub fn ndvi_frame(rows: &[NdviRow]) -> Result<DataFrame, OutputError> {
    let values: Vec<Option<f64>> = rows.iter().map(NdviRow::value).collect();
    let df = df! {
        "site_id" => column(rows, |r| r.row.entity_id.clone()),
        "site_name" => column(rows, |r| r.site_name.clone()),
        "date" => column(rows, |r| format_date(&r.row)),
        "value" => values,
        "band" => column(rows, |r| r.band.clone()),
        "product" => column(rows, |r| r.product.clone()),
        "modis_date" => column(rows, |r| r.modis_date.clone()),
    }?;
    Ok(df)
}

/// Writes `df` as comma separated CSV with a header row, replacing `path` atomically.
pub async fn write_csv(mut df: DataFrame, path: &Path) -> Result<(), OutputError> {
    let path_buf = path.to_path_buf();
    task::spawn_blocking(move || {
        let dir = match path_buf.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&dir).map_err(|e| OutputError::Io(path_buf.clone(), e))?;

        let mut temp_file =
            NamedTempFile::new_in(&dir).map_err(|e| OutputError::Io(path_buf.clone(), e))?;
        CsvWriter::new(&mut temp_file)
            .include_header(true)
            .with_separator(b',')
            .finish(&mut df)
            .map_err(|e| OutputError::Encode(path_buf.clone(), e))?;
        temp_file
            .persist(&path_buf)
            .map_err(|e| OutputError::Io(path_buf.clone(), e.error))?;
        info!("Wrote {} rows to {}", df.height(), path_buf.display());
        Ok::<(), OutputError>(())
    })
    .await??;
    Ok(())
}
