//! Per-station daily weather from the GHCN-Daily access CSVs.

use crate::filtering::DateWindowFrameExt;
use crate::transport::Transport;
use crate::types::station::StationRecord;
use crate::types::timeseries::{DateWindow, TimeseriesRow};
use crate::utils::{describe, BatchOutcome};
use crate::weather_data::error::WeatherDataError;
use log::{info, warn};
use polars::prelude::*;
use std::io::Write;
use tempfile::NamedTempFile;
use tokio::task;

pub const DAILY_ACCESS_URL: &str =
    "https://www.ncei.noaa.gov/data/global-historical-climatology-network-daily/access";

const DATE_COLUMN: &str = "DATE";

/// Source column and output name of every daily measurement that is kept.
pub const DAILY_MEASUREMENTS: [(&str, &str); 3] =
    [("PRCP", "prcp"), ("TMAX", "tmax"), ("TMIN", "tmin")];

pub fn daily_url(station: &str) -> String {
    format!("{}/{}.csv", DAILY_ACCESS_URL, station)
}

/// A station to fetch, with the region reported next to its rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DailyTarget {
    pub station: String,
    pub region: Option<String>,
}

impl DailyTarget {
    pub fn new(station: impl Into<String>, region: Option<String>) -> Self {
        Self {
            station: station.into(),
            region,
        }
    }
}

impl From<&StationRecord> for DailyTarget {
    fn from(station: &StationRecord) -> Self {
        let region = (!station.region.is_empty()).then(|| station.region.clone());
        Self::new(station.id.clone(), region)
    }
}

pub struct DailyWeatherFetcher<'a, T> {
    transport: &'a T,
    window: DateWindow,
}

impl<'a, T: Transport> DailyWeatherFetcher<'a, T> {
    pub fn new(transport: &'a T, window: DateWindow) -> Self {
        Self { transport, window }
    }

    /// Downloads one station's record and keeps the days inside the window.
    pub async fn fetch_station(
        &self,
        target: &DailyTarget,
    ) -> Result<Vec<TimeseriesRow>, WeatherDataError> {
        let url = daily_url(&target.station);
        info!("Downloading daily data from {}", url);
        let bytes = self
            .transport
            .get(&url)
            .await
            .map_err(|source| WeatherDataError::Fetch {
                station: target.station.clone(),
                source,
            })?;

        let target = target.clone();
        let window = self.window;
        task::spawn_blocking(move || parse_daily_csv(bytes, &target, window)).await?
    }

    /// Fetches every station in order. A station that fails is logged and skipped;
    /// the rest of the batch still runs.
    pub async fn fetch_all(&self, targets: &[DailyTarget]) -> BatchOutcome<TimeseriesRow> {
        let mut outcome = BatchOutcome::default();
        for target in targets {
            match self.fetch_station(target).await {
                Ok(rows) => {
                    info!(
                        "Station {}: {} days in {}",
                        target.station,
                        rows.len(),
                        self.window
                    );
                    outcome.rows.extend(rows);
                }
                Err(e) => {
                    warn!("Skipping station {}: {}", target.station, describe(&e));
                    outcome.skipped.push(target.station.clone());
                }
            }
        }
        outcome
    }
}

/// Parses a daily CSV (header row, quoted fields) into rows inside `window`.
///
/// Every column is read as text. The date column is parsed once by the window filter;
/// days whose date does not parse are dropped, and a measurement that is blank or not a
/// number is kept as missing.
pub fn parse_daily_csv(
    bytes: Vec<u8>,
    target: &DailyTarget,
    window: DateWindow,
) -> Result<Vec<TimeseriesRow>, WeatherDataError> {
    let station = target.station.as_str();
    let mut temp_file = NamedTempFile::new().map_err(|e| WeatherDataError::CsvReadIo {
        station: station.to_string(),
        source: e,
    })?;
    temp_file
        .write_all(&bytes)
        .and_then(|_| temp_file.flush())
        .map_err(|e| WeatherDataError::CsvReadIo {
            station: station.to_string(),
            source: e,
        })?;

    let df = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(0))
        .try_into_reader_with_file_path(Some(temp_file.path().to_path_buf()))
        .and_then(|reader| reader.finish())
        .map_err(|e| WeatherDataError::CsvReadPolars {
            station: station.to_string(),
            source: e,
        })?;

    if df.column(DATE_COLUMN).is_err() {
        return Err(WeatherDataError::MissingColumnError {
            station: station.to_string(),
            column: DATE_COLUMN.to_string(),
        });
    }

    let filtered = df
        .lazy()
        .filter_window(DATE_COLUMN, window)
        .collect()
        .map_err(|e| WeatherDataError::PolarsError {
            station: station.to_string(),
            source: e,
        })?;

    let dates = filtered
        .column(DATE_COLUMN)
        .and_then(|c| c.as_materialized_series().date())
        .map_err(|e| WeatherDataError::PolarsError {
            station: station.to_string(),
            source: e,
        })?;
    // A missing measurement column yields empty cells rather than an error.
    let measurements: Vec<_> = DAILY_MEASUREMENTS
        .iter()
        .map(|(source, name)| {
            let values = filtered.column(source).ok().and_then(|c| c.str().ok());
            (*name, values)
        })
        .collect();

    let rows = dates
        .as_date_iter()
        .enumerate()
        .filter_map(|(idx, date)| {
            let mut row = TimeseriesRow::new(station, target.region.clone(), date?);
            for (name, values) in &measurements {
                let value = values
                    .and_then(|ca| ca.get(idx))
                    .and_then(|raw| raw.trim().parse::<f64>().ok())
                    .filter(|v| v.is_finite());
                row = row.with_measurement(name, value);
            }
            Some(row)
        })
        .collect();
    Ok(rows)
}
