//! Row and window types shared by the daily weather and vegetation index extracts.

use crate::config::ConfigError;
use chrono::NaiveDate;
use std::collections::BTreeMap;
use std::fmt;

pub const ISO_DATE_FORMAT: &str = "%Y-%m-%d";

/// An inclusive `[start, end]` calendar window. Both bounds are required.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateWindow {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateWindow {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    /// Builds a window from optional config bounds, naming the missing key on failure.
    pub fn from_bounds(
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> Result<Self, ConfigError> {
        match (start, end) {
            (Some(start), Some(end)) => Ok(Self::new(start, end)),
            (None, _) => Err(ConfigError::Missing("ghcn.start_date")),
            (_, None) => Err(ConfigError::Missing("ghcn.end_date")),
        }
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }
}

impl fmt::Display for DateWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

pub fn parse_iso_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), ISO_DATE_FORMAT).ok()
}

/// One dated observation for a station or a site.
///
/// `entity_id` is a station id for weather rows and a site id for vegetation index rows.
/// Measurements are keyed by output column name; `None` means the source left it blank.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeseriesRow {
    pub entity_id: String,
    pub region: Option<String>,
    pub date: NaiveDate,
    pub measurements: BTreeMap<String, Option<f64>>,
}

impl TimeseriesRow {
    pub fn new(entity_id: impl Into<String>, region: Option<String>, date: NaiveDate) -> Self {
        Self {
            entity_id: entity_id.into(),
            region,
            date,
            measurements: BTreeMap::new(),
        }
    }

    pub fn with_measurement(mut self, name: &str, value: Option<f64>) -> Self {
        self.measurements.insert(name.to_string(), value);
        self
    }

    pub fn measurement(&self, name: &str) -> Option<f64> {
        self.measurements.get(name).copied().flatten()
    }
}
