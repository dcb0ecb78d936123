use crate::ndvi::resolver::MODIS_API_URL;
use crate::types::location::SiteOfInterest;
use crate::types::timeseries::{parse_iso_date, TimeseriesRow};
use log::debug;
use serde::Deserialize;
use serde_json::Value;

pub const VALUE_MEASUREMENT: &str = "value";

pub fn subset_url(
    product: &str,
    site: &SiteOfInterest,
    start_date: &str,
    end_date: &str,
    km_radius: f64,
) -> String {
    format!(
        "{}/{}/subset?latitude={}&longitude={}&startDate={}&endDate={}&kmAboveBelow={}&kmLeftRight={}",
        MODIS_API_URL,
        product,
        site.latitude,
        site.longitude,
        start_date,
        end_date,
        km_radius,
        km_radius
    )
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SubsetResponse {
    #[serde(default)]
    pub subset: Vec<SubsetRecord>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SubsetRecord {
    #[serde(default)]
    pub band: String,
    #[serde(default)]
    pub modis_date: String,
    #[serde(default)]
    pub calendar_date: String,
    #[serde(default)]
    pub data: Value,
}

/// Mean of the numeric pixels in a subset `data` field. A bare number is its own mean;
/// anything without a finite number yields `None`.
pub fn pixel_mean(data: &Value) -> Option<f64> {
    match data {
        Value::Number(n) => n.as_f64().filter(|v| v.is_finite()),
        Value::Array(items) => {
            let pixels: Vec<f64> = items
                .iter()
                .filter_map(Value::as_f64)
                .filter(|v| v.is_finite())
                .collect();
            if pixels.is_empty() {
                None
            } else {
                Some(pixels.iter().sum::<f64>() / pixels.len() as f64)
            }
        }
        _ => None,
    }
}

/// A vegetation index observation for one site, with the provider metadata that is
/// emitted next to it.
#[derive(Debug, Clone, PartialEq)]
pub struct NdviRow {
    pub row: TimeseriesRow,
    pub site_name: String,
    pub band: String,
    pub product: String,
    pub modis_date: String,
}

impl NdviRow {
    pub fn value(&self) -> Option<f64> {
        self.row.measurement(VALUE_MEASUREMENT)
    }
}

/// Keeps the records of `band` and shapes them into rows for `site`. Records whose
/// calendar date does not parse are dropped.
pub fn shape_rows(
    records: Vec<SubsetRecord>,
    band: &str,
    product: &str,
    site: &SiteOfInterest,
) -> Vec<NdviRow> {
    records
        .into_iter()
        .filter(|record| record.band == band)
        .filter_map(|record| {
            let Some(date) = parse_iso_date(&record.calendar_date) else {
                debug!(
                    "Dropping {} record for {} with date {:?}",
                    band, site.id, record.calendar_date
                );
                return None;
            };
            let row = TimeseriesRow::new(site.id.clone(), None, date)
                .with_measurement(VALUE_MEASUREMENT, pixel_mean(&record.data));
            Some(NdviRow {
                row,
                site_name: site.name.clone(),
                band: band.to_string(),
                product: product.to_string(),
                modis_date: record.modis_date,
            })
        })
        .collect()
}
