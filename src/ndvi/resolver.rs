//! Band and acquisition date resolution against the MODIS web service.

use crate::types::location::SiteOfInterest;
use serde::Deserialize;

pub const MODIS_API_URL: &str = "https://modis.ornl.gov/rst/api/v1";

pub fn bands_url(product: &str) -> String {
    format!("{}/{}/bands", MODIS_API_URL, product)
}

pub fn dates_url(product: &str, site: &SiteOfInterest) -> String {
    format!(
        "{}/{}/dates?latitude={}&longitude={}",
        MODIS_API_URL, product, site.latitude, site.longitude
    )
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BandCatalog {
    #[serde(default)]
    pub bands: Vec<BandInfo>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BandInfo {
    #[serde(default)]
    pub band: String,
}

impl BandCatalog {
    /// First band whose name contains `needle`, ignoring case.
    pub fn select(&self, needle: &str) -> Option<&str> {
        let needle = needle.to_uppercase();
        self.bands
            .iter()
            .map(|info| info.band.as_str())
            .find(|name| name.to_uppercase().contains(&needle))
    }
}

/// One entry of a date list: either a bare provider code or an object carrying one.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum DateEntry {
    Code(String),
    Tagged {
        modis_date: Option<String>,
        calendar_date: Option<String>,
    },
    Other(serde_json::Value),
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DateList {
    #[serde(default)]
    pub dates: Vec<DateEntry>,
}

/// A provider acquisition date: its native code (`A2023001`) and a display date.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AcquisitionDate {
    pub modis_date: String,
    pub calendar_date: String,
}

impl AcquisitionDate {
    /// A date known only by its code, used for both fields.
    pub fn from_code(code: impl Into<String>) -> Self {
        let code = code.into();
        Self {
            calendar_date: code.clone(),
            modis_date: code,
        }
    }
}

impl DateEntry {
    fn into_date(self) -> Option<AcquisitionDate> {
        match self {
            DateEntry::Code(code) if !code.is_empty() => Some(AcquisitionDate::from_code(code)),
            DateEntry::Tagged {
                modis_date: Some(modis_date),
                calendar_date,
            } if !modis_date.is_empty() => {
                let calendar_date = calendar_date
                    .filter(|d| !d.is_empty())
                    .unwrap_or_else(|| modis_date.clone());
                Some(AcquisitionDate {
                    modis_date,
                    calendar_date,
                })
            }
            _ => None,
        }
    }
}

/// Keeps the entries that name a provider date, in list order.
pub fn resolve_dates(entries: Vec<DateEntry>) -> Vec<AcquisitionDate> {
    entries.into_iter().filter_map(DateEntry::into_date).collect()
}

/// Dates from an explicit override, used verbatim.
pub fn override_dates(codes: &[String]) -> Vec<AcquisitionDate> {
    codes
        .iter()
        .filter(|code| !code.is_empty())
        .map(AcquisitionDate::from_code)
        .collect()
}

/// The `limit` most recent dates. The provider lists dates oldest first.
pub fn truncate_recent(mut dates: Vec<AcquisitionDate>, limit: usize) -> Vec<AcquisitionDate> {
    let excess = dates.len().saturating_sub(limit);
    dates.drain(..excess);
    dates
}

/// Earliest and latest provider code, bounding one subset request.
pub fn date_bounds(dates: &[AcquisitionDate]) -> Option<(&str, &str)> {
    let earliest = dates.iter().map(|d| d.modis_date.as_str()).min()?;
    let latest = dates.iter().map(|d| d.modis_date.as_str()).max()?;
    Some((earliest, latest))
}
