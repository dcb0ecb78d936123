//! Region configuration: which regions, sites, datasets and date ranges to extract.
//!
//! The document is the JSON `region_config.json` the chart builders share. Every section is
//! optional at parse time; required keys are checked by [`RegionConfig::validate`] so a run
//! fails before any network traffic when something essential is missing.

use crate::types::location::SiteOfInterest;
use crate::types::region::RegionFilter;
use chrono::NaiveDate;
use log::debug;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const DEFAULT_MODIS_PRODUCT: &str = "MOD13Q1";
pub const DEFAULT_BAND_CONTAINS: &str = "NDVI";
/// The MODIS web service refuses subset requests spanning more than this many dates.
pub const MAX_DATES_PER_SUBSET: usize = 10;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read region config '{0}'")]
    Read(PathBuf, #[source] std::io::Error),

    #[error("Failed to parse region config '{0}'")]
    Parse(PathBuf, #[source] serde_json::Error),

    #[error("Missing {0} in region config")]
    Missing(&'static str),

    #[error("ghcn.stations is empty and ghcn.auto_select_from_sites is disabled")]
    NoStationSource,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RegionConfig {
    /// Region (state) codes scoping every extract.
    pub states: Vec<String>,
    pub quickstats: QuickStatsConfig,
    /// Absent section means no vegetation index extract is produced.
    pub modis: Option<ModisConfig>,
    pub ghcn: GhcnConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct QuickStatsConfig {
    pub dataset_url: Option<String>,
    /// Caps the number of input rows scanned; `0` or absent scans everything.
    pub max_rows: Option<u64>,
    pub agg_level_desc: Vec<String>,
    pub unit_desc_contains: Vec<String>,
    pub short_desc_contains: Vec<String>,
    pub delete_source_after: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ModisConfig {
    pub product: Option<String>,
    pub band_contains: Option<String>,
    pub sites: Vec<SiteConfig>,
    pub irrigation_districts: Vec<SiteConfig>,
    pub dates_limit: Option<usize>,
    /// Provider date codes to request instead of asking the provider per site.
    /// Non-string entries are ignored.
    pub dates_override: Vec<serde_json::Value>,
    pub km_radius: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    pub id: Option<String>,
    pub name: Option<String>,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct GhcnConfig {
    pub stations: Vec<String>,
    pub auto_select_from_sites: bool,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

impl RegionConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Read(path.to_path_buf(), e))?;
        serde_json::from_str(&text).map_err(|e| ConfigError::Parse(path.to_path_buf(), e))
    }

    pub fn region_filter(&self) -> RegionFilter {
        RegionFilter::new(&self.states)
    }

    /// Checks the keys the statistics path needs.
    pub fn validate_quickstats(&self) -> Result<(), ConfigError> {
        match self.quickstats.dataset_url.as_deref().map(str::trim) {
            Some(url) if !url.is_empty() => Ok(()),
            _ => Err(ConfigError::Missing("quickstats.dataset_url")),
        }
    }

    /// Checks the keys the daily weather path needs.
    pub fn validate_ghcn(&self) -> Result<(), ConfigError> {
        if self.ghcn.start_date.is_none() {
            return Err(ConfigError::Missing("ghcn.start_date"));
        }
        if self.ghcn.end_date.is_none() {
            return Err(ConfigError::Missing("ghcn.end_date"));
        }
        if self.ghcn.stations.is_empty() && !self.ghcn.auto_select_from_sites {
            return Err(ConfigError::NoStationSource);
        }
        Ok(())
    }

    /// Sites used to pick nearest weather stations: `modis.sites`, falling back to
    /// `modis.irrigation_districts` when no sites are listed.
    pub fn matching_sites(&self) -> Vec<SiteOfInterest> {
        let Some(modis) = &self.modis else {
            return Vec::new();
        };
        let listed = if modis.sites.is_empty() {
            &modis.irrigation_districts
        } else {
            &modis.sites
        };
        to_sites(listed)
    }
}

impl ModisConfig {
    pub fn product(&self) -> &str {
        self.product.as_deref().unwrap_or(DEFAULT_MODIS_PRODUCT)
    }

    pub fn band_contains(&self) -> &str {
        self.band_contains.as_deref().unwrap_or(DEFAULT_BAND_CONTAINS)
    }

    /// Maximum dates per site, defaulting to and capped at [`MAX_DATES_PER_SUBSET`].
    pub fn dates_limit(&self) -> usize {
        match self.dates_limit {
            None | Some(0) => MAX_DATES_PER_SUBSET,
            Some(limit) => limit.clamp(1, MAX_DATES_PER_SUBSET),
        }
    }

    pub fn km_radius(&self) -> f64 {
        self.km_radius.unwrap_or(0.0)
    }

    pub fn dates_override(&self) -> Vec<String> {
        self.dates_override
            .iter()
            .filter_map(|item| item.as_str().map(str::to_string))
            .collect()
    }

    /// Sites sampled for the vegetation index: irrigation districts take precedence
    /// over generic sites.
    pub fn ndvi_sites(&self) -> Vec<SiteOfInterest> {
        if self.irrigation_districts.is_empty() {
            to_sites(&self.sites)
        } else {
            to_sites(&self.irrigation_districts)
        }
    }
}

impl SiteConfig {
    /// Converts to a site, or `None` when either coordinate is missing.
    pub fn to_site(&self) -> Option<SiteOfInterest> {
        let (lat, lon) = (self.lat?, self.lon?);
        Some(SiteOfInterest::new(
            self.id.clone().unwrap_or_default(),
            self.name.clone().unwrap_or_default(),
            lat,
            lon,
        ))
    }
}

fn to_sites(configs: &[SiteConfig]) -> Vec<SiteOfInterest> {
    configs
        .iter()
        .filter_map(|config| {
            let site = config.to_site();
            if site.is_none() {
                debug!("Skipping site {:?} without coordinates", config.id);
            }
            site
        })
        .collect()
}
