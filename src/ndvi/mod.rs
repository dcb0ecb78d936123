//! Vegetation index time series per site from the MODIS web service.
//!
//! One band lookup per run, then for every site a date list (or the configured
//! override) and a single windowed subset request.

pub mod error;
pub mod resolver;
pub mod subset;

use crate::config::ModisConfig;
use crate::ndvi::error::NdviError;
use crate::ndvi::resolver::{
    bands_url, date_bounds, dates_url, override_dates, resolve_dates, truncate_recent,
    AcquisitionDate, BandCatalog, DateList,
};
use crate::ndvi::subset::{shape_rows, subset_url, NdviRow, SubsetResponse};
use crate::transport::Transport;
use crate::types::location::SiteOfInterest;
use crate::utils::{describe, BatchOutcome};
use log::{info, warn};

pub struct NdviExtractor<'a, T> {
    transport: &'a T,
    product: String,
    band_contains: String,
    dates_limit: usize,
    dates_override: Vec<String>,
    km_radius: f64,
}

impl<'a, T: Transport> NdviExtractor<'a, T> {
    pub fn from_config(transport: &'a T, config: &ModisConfig) -> Self {
        Self {
            transport,
            product: config.product().to_string(),
            band_contains: config.band_contains().to_string(),
            dates_limit: config.dates_limit(),
            dates_override: config.dates_override(),
            km_radius: config.km_radius(),
        }
    }

    /// Resolves the band, then samples every site.
    ///
    /// An unreachable band catalog gives an empty outcome; a catalog without a matching
    /// band is the only error returned. Sites that fail are listed in `skipped`.
    pub async fn extract(&self, sites: &[SiteOfInterest]) -> Result<BatchOutcome<NdviRow>, NdviError> {
        let mut outcome = BatchOutcome::default();
        if sites.is_empty() {
            warn!("No MODIS sites with coordinates configured");
            return Ok(outcome);
        }

        let url = bands_url(&self.product);
        let catalog: BandCatalog = match self.transport.get_json(&url).await {
            Ok(catalog) => catalog,
            Err(e) => {
                warn!("MODIS band catalog unavailable: {}", describe(&e));
                return Ok(outcome);
            }
        };
        let band = catalog
            .select(&self.band_contains)
            .ok_or_else(|| NdviError::NoBandMatch {
                product: self.product.clone(),
                band_contains: self.band_contains.clone(),
            })?;
        info!("Using {} band {}", self.product, band);

        for site in sites {
            match self.fetch_site(site, band).await {
                Ok(rows) => {
                    info!("Site {}: {} {} records", site.id, rows.len(), band);
                    outcome.rows.extend(rows);
                }
                Err(e) => {
                    warn!("Skipping site {}: {}", site.id, describe(&e));
                    outcome.skipped.push(site.id.clone());
                }
            }
        }
        Ok(outcome)
    }

    /// The dates to request for `site`, most recent last, at most `dates_limit` of them.
    pub async fn site_dates(&self, site: &SiteOfInterest) -> Result<Vec<AcquisitionDate>, NdviError> {
        let dates = if self.dates_override.is_empty() {
            let list: DateList = self
                .transport
                .get_json(&dates_url(&self.product, site))
                .await
                .map_err(|source| NdviError::Dates {
                    site: site.id.clone(),
                    source,
                })?;
            resolve_dates(list.dates)
        } else {
            override_dates(&self.dates_override)
        };
        Ok(truncate_recent(dates, self.dates_limit))
    }

    async fn fetch_site(&self, site: &SiteOfInterest, band: &str) -> Result<Vec<NdviRow>, NdviError> {
        let dates = self.site_dates(site).await?;
        let (start, end) = date_bounds(&dates).ok_or_else(|| NdviError::NoDates {
            site: site.id.clone(),
        })?;

        let url = subset_url(&self.product, site, start, end, self.km_radius);
        let response: SubsetResponse =
            self.transport
                .get_json(&url)
                .await
                .map_err(|source| NdviError::Subset {
                    site: site.id.clone(),
                    source,
                })?;
        Ok(shape_rows(response.subset, band, &self.product, site))
    }
}
